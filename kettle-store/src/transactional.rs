use std::sync::Arc;

use alloy_primitives::{Address, Bytes};
use kettle_types::{
    Bid, BidId, ConfidentialRequest, DaMessage, MessageSigner, SerializeWithHash,
    SignedDaMessage, StoreWrite,
};
use tracing::warn;

use crate::{errors::KettleStoreError, registry::BidRegistry};

type Result<T, E = KettleStoreError> = std::result::Result<T, E>;

/// Request-scoped view over the shared local store.
///
/// The view holds no data of its own; it forwards every operation to the
/// shared registry while injecting the request's caller stack into each
/// access-control decision. Writes are immediately visible to subsequent
/// reads through the same view (and every other view, the store is shared).
/// Successful mutations are enqueued for replication; replication failures
/// never surface to the caller.
pub struct TransactionalStore {
    registry: Arc<BidRegistry>,
    outbox_tx: flume::Sender<SignedDaMessage>,
    signer: Arc<dyn MessageSigner>,
    request: ConfidentialRequest,
}

impl TransactionalStore {
    pub(crate) fn new(
        registry: Arc<BidRegistry>,
        outbox_tx: flume::Sender<SignedDaMessage>,
        signer: Arc<dyn MessageSigner>,
        request: ConfidentialRequest,
    ) -> Self {
        Self {
            registry,
            outbox_tx,
            signer,
            request,
        }
    }

    /// The confidential-compute request this view is bound to
    #[must_use]
    pub fn request(&self) -> &ConfidentialRequest {
        &self.request
    }

    /// Creates a new bid on behalf of the request's effective caller.
    ///
    /// The bid's creation is enqueued for replication so peers learn about
    /// it even before any payload is stored under it.
    ///
    /// # Errors
    ///
    /// Returns [`KettleStoreError::NotAvailableInContext`] when the request
    /// carries an empty caller stack, and registry errors otherwise.
    pub fn initialize_bid(&self, executing: Address, bid: Bid) -> Result<Bid> {
        let caller = self.effective_caller(executing)?;
        let bid = self.registry.initialize_bid(bid, caller)?;
        self.publish(bid.clone(), caller, vec![]);
        Ok(bid)
    }

    /// Stores `value` under `(bid_id, key)` on behalf of the request's
    /// effective caller, then enqueues the write for replication.
    ///
    /// # Errors
    ///
    /// Returns [`KettleStoreError::NotAvailableInContext`] when the request
    /// carries an empty caller stack, and registry errors otherwise.
    pub fn store(&self, executing: Address, bid_id: BidId, key: &str, value: Bytes) -> Result<()> {
        let caller = self.effective_caller(executing)?;
        self.registry.store(bid_id, caller, key, value.clone())?;
        let stored = self.registry.stored_bid(bid_id)?;
        self.publish(
            stored.bid,
            stored.creator,
            vec![StoreWrite {
                bid_id,
                caller,
                key: key.to_string(),
                value,
            }],
        );
        Ok(())
    }

    /// Retrieves the value stored under `(bid_id, key)` on behalf of the
    /// request's effective caller.
    ///
    /// # Errors
    ///
    /// Returns [`KettleStoreError::NotAvailableInContext`] when the request
    /// carries an empty caller stack, and registry errors otherwise.
    pub fn retrieve(&self, executing: Address, bid_id: BidId, key: &str) -> Result<Bytes> {
        let caller = self.effective_caller(executing)?;
        self.registry.retrieve(bid_id, caller, key)
    }

    /// Lists bids matching the decryption condition and namespace.
    ///
    /// Exposes metadata only; no access control applies.
    #[must_use]
    pub fn fetch_bids(&self, decryption_condition: u64, namespace: &str) -> Vec<Bid> {
        self.registry.fetch_bids(decryption_condition, namespace)
    }

    fn effective_caller(&self, executing: Address) -> Result<Address> {
        if self.request.caller_stack.is_empty() {
            return Err(KettleStoreError::NotAvailableInContext);
        }
        Ok(self.request.caller_stack.effective_caller(executing))
    }

    fn publish(&self, bid: Bid, creator: Address, writes: Vec<StoreWrite>) {
        let message = DaMessage {
            source: self.signer.address(),
            bid,
            creator,
            originator: self.request.originator,
            request_hash: self.request.request_hash,
            writes,
        };
        let serialized = match message.serialize_with_hash() {
            Ok(serialized) => serialized,
            Err(e) => {
                warn!(
                    target = "kettle-store",
                    event = "publish_serialize_failed",
                    error = %e,
                    "Failed to serialize replication message, skipping publication"
                );
                return;
            }
        };
        let signature = match self.signer.sign_hash(serialized.hash.as_bytes()) {
            Ok(signature) => signature,
            Err(e) => {
                warn!(
                    target = "kettle-store",
                    event = "publish_sign_failed",
                    error = %e,
                    "Failed to sign replication message, skipping publication"
                );
                return;
            }
        };
        let signed = SignedDaMessage {
            message,
            signature: signature.to_vec(),
            context_signature: self.request.context_signature.to_vec(),
        };
        if self.outbox_tx.send(signed).is_err() {
            warn!(
                target = "kettle-store",
                event = "publish_outbox_closed",
                "Replication outbox is closed, dropping message"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::B256;
    use kettle_types::{CallerStack, Secp256k1Signer};

    use super::*;

    const PRECOMPILE: Address = Address::repeat_byte(0x20);

    struct Fixture {
        registry: Arc<BidRegistry>,
        outbox_rx: flume::Receiver<SignedDaMessage>,
        originator: Secp256k1Signer,
        view: TransactionalStore,
    }

    fn fixture_with_stack(stack: CallerStack) -> Fixture {
        let registry = Arc::new(BidRegistry::new());
        let (outbox_tx, outbox_rx) = flume::unbounded();
        let kettle = Arc::new(Secp256k1Signer::random());
        let originator = Secp256k1Signer::random();
        let request_hash = B256::repeat_byte(0x5a);
        let context_signature = originator.sign_hash(&request_hash.0).unwrap();
        let request = ConfidentialRequest {
            caller_stack: stack,
            confidential_inputs: Bytes::new(),
            request_hash,
            originator: originator.address(),
            context_signature: Bytes::from(context_signature.to_vec()),
        };
        let view = TransactionalStore::new(Arc::clone(&registry), outbox_tx, kettle, request);
        Fixture {
            registry,
            outbox_rx,
            originator,
            view,
        }
    }

    fn fixture() -> Fixture {
        let mut fx = fixture_with_stack(CallerStack::new());
        fx.view.request.caller_stack = CallerStack::new().pushed(Some(fx.originator.address()));
        fx
    }

    fn sample_bid(originator: Address) -> Bid {
        Bid {
            decryption_condition: 10,
            allowed_peekers: vec![originator],
            allowed_stores: vec![],
            namespace: "default:v0:ethBundles".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_caller_stack_is_rejected() {
        let fx = fixture_with_stack(CallerStack::new());
        let bid = sample_bid(fx.originator.address());
        assert!(matches!(
            fx.view.initialize_bid(PRECOMPILE, bid).unwrap_err(),
            KettleStoreError::NotAvailableInContext
        ));
        assert!(matches!(
            fx.view
                .store(PRECOMPILE, BidId::ZERO, "k", Bytes::new())
                .unwrap_err(),
            KettleStoreError::NotAvailableInContext
        ));
        assert!(matches!(
            fx.view.retrieve(PRECOMPILE, BidId::ZERO, "k").unwrap_err(),
            KettleStoreError::NotAvailableInContext
        ));
    }

    #[test]
    fn test_own_writes_visible_to_own_reads() {
        let fx = fixture();
        let bid = fx
            .view
            .initialize_bid(PRECOMPILE, sample_bid(fx.originator.address()))
            .unwrap();
        fx.view
            .store(PRECOMPILE, bid.id, "k", Bytes::from_static(b"payload"))
            .unwrap();
        assert_eq!(
            fx.view.retrieve(PRECOMPILE, bid.id, "k").unwrap(),
            Bytes::from_static(b"payload")
        );
    }

    #[test]
    fn test_mutations_enqueue_verified_messages() {
        let fx = fixture();
        let bid = fx
            .view
            .initialize_bid(PRECOMPILE, sample_bid(fx.originator.address()))
            .unwrap();
        fx.view
            .store(PRECOMPILE, bid.id, "k", Bytes::from_static(b"payload"))
            .unwrap();

        let creation = fx.outbox_rx.try_recv().unwrap();
        creation.verify().unwrap();
        assert_eq!(creation.message.bid.id, bid.id);
        assert!(creation.message.writes.is_empty());

        let write = fx.outbox_rx.try_recv().unwrap();
        write.verify().unwrap();
        assert_eq!(write.message.writes.len(), 1);
        assert_eq!(write.message.writes[0].caller, fx.originator.address());
        assert_eq!(write.message.creator, fx.originator.address());
    }

    #[test]
    fn test_view_shares_registry_with_other_views() {
        let fx = fixture();
        let bid = fx
            .view
            .initialize_bid(PRECOMPILE, sample_bid(fx.originator.address()))
            .unwrap();
        assert_eq!(fx.registry.fetch_bids(10, "default:v0:ethBundles").len(), 1);
        assert_eq!(fx.view.fetch_bids(10, "default:v0:ethBundles")[0].id, bid.id);
    }
}
