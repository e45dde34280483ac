use alloy_primitives::{Address, Bytes};
use dashmap::{mapref::entry::Entry, DashMap};
use kettle_types::{random_bid_id, Bid, BidId, DaMessage};

use crate::errors::KettleStoreError;

type Result<T, E = KettleStoreError> = std::result::Result<T, E>;

/// A bid admitted into the local store, together with the effective caller
/// that created it. The creator is authoritative for write access and is
/// carried in replication messages so that peers admit the bid with the
/// same authority.
#[derive(Clone, Debug)]
pub struct StoredBid {
    pub bid: Bid,
    pub creator: Address,
}

/// The authoritative local store of bids and their payloads.
///
/// All maps are sharded concurrent maps keyed by bid identifier (or by
/// `(bid, key)` for payloads), so operations on unrelated bids never
/// serialize against each other. Listing is served from a secondary index
/// keyed by `(decryption_condition, namespace)`.
#[derive(Debug, Default)]
pub struct BidRegistry {
    bids: DashMap<BidId, StoredBid>,
    index: DashMap<(u64, String), Vec<BidId>>,
    payloads: DashMap<(BidId, String), Bytes>,
}

impl BidRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Admits a new bid created by `creator`.
    ///
    /// Assigns a fresh random salt, derives the identifier from the salt and
    /// the remaining metadata, and stores the bid. The returned bid carries
    /// the assigned salt and identifier.
    ///
    /// # Errors
    ///
    /// Returns [`KettleStoreError::StoreUnavailable`] if the derived
    /// identifier is already present, and a serialization error if the
    /// identifier cannot be derived.
    pub fn initialize_bid(&self, mut bid: Bid, creator: Address) -> Result<Bid> {
        bid.salt = random_bid_id();
        bid.id = bid.derive_id()?;
        self.admit(bid.clone(), creator)?;
        Ok(bid)
    }

    /// Stores `value` under `(bid_id, key)` on behalf of `caller`.
    ///
    /// The caller must be the bid's creator or listed in the bid's
    /// `allowed_stores`. Re-storing an existing key replaces the previous
    /// value, subject to the same access check.
    ///
    /// # Errors
    ///
    /// Returns [`KettleStoreError::BidNotFound`] for an unknown bid and
    /// [`KettleStoreError::AccessDenied`] for an unauthorized caller.
    pub fn store(&self, bid_id: BidId, caller: Address, key: &str, value: Bytes) -> Result<()> {
        let stored = self
            .bids
            .get(&bid_id)
            .ok_or(KettleStoreError::BidNotFound(bid_id))?;
        if caller != stored.creator && !stored.bid.allowed_stores.contains(&caller) {
            return Err(KettleStoreError::AccessDenied { bid_id, caller });
        }
        drop(stored);
        self.payloads.insert((bid_id, key.to_string()), value);
        Ok(())
    }

    /// Retrieves the value stored under `(bid_id, key)` on behalf of `caller`.
    ///
    /// The caller must be listed in the bid's `allowed_peekers`.
    ///
    /// # Errors
    ///
    /// Returns [`KettleStoreError::BidNotFound`] for an unknown bid,
    /// [`KettleStoreError::AccessDenied`] for an unauthorized caller, and
    /// [`KettleStoreError::KeyNotFound`] if no value was ever stored under
    /// the key.
    pub fn retrieve(&self, bid_id: BidId, caller: Address, key: &str) -> Result<Bytes> {
        let stored = self
            .bids
            .get(&bid_id)
            .ok_or(KettleStoreError::BidNotFound(bid_id))?;
        if !stored.bid.allowed_peekers.contains(&caller) {
            return Err(KettleStoreError::AccessDenied { bid_id, caller });
        }
        drop(stored);
        self.payloads
            .get(&(bid_id, key.to_string()))
            .map(|value| value.clone())
            .ok_or_else(|| KettleStoreError::KeyNotFound {
                bid_id,
                key: key.to_string(),
            })
    }

    /// Returns every bid whose decryption condition and namespace match.
    ///
    /// No access control applies here: the listing exposes bid metadata
    /// only, payload access stays gated by [`BidRegistry::retrieve`]. The
    /// order of the returned bids is unspecified.
    #[must_use]
    pub fn fetch_bids(&self, decryption_condition: u64, namespace: &str) -> Vec<Bid> {
        let Some(ids) = self
            .index
            .get(&(decryption_condition, namespace.to_string()))
        else {
            return Vec::new();
        };
        ids.iter()
            .filter_map(|id| self.bids.get(id).map(|stored| stored.bid.clone()))
            .collect()
    }

    /// Looks up an admitted bid together with its creator
    ///
    /// # Errors
    ///
    /// Returns [`KettleStoreError::BidNotFound`] for an unknown bid
    pub fn stored_bid(&self, bid_id: BidId) -> Result<StoredBid> {
        self.bids
            .get(&bid_id)
            .map(|stored| stored.clone())
            .ok_or(KettleStoreError::BidNotFound(bid_id))
    }

    /// Applies a verified replication message from a peer kettle.
    ///
    /// The bid identifier is re-derived from the carried metadata before
    /// admission, so a peer cannot graft writes onto an identifier the
    /// metadata does not hash to. The bid is admitted if it is not yet
    /// known, then each write is applied under the same access check as a
    /// local store operation. The first failing write rejects the whole
    /// message.
    ///
    /// # Errors
    ///
    /// Returns [`KettleStoreError::StoreUnavailable`] if the carried
    /// identifier does not match the metadata, and the usual store errors
    /// for individual writes.
    pub fn apply_remote(&self, message: &DaMessage) -> Result<()> {
        let derived = message.bid.derive_id()?;
        if derived != message.bid.id {
            return Err(KettleStoreError::StoreUnavailable(format!(
                "bid id {} does not match its metadata (derived {derived})",
                message.bid.id
            )));
        }
        if !self.bids.contains_key(&message.bid.id) {
            self.admit(message.bid.clone(), message.creator)?;
        }
        for write in &message.writes {
            self.store(write.bid_id, write.caller, &write.key, write.value.clone())?;
        }
        Ok(())
    }

    fn admit(&self, bid: Bid, creator: Address) -> Result<()> {
        let id = bid.id;
        let condition = bid.decryption_condition;
        let namespace = bid.namespace.clone();
        match self.bids.entry(id) {
            Entry::Occupied(_) => {
                return Err(KettleStoreError::StoreUnavailable(format!(
                    "bid {id} already exists"
                )))
            }
            Entry::Vacant(slot) => {
                slot.insert(StoredBid { bid, creator });
            }
        }
        self.index.entry((condition, namespace)).or_default().push(id);
        Ok(())
    }
}
