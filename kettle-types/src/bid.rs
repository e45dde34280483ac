use alloy_primitives::{Address, Bytes, FixedBytes};
use serde::{Deserialize, Serialize};

use crate::errors::KettleTypesError;

type Result<T, E = KettleTypesError> = std::result::Result<T, E>;

/// 128-bit identifier for a bid, also used for the creation salt
pub type BidId = FixedBytes<16>;

/// Metadata record of a confidential data item.
///
/// A bid is immutable once created; only the key/value payloads stored
/// under it grow over time. The payloads themselves never travel inside
/// this record, access to them is gated per key by the registry.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bid {
    /// Globally unique identifier, derived from the salt and the remaining fields
    pub id: BidId,

    /// Fresh random value mixed into the identifier derivation, so two callers
    /// creating bids with identical parameters never collide
    pub salt: BidId,

    /// The chain condition (typically a target block number) at which the
    /// bid's payloads are intended to become relevant
    pub decryption_condition: u64,

    /// Addresses permitted to retrieve payloads stored under this bid
    pub allowed_peekers: Vec<Address>,

    /// Addresses permitted to store additional payloads under this bid,
    /// in addition to the bid's creator
    pub allowed_stores: Vec<Address>,

    /// String bucket grouping bids that share a protocol identity
    pub namespace: String,
}

impl Bid {
    /// Derives the bid identifier from the salt and the remaining metadata.
    ///
    /// The identifier is the first 16 bytes of the blake3 hash of the
    /// CBOR encoding of `(salt, decryption_condition, allowed_peekers,
    /// allowed_stores, namespace)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata cannot be serialized.
    pub fn derive_id(&self) -> Result<BidId> {
        let fields = (
            &self.salt,
            self.decryption_condition,
            &self.allowed_peekers,
            &self.allowed_stores,
            &self.namespace,
        );
        let mut bytes = Vec::new();
        ciborium::into_writer(&fields, &mut bytes)?;
        let hash = blake3::hash(&bytes);
        Ok(BidId::from_slice(&hash.as_bytes()[..16]))
    }
}

/// Generates a fresh random bid identifier, used as the creation salt
#[must_use]
pub fn random_bid_id() -> BidId {
    BidId::from(rand::random::<[u8; 16]>())
}

/// A single payload write, the unit carried inside a replication message
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreWrite {
    /// The bid the payload is stored under
    pub bid_id: BidId,

    /// The effective caller that performed the write, recorded so that
    /// receiving kettles re-check the bid's allow-list before applying
    pub caller: Address,

    /// Payload key, scoped to the bid
    pub key: String,

    /// Opaque payload bytes
    pub value: Bytes,
}
