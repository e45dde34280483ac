use alloy_primitives::Address;
use kettle_types::{BidId, KettleTypesError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KettleStoreError {
    #[error("Bid {0} not found")]
    BidNotFound(BidId),
    #[error("No value stored under bid {bid_id}, key `{key}`")]
    KeyNotFound { bid_id: BidId, key: String },
    #[error("Caller {caller} is not allowed to access bid {bid_id}")]
    AccessDenied { bid_id: BidId, caller: Address },
    #[error("Backing store cannot accept the write: {0}")]
    StoreUnavailable(String),
    #[error("Not allowed in this confidential context")]
    NotAvailableInContext,
    #[error("Failed to process replication payload: {0}")]
    TypesError(#[from] KettleTypesError),
}
