pub mod bid;
pub mod caller;
pub mod errors;
pub mod message;
pub mod request;
pub mod signer;

pub use bid::{random_bid_id, Bid, BidId, StoreWrite};
pub use caller::CallerStack;
pub use errors::KettleTypesError;
pub use message::{
    DaMessage, SerializeWithHash, SerializeWithSignature, SerializedMessage, SignedDaMessage,
};
pub use request::ConfidentialRequest;
pub use signer::{recover_signer, MessageSigner, Secp256k1Signer, SIGNATURE_LENGTH};
