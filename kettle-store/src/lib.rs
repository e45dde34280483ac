pub mod config;
pub mod engine;
pub mod errors;
pub mod registry;
pub mod subscription;
pub mod transactional;

pub use config::KettleStoreConfig;
pub use engine::StoreEngine;
pub use errors::KettleStoreError;
pub use registry::{BidRegistry, StoredBid};
pub use subscription::{Subscription, SubscriptionHub};
pub use transactional::TransactionalStore;
