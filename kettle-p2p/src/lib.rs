pub mod config;
pub mod errors;
pub mod service;
pub mod transport;

pub use config::KettleP2pConfig;
pub use errors::KettleP2pNodeError;
pub use service::KettleP2pNode;
pub use transport::{MockTransport, Transport};
