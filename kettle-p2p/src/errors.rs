use libp2p::{
    gossipsub::{ConfigBuilderError, PublishError, SubscriptionError},
    swarm::DialError,
    TransportError,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KettleP2pNodeError {
    #[error("Failed to build gossipsub config: {0}")]
    GossipsubConfigError(#[from] ConfigBuilderError),
    #[error("Failed to build behaviour: {0}")]
    BehaviourBuildError(String),
    #[error("Failed to subscribe to topic: {0}")]
    GossipsubSubscriptionError(#[from] SubscriptionError),
    #[error("Failed to listen on address: {0}")]
    SwarmListenOnError(#[from] TransportError<std::io::Error>),
    #[error("Failed to dial bootstrap node: {0}")]
    BootstrapNodeDialError(#[from] DialError),
    #[error("Failed to parse listen address: {0}")]
    ListenAddressParseError(#[from] libp2p::multiaddr::Error),
    #[error("Failed to initialize noise encryption: {0}")]
    NoiseError(#[from] libp2p::noise::Error),
    #[error("Failed to set up transport: {0}")]
    TransportSetupError(#[from] std::io::Error),
    #[error("Failed to publish gossipsub message: {0}")]
    GossipsubMessagePublishError(#[from] PublishError),
    #[error("Invalid replication message: {0}")]
    MessageVerificationError(#[from] kettle_types::KettleTypesError),
    #[error("Store engine inbound channel closed")]
    StoreChannelClosedError,
}
