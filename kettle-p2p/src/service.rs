use std::hash::{DefaultHasher, Hash, Hasher};
use std::time::Duration;

use flume::{Receiver, Sender};
use futures::StreamExt;
use kettle_types::{KettleTypesError, SerializeWithSignature, SignedDaMessage};
use libp2p::{
    gossipsub, identify, identity, kad, mdns, noise,
    swarm::{NetworkBehaviour, SwarmEvent},
    tcp, yamux, Multiaddr, PeerId, Swarm, SwarmBuilder, StreamProtocol,
};
use tokio::sync::watch;
use tracing::{debug, error, instrument, warn};

use crate::{config::KettleP2pConfig, errors::KettleP2pNodeError, transport::Transport};

type Result<T, E = KettleP2pNodeError> = std::result::Result<T, E>;

/// The topic kettles use to gossip replication messages
const DA_GOSSIPSUB_TOPIC: &str = "kettle-da-messages";

/// The protocol name for the Kademlia DHT
const IPFS_PROTO_NAME: StreamProtocol = StreamProtocol::new("/ipfs/kad/1.0.0");

/// Network behaviour for a kettle's P2P node, combining multiple libp2p protocols.
#[derive(NetworkBehaviour)]
struct KettleP2pBehaviour {
    /// Publish-subscribe messaging used to broadcast replication messages
    /// with validation before propagation
    gossipsub: gossipsub::Behaviour,

    /// Identifies the node and its capabilities to peers, feeding kademlia
    /// and mdns routing
    identify: identify::Behaviour,

    /// Distributed hash table for peer discovery and routing in larger
    /// deployments, with a memory-based storage backend
    kademlia: kad::Behaviour<kad::store::MemoryStore>,

    /// Automatic peer discovery on local networks via multicast DNS,
    /// useful for development and local testing
    mdns: mdns::tokio::Behaviour,
}

/// Gossipsub-backed transport connecting the local store engine to the
/// kettle replication network.
///
/// Outbound wire-encoded messages are published to the replication topic;
/// inbound gossip is validated (decode plus both signatures) before being
/// reported to the mesh and forwarded toward the store engine.
pub struct KettleP2pNode {
    swarm: Swarm<KettleP2pBehaviour>,
}

impl KettleP2pNode {
    /// Initializes and configures the P2P node.
    ///
    /// Sets up TCP and QUIC transports with noise encryption and yamux
    /// multiplexing, subscribes to the replication topic, binds the
    /// configured listen addresses and dials the configured bootstrap
    /// peers.
    ///
    /// # Errors
    ///
    /// Returns an error if the swarm cannot be built, the topic cannot be
    /// subscribed, a listen address is invalid or cannot be bound, or a
    /// bootstrap peer cannot be dialed.
    #[instrument(level = "debug", skip_all)]
    pub fn start(config: &KettleP2pConfig) -> Result<Self> {
        let local_key = identity::Keypair::generate_ed25519();

        let mut swarm = SwarmBuilder::with_existing_identity(local_key)
            .with_tokio()
            .with_tcp(
                tcp::Config::default(),
                noise::Config::new,
                yamux::Config::default,
            )?
            .with_quic()
            .with_dns()?
            .with_behaviour(|key| {
                // Content-address messages by hashing their payload, so the
                // mesh deduplicates identical publications
                let message_id_fn = |message: &gossipsub::Message| {
                    let mut s = DefaultHasher::new();
                    message.data.hash(&mut s);
                    gossipsub::MessageId::from(s.finish().to_string())
                };

                let gossipsub_config = gossipsub::ConfigBuilder::default()
                    .heartbeat_interval(config.heartbeat_interval)
                    .validate_messages()
                    .validation_mode(gossipsub::ValidationMode::Strict)
                    .message_id_fn(message_id_fn)
                    .build()
                    .map_err(|e| {
                        error!(
                            target = "kettle-p2p",
                            event = "build_gossipsub_config",
                            error = %e,
                            "Failed to build gossipsub config"
                        );
                        KettleP2pNodeError::GossipsubConfigError(e)
                    })?;

                let gossipsub = gossipsub::Behaviour::new(
                    gossipsub::MessageAuthenticity::Signed(key.clone()),
                    gossipsub_config,
                )
                .map_err(|e| KettleP2pNodeError::BehaviourBuildError(e.to_string()))?;

                let mut cfg = kad::Config::new(IPFS_PROTO_NAME);
                cfg.set_query_timeout(Duration::from_secs(5 * 60));
                let store = kad::store::MemoryStore::new(key.public().to_peer_id());
                let kademlia = kad::Behaviour::with_config(key.public().to_peer_id(), store, cfg);

                let mdns = mdns::tokio::Behaviour::new(
                    mdns::Config::default(),
                    key.public().to_peer_id(),
                )?;

                let identify = identify::Behaviour::new(identify::Config::new(
                    "kettle-p2p/0.1.0".to_string(),
                    key.public(),
                ));

                Ok(KettleP2pBehaviour {
                    gossipsub,
                    identify,
                    kademlia,
                    mdns,
                })
            })
            .map_err(|e| {
                error!(
                    target = "kettle-p2p",
                    event = "build_behaviour",
                    error = %e,
                    "Failed to build behaviour"
                );
                KettleP2pNodeError::BehaviourBuildError(e.to_string())
            })?
            .with_swarm_config(|c| c.with_idle_connection_timeout(config.idle_connection_timeout))
            .build();

        let topic = gossipsub::IdentTopic::new(DA_GOSSIPSUB_TOPIC);
        swarm
            .behaviour_mut()
            .gossipsub
            .subscribe(&topic)
            .map_err(|e| {
                error!(
                    target = "kettle-p2p",
                    event = "subscribe_to_topic",
                    error = %e,
                    "Failed to subscribe to topic"
                );
                KettleP2pNodeError::GossipsubSubscriptionError(e)
            })?;

        for listen_addr in &config.listen_addrs {
            let addr: Multiaddr = listen_addr.parse().map_err(|e| {
                error!(
                    target = "kettle-p2p",
                    event = "address_parse_error",
                    listen_addr = %listen_addr,
                    error = %e,
                    "Failed to parse listen address"
                );
                KettleP2pNodeError::ListenAddressParseError(e)
            })?;
            if let Err(e) = swarm.listen_on(addr) {
                error!(
                    target = "kettle-p2p",
                    event = "listen_on_error",
                    listen_addr = %listen_addr,
                    error = %e,
                    "Failed to listen on address"
                );
                return Err(KettleP2pNodeError::SwarmListenOnError(e));
            }
        }

        for bootstrap_node in &config.bootstrap_nodes {
            let addr: Multiaddr = bootstrap_node.parse()?;
            swarm.dial(addr)?;
            debug!(
                target = "kettle-p2p",
                event = "dialed_bootstrap_node",
                bootstrap_node = %bootstrap_node,
                "Dialed bootstrap node"
            );
        }

        debug!(
            target = "kettle-p2p",
            event = "node_started",
            peer_id = %swarm.local_peer_id(),
            "Libp2p node started"
        );

        Ok(Self { swarm })
    }

    /// Handles one incoming gossipsub message.
    ///
    /// Messages from self are skipped. Other messages are validated before
    /// being reported to the gossipsub protocol, so only messages that
    /// decode and carry valid signatures propagate through the mesh.
    /// Accepted messages are forwarded to the store engine; a full engine
    /// queue drops the message without penalizing the sender.
    ///
    /// # Errors
    ///
    /// Returns an error if the store engine's inbound channel is closed.
    #[instrument(level = "debug", skip_all)]
    fn handle_gossipsub_message(
        &mut self,
        message_data: &[u8],
        message_id: &gossipsub::MessageId,
        propagation_source: &PeerId,
        inbound_tx: &Sender<Vec<u8>>,
    ) -> Result<()> {
        if propagation_source == self.swarm.local_peer_id() {
            debug!(
                target = "kettle-p2p",
                event = "gossipsub_message_from_self",
                "Gossipsub message from self"
            );
            return Ok(());
        }
        let message_acceptance = match validate_da_message(message_data) {
            Ok(()) => gossipsub::MessageAcceptance::Accept,
            Err(e) => {
                error!(
                    target = "kettle-p2p",
                    event = "gossipsub_message_validation_error",
                    message_id = %message_id,
                    propagation_source = %propagation_source,
                    error = %e,
                    "Failed to validate gossipsub message"
                );
                gossipsub::MessageAcceptance::Reject
            }
        };
        let accepted = matches!(message_acceptance, gossipsub::MessageAcceptance::Accept);
        self.swarm
            .behaviour_mut()
            .gossipsub
            .report_message_validation_result(message_id, propagation_source, message_acceptance);
        if !accepted {
            return Ok(());
        }
        match inbound_tx.try_send(message_data.to_vec()) {
            Ok(()) => Ok(()),
            Err(flume::TrySendError::Full(_)) => {
                warn!(
                    target = "kettle-p2p",
                    event = "inbound_queue_full",
                    message_id = %message_id,
                    "Store engine inbound queue is full, dropping replication message"
                );
                Ok(())
            }
            Err(flume::TrySendError::Disconnected(_)) => {
                Err(KettleP2pNodeError::StoreChannelClosedError)
            }
        }
    }

    /// Publishes one wire-encoded replication message to the topic
    ///
    /// # Errors
    ///
    /// Returns an error if the gossipsub publish fails, e.g. when no peers
    /// are subscribed yet.
    fn publish_da_message(&mut self, wire: Vec<u8>) -> Result<()> {
        let topic = gossipsub::IdentTopic::new(DA_GOSSIPSUB_TOPIC);
        self.swarm
            .behaviour_mut()
            .gossipsub
            .publish(topic, wire)
            .map_err(KettleP2pNodeError::GossipsubMessagePublishError)?;
        Ok(())
    }
}

impl Transport for KettleP2pNode {
    /// Runs the node's main event loop until shutdown.
    ///
    /// Processes swarm events (gossip, discovery, connection lifecycle),
    /// publishes messages arriving on `outbound_rx`, and forwards validated
    /// inbound gossip to `inbound_tx`.
    async fn run(
        mut self,
        outbound_rx: Receiver<Vec<u8>>,
        inbound_tx: Sender<Vec<u8>>,
        mut shutdown_signal: watch::Receiver<bool>,
    ) -> Result<()> {
        loop {
            tokio::select! {
                event = self.swarm.select_next_some() => {
                    match event {
                        SwarmEvent::Behaviour(KettleP2pBehaviourEvent::Gossipsub(gossipsub::Event::Message {
                            message_id,
                            message,
                            propagation_source,
                        })) => {
                            if let Err(e) = self.handle_gossipsub_message(&message.data, &message_id, &propagation_source, &inbound_tx) {
                                error!(
                                    target = "kettle-p2p",
                                    event = "gossipsub_message_error",
                                    error = %e,
                                    "Failed to handle gossipsub message"
                                );
                                return Err(e);
                            }
                        }
                        SwarmEvent::Behaviour(KettleP2pBehaviourEvent::Gossipsub(gossipsub::Event::Subscribed {
                            peer_id,
                            topic,
                        })) => {
                            debug!(
                                target = "kettle-p2p",
                                event = "gossipsub_subscribed",
                                peer_id = %peer_id,
                                topic = %topic,
                                "Peer subscribed to topic"
                            );
                        }
                        SwarmEvent::Behaviour(KettleP2pBehaviourEvent::Gossipsub(gossipsub::Event::Unsubscribed {
                            peer_id,
                            topic,
                        })) => {
                            debug!(
                                target = "kettle-p2p",
                                event = "gossipsub_unsubscribed",
                                peer_id = %peer_id,
                                topic = %topic,
                                "Peer unsubscribed from topic"
                            );
                        }
                        SwarmEvent::Behaviour(KettleP2pBehaviourEvent::Mdns(mdns::Event::Discovered(discovered_peers))) => {
                            for (peer_id, multiaddr) in discovered_peers {
                                debug!(
                                    target = "kettle-p2p",
                                    event = "mdns_discovered_peer",
                                    peer_id = %peer_id,
                                    multiaddr = %multiaddr,
                                    "Mdns discovered peer"
                                );
                                self.swarm.behaviour_mut().kademlia.add_address(&peer_id, multiaddr);
                            }
                        }
                        SwarmEvent::Behaviour(KettleP2pBehaviourEvent::Mdns(mdns::Event::Expired(expired_peers))) => {
                            for (peer_id, multiaddr) in expired_peers {
                                debug!(
                                    target = "kettle-p2p",
                                    event = "mdns_expired_peer",
                                    peer_id = %peer_id,
                                    multiaddr = %multiaddr,
                                    "Mdns expired peer"
                                );
                                self.swarm.behaviour_mut().kademlia.remove_address(&peer_id, &multiaddr);
                            }
                        }
                        SwarmEvent::ConnectionEstablished {
                            peer_id,
                            num_established,
                            ..
                        } => {
                            debug!(
                                target = "kettle-p2p",
                                event = "peer_connection_established",
                                peer_id = %peer_id,
                                num_established = %num_established,
                                "Peer connection established"
                            );
                        }
                        SwarmEvent::ConnectionClosed {
                            peer_id,
                            num_established,
                            ..
                        } => {
                            debug!(
                                target = "kettle-p2p",
                                event = "peer_connection_closed",
                                peer_id = %peer_id,
                                num_established = %num_established,
                                "Peer connection closed"
                            );
                        }
                        SwarmEvent::NewListenAddr {
                            address,
                            ..
                        } => {
                            debug!(
                                target = "kettle-p2p",
                                event = "new_listen_addr",
                                address = %address,
                                "New listen address"
                            );
                        }
                        swarm_event => {
                            debug!(
                                target = "kettle-p2p",
                                event = "swarm_event",
                                swarm_event = ?swarm_event,
                                "Swarm event"
                            );
                        }
                    }
                }
                outbound = outbound_rx.recv_async() => {
                    match outbound {
                        Ok(wire) => {
                            if let Err(e) = self.publish_da_message(wire) {
                                warn!(
                                    target = "kettle-p2p",
                                    event = "publish_da_message_error",
                                    error = %e,
                                    "Failed to publish replication message"
                                );
                            }
                        }
                        Err(_) => {
                            debug!(
                                target = "kettle-p2p",
                                event = "outbound_channel_closed",
                                "Outbound channel closed, shutting down transport"
                            );
                            return Ok(());
                        }
                    }
                }
                shutdown_signal_changed = shutdown_signal.changed() => {
                    match shutdown_signal_changed {
                        Ok(()) => {
                            if *shutdown_signal.borrow() {
                                debug!(
                                    target = "kettle-p2p",
                                    event = "shutdown_signal",
                                    "Shutdown signal received, shutting down"
                                );
                                return Ok(());
                            }
                        }
                        Err(e) => {
                            error!(
                                target = "kettle-p2p",
                                event = "shutdown_signal_error",
                                error = %e,
                                "Shutdown signal channel closed"
                            );
                            return Ok(());
                        }
                    }
                }
            }
        }
    }
}

/// Checks that a wire-encoded replication message decodes and carries valid
/// signatures. Registry-level access control happens later, when the store
/// engine applies the message.
fn validate_da_message(message_data: &[u8]) -> Result<(), KettleTypesError> {
    let signed = SignedDaMessage::deserialize_with_signature(message_data)?;
    signed.verify()
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{Bytes, B256};
    use kettle_types::{
        random_bid_id, Bid, DaMessage, MessageSigner, Secp256k1Signer, SerializeWithHash,
        StoreWrite,
    };

    use super::*;

    fn signed_wire_message() -> Vec<u8> {
        let kettle = Secp256k1Signer::random();
        let originator = Secp256k1Signer::random();
        let salt = random_bid_id();
        let mut bid = Bid {
            salt,
            decryption_condition: 7,
            allowed_peekers: vec![originator.address()],
            namespace: "default:v0:ethBundles".to_string(),
            ..Default::default()
        };
        bid.id = bid.derive_id().unwrap();
        let request_hash = B256::repeat_byte(0x5a);
        let message = DaMessage {
            source: kettle.address(),
            creator: originator.address(),
            originator: originator.address(),
            request_hash,
            writes: vec![StoreWrite {
                bid_id: bid.id,
                caller: originator.address(),
                key: "ethBundle".to_string(),
                value: Bytes::from_static(b"bundle-bytes"),
            }],
            bid,
        };
        let serialized = message.serialize_with_hash().unwrap();
        let signature = kettle.sign_hash(serialized.hash.as_bytes()).unwrap();
        let context_signature = originator.sign_hash(&request_hash.0).unwrap();
        let signed = SignedDaMessage {
            message,
            signature: signature.to_vec(),
            context_signature: context_signature.to_vec(),
        };
        signed.serialize_with_signature().unwrap()
    }

    #[test]
    fn test_validate_accepts_well_formed_message() {
        let wire = signed_wire_message();
        validate_da_message(&wire).unwrap();
    }

    #[test]
    fn test_validate_rejects_corrupted_signature() {
        let mut wire = signed_wire_message();
        wire[0] ^= 0xff;
        assert!(validate_da_message(&wire).is_err());
    }

    #[test]
    fn test_validate_rejects_tampered_payload() {
        let mut wire = signed_wire_message();
        let last = wire.len() - 1;
        wire[last] ^= 0xff;
        assert!(validate_da_message(&wire).is_err());
    }

    #[test]
    fn test_validate_rejects_truncated_message() {
        let wire = signed_wire_message();
        assert!(validate_da_message(&wire[..64]).is_err());
    }

    #[tokio::test]
    async fn test_node_starts_and_shuts_down() {
        let config = KettleP2pConfig {
            listen_addrs: vec![
                "/ip4/127.0.0.1/tcp/0".to_string(),
                "/ip4/127.0.0.1/udp/0/quic-v1".to_string(),
            ],
            bootstrap_nodes: vec![],
            heartbeat_interval: Duration::from_secs(1),
            idle_connection_timeout: Duration::from_secs(5),
        };
        let node = KettleP2pNode::start(&config).unwrap();
        let (_outbound_tx, outbound_rx) = flume::bounded(4);
        let (inbound_tx, _inbound_rx) = flume::bounded(4);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(node.run(outbound_rx, inbound_tx, shutdown_rx));
        shutdown_tx.send(true).unwrap();
        handle.await.unwrap().unwrap();
    }
}
