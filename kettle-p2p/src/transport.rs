use std::future::Future;

use flume::{Receiver, Sender};
use tokio::sync::watch;
use tracing::debug;

use crate::errors::KettleP2pNodeError;

/// Moves wire-encoded replication messages between the local store engine
/// and the network.
///
/// `outbound_rx` delivers messages the local engine wants broadcast;
/// `inbound_tx` carries messages observed on the network back to the
/// engine. A transport runs until the shutdown signal flips or its
/// channels close.
pub trait Transport: Send + 'static {
    fn run(
        self,
        outbound_rx: Receiver<Vec<u8>>,
        inbound_tx: Sender<Vec<u8>>,
        shutdown_signal: watch::Receiver<bool>,
    ) -> impl Future<Output = Result<(), KettleP2pNodeError>> + Send;
}

/// In-process transport for tests and single-kettle deployments.
///
/// With `loopback` set, every outbound message is fed straight back as an
/// inbound message, standing in for a peer that echoes the network.
/// Without it, outbound messages are discarded.
#[derive(Clone, Copy, Debug, Default)]
pub struct MockTransport {
    pub loopback: bool,
}

impl Transport for MockTransport {
    async fn run(
        self,
        outbound_rx: Receiver<Vec<u8>>,
        inbound_tx: Sender<Vec<u8>>,
        mut shutdown_signal: watch::Receiver<bool>,
    ) -> Result<(), KettleP2pNodeError> {
        loop {
            tokio::select! {
                outbound = outbound_rx.recv_async() => {
                    let Ok(wire) = outbound else {
                        return Ok(());
                    };
                    if self.loopback && inbound_tx.send_async(wire).await.is_err() {
                        return Ok(());
                    }
                }
                changed = shutdown_signal.changed() => {
                    if changed.is_err() || *shutdown_signal.borrow() {
                        debug!(
                            target = "kettle-p2p",
                            event = "mock_transport_shutdown",
                            "Mock transport shutting down"
                        );
                        return Ok(());
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_loopback_echoes_outbound_messages() {
        let (outbound_tx, outbound_rx) = flume::bounded(4);
        let (inbound_tx, inbound_rx) = flume::bounded(4);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(
            MockTransport { loopback: true }.run(outbound_rx, inbound_tx, shutdown_rx),
        );

        outbound_tx.send(vec![1, 2, 3]).unwrap();
        assert_eq!(inbound_rx.recv_async().await.unwrap(), vec![1, 2, 3]);

        drop(outbound_tx);
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_without_loopback_messages_are_discarded() {
        let (outbound_tx, outbound_rx) = flume::bounded(4);
        let (inbound_tx, inbound_rx) = flume::bounded(4);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle =
            tokio::spawn(MockTransport::default().run(outbound_rx, inbound_tx, shutdown_rx));

        outbound_tx.send(vec![1, 2, 3]).unwrap();
        drop(outbound_tx);
        handle.await.unwrap().unwrap();
        assert!(inbound_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_shutdown_signal_stops_transport() {
        let (_outbound_tx, outbound_rx) = flume::bounded::<Vec<u8>>(4);
        let (inbound_tx, _inbound_rx) = flume::bounded(4);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(
            MockTransport { loopback: true }.run(outbound_rx, inbound_tx, shutdown_rx),
        );

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap().unwrap();
    }
}
