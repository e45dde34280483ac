use std::sync::Arc;
use std::time::Duration;

use kettle_types::{
    ConfidentialRequest, MessageSigner, SerializeWithSignature, SignedDaMessage,
};
use kettle_utils::spawn_with_shutdown;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, instrument, warn};

use crate::{
    config::KettleStoreConfig,
    registry::BidRegistry,
    subscription::{Subscription, SubscriptionHub},
    transactional::TransactionalStore,
};

/// Owns the authoritative local store plus the replication subsystem.
///
/// One engine instance serves every in-flight confidential-compute request
/// of the kettle. Requests obtain request-scoped views through
/// [`StoreEngine::new_transactional_store`]; replication runs on background
/// tasks started once through [`StoreEngine::start`] and wound down through
/// [`StoreEngine::stop`].
pub struct StoreEngine {
    config: KettleStoreConfig,
    registry: Arc<BidRegistry>,
    hub: Arc<SubscriptionHub>,
    signer: Arc<dyn MessageSigner>,
    outbox_tx: flume::Sender<SignedDaMessage>,
    tasks: Mutex<EngineTasks>,
}

struct EngineTasks {
    outbox_rx: Option<flume::Receiver<SignedDaMessage>>,
    shutdown: Option<watch::Sender<bool>>,
    handles: Vec<JoinHandle<anyhow::Result<()>>>,
}

impl StoreEngine {
    #[must_use]
    pub fn new(config: KettleStoreConfig, signer: Arc<dyn MessageSigner>) -> Self {
        let (outbox_tx, outbox_rx) = flume::unbounded();
        let hub = Arc::new(SubscriptionHub::new(config.subscriber_queue_capacity));
        Self {
            config,
            registry: Arc::new(BidRegistry::new()),
            hub,
            signer,
            outbox_tx,
            tasks: Mutex::new(EngineTasks {
                outbox_rx: Some(outbox_rx),
                shutdown: None,
                handles: Vec::new(),
            }),
        }
    }

    /// Starts the background replication tasks.
    ///
    /// `outbound_tx` carries wire-encoded messages toward the transport;
    /// `inbound_rx` delivers wire-encoded messages received from peers.
    /// Calling `start` on an engine that is already running logs a warning
    /// and leaves the running tasks untouched.
    #[instrument(level = "debug", skip_all)]
    pub async fn start(
        &self,
        outbound_tx: flume::Sender<Vec<u8>>,
        inbound_rx: flume::Receiver<Vec<u8>>,
    ) {
        let mut tasks = self.tasks.lock().await;
        if tasks.shutdown.is_some() {
            warn!(
                target = "kettle-store",
                event = "engine_already_started",
                "Store engine is already running, ignoring start request"
            );
            return;
        }
        let Some(outbox_rx) = tasks.outbox_rx.take() else {
            warn!(
                target = "kettle-store",
                event = "engine_restarted_after_stop",
                "Store engine was already stopped, ignoring start request"
            );
            return;
        };
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let outbox_handle = spawn_with_shutdown(
            run_outbox(
                outbox_rx,
                outbound_tx,
                self.config.publish_retry_attempts,
                self.config.publish_retry_backoff,
                shutdown_rx.clone(),
            ),
            shutdown_tx.clone(),
        );
        let applier_handle = spawn_with_shutdown(
            run_applier(
                Arc::clone(&self.registry),
                Arc::clone(&self.hub),
                inbound_rx,
                shutdown_rx,
            ),
            shutdown_tx.clone(),
        );
        tasks.shutdown = Some(shutdown_tx);
        tasks.handles = vec![outbox_handle, applier_handle];
    }

    /// Stops the background replication tasks and waits for them to finish.
    ///
    /// Calling `stop` on an engine that is not running is a no-op.
    #[instrument(level = "debug", skip_all)]
    pub async fn stop(&self) {
        let (shutdown, handles) = {
            let mut tasks = self.tasks.lock().await;
            (tasks.shutdown.take(), std::mem::take(&mut tasks.handles))
        };
        let Some(shutdown) = shutdown else {
            return;
        };
        if shutdown.send(true).is_err() {
            warn!(
                target = "kettle-store",
                event = "engine_shutdown_signal_failed",
                "Replication tasks already terminated before shutdown signal"
            );
        }
        for handle in handles {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!(
                        target = "kettle-store",
                        event = "engine_task_failed",
                        error = %e,
                        "Replication task terminated with error"
                    );
                }
                Err(e) => {
                    error!(
                        target = "kettle-store",
                        event = "engine_task_panicked",
                        error = %e,
                        "Replication task panicked"
                    );
                }
            }
        }
    }

    /// Opens a view over the shared store bound to one confidential-compute
    /// request. Views are cheap and independent; any number may coexist.
    #[must_use]
    pub fn new_transactional_store(&self, request: ConfidentialRequest) -> TransactionalStore {
        TransactionalStore::new(
            Arc::clone(&self.registry),
            self.outbox_tx.clone(),
            Arc::clone(&self.signer),
            request,
        )
    }

    /// Registers a subscriber for messages applied from peer kettles
    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        self.hub.subscribe()
    }

    /// The shared local store
    #[must_use]
    pub fn registry(&self) -> &Arc<BidRegistry> {
        &self.registry
    }
}

/// Drains the outbox toward the transport.
///
/// Each message is offered to the bounded transport channel with a bounded
/// number of retries; when the channel stays full the message is dropped
/// and logged. Local store state is unaffected either way.
async fn run_outbox(
    outbox_rx: flume::Receiver<SignedDaMessage>,
    outbound_tx: flume::Sender<Vec<u8>>,
    retry_attempts: u32,
    retry_backoff: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    loop {
        tokio::select! {
            message = outbox_rx.recv_async() => {
                let Ok(signed) = message else {
                    return Ok(());
                };
                let wire = match signed.serialize_with_signature() {
                    Ok(wire) => wire,
                    Err(e) => {
                        warn!(
                            target = "kettle-store",
                            event = "outbox_serialize_failed",
                            error = %e,
                            "Failed to serialize outbound replication message, dropping it"
                        );
                        continue;
                    }
                };
                deliver(&outbound_tx, wire, retry_attempts, retry_backoff).await;
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    return Ok(());
                }
            }
        }
    }
}

async fn deliver(
    outbound_tx: &flume::Sender<Vec<u8>>,
    wire: Vec<u8>,
    retry_attempts: u32,
    retry_backoff: Duration,
) {
    let mut pending = wire;
    for attempt in 0..=retry_attempts {
        if attempt > 0 {
            tokio::time::sleep(retry_backoff).await;
        }
        match outbound_tx.try_send(pending) {
            Ok(()) => return,
            Err(flume::TrySendError::Full(rejected)) => pending = rejected,
            Err(flume::TrySendError::Disconnected(_)) => {
                warn!(
                    target = "kettle-store",
                    event = "outbox_transport_closed",
                    "Transport channel is closed, dropping outbound replication message"
                );
                return;
            }
        }
    }
    warn!(
        target = "kettle-store",
        event = "outbox_retries_exhausted",
        retry_attempts,
        "Transport channel stayed full, dropping outbound replication message"
    );
}

/// Applies inbound wire messages to the local store and fans them out to
/// subscribers. Messages failing deserialization, signature verification,
/// or access control are rejected and logged.
async fn run_applier(
    registry: Arc<BidRegistry>,
    hub: Arc<SubscriptionHub>,
    inbound_rx: flume::Receiver<Vec<u8>>,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    loop {
        tokio::select! {
            wire = inbound_rx.recv_async() => {
                let Ok(wire) = wire else {
                    return Ok(());
                };
                apply_inbound(&registry, &hub, &wire);
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    return Ok(());
                }
            }
        }
    }
}

fn apply_inbound(registry: &BidRegistry, hub: &SubscriptionHub, wire: &[u8]) {
    let signed = match SignedDaMessage::deserialize_with_signature(wire) {
        Ok(signed) => signed,
        Err(e) => {
            warn!(
                target = "kettle-store",
                event = "inbound_decode_failed",
                error = %e,
                "Failed to decode inbound replication message"
            );
            return;
        }
    };
    if let Err(e) = signed.verify() {
        warn!(
            target = "kettle-store",
            event = "inbound_signature_rejected",
            error = %e,
            source = %signed.message.source,
            "Rejected inbound replication message with invalid signatures"
        );
        return;
    }
    if let Err(e) = registry.apply_remote(&signed.message) {
        warn!(
            target = "kettle-store",
            event = "inbound_apply_rejected",
            error = %e,
            source = %signed.message.source,
            "Rejected inbound replication message"
        );
        return;
    }
    hub.publish(&Arc::new(signed));
}
