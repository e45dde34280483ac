use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use kettle_types::SignedDaMessage;
use tracing::warn;

/// Fan-out point for the replication stream.
///
/// Each subscriber owns an independent bounded queue; a slow subscriber
/// overflows its own queue and loses messages without stalling delivery to
/// the others. Dropping or cancelling a [`Subscription`] removes its queue
/// from the hub, after which no further delivery is attempted for it.
#[derive(Debug)]
pub struct SubscriptionHub {
    capacity: usize,
    next_id: AtomicU64,
    subscribers: DashMap<u64, flume::Sender<Arc<SignedDaMessage>>>,
}

impl SubscriptionHub {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            next_id: AtomicU64::new(0),
            subscribers: DashMap::new(),
        }
    }

    /// Registers a new subscriber and returns its receiving handle
    pub fn subscribe(self: &Arc<Self>) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = flume::bounded(self.capacity);
        self.subscribers.insert(id, sender);
        Subscription {
            id,
            receiver,
            hub: Arc::downgrade(self),
        }
    }

    /// Offers a message to every live subscriber.
    ///
    /// Subscribers with a full queue miss this message; the drop is logged
    /// per subscriber. Subscribers whose receiving side has gone away are
    /// removed.
    pub fn publish(&self, message: &Arc<SignedDaMessage>) {
        let mut disconnected = Vec::new();
        for entry in &self.subscribers {
            match entry.value().try_send(Arc::clone(message)) {
                Ok(()) => {}
                Err(flume::TrySendError::Full(_)) => {
                    warn!(
                        target = "kettle-store",
                        event = "subscriber_queue_full",
                        subscriber_id = entry.key(),
                        "Subscriber queue is full, dropping replication message"
                    );
                }
                Err(flume::TrySendError::Disconnected(_)) => {
                    disconnected.push(*entry.key());
                }
            }
        }
        for id in disconnected {
            self.subscribers.remove(&id);
        }
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    fn unsubscribe(&self, id: u64) {
        self.subscribers.remove(&id);
    }
}

/// Receiving end of one replication subscription.
///
/// Consuming the subscription via [`Subscription::cancel`] (or dropping it)
/// deregisters it from the hub; messages published afterwards, and messages
/// still queued at that point, are never delivered.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    receiver: flume::Receiver<Arc<SignedDaMessage>>,
    hub: Weak<SubscriptionHub>,
}

impl Subscription {
    /// Awaits the next replicated message, or `None` once the hub is gone
    pub async fn recv(&self) -> Option<Arc<SignedDaMessage>> {
        self.receiver.recv_async().await.ok()
    }

    /// Returns an already-queued message without waiting, if there is one
    #[must_use]
    pub fn try_recv(&self) -> Option<Arc<SignedDaMessage>> {
        self.receiver.try_recv().ok()
    }

    /// Cancels the subscription, releasing its queue
    pub fn cancel(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.unsubscribe(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{Address, B256};
    use kettle_types::{Bid, DaMessage};

    use super::*;

    fn message(tag: u8) -> Arc<SignedDaMessage> {
        Arc::new(SignedDaMessage {
            message: DaMessage {
                source: Address::repeat_byte(tag),
                bid: Bid::default(),
                creator: Address::repeat_byte(0x01),
                originator: Address::repeat_byte(0x01),
                request_hash: B256::repeat_byte(tag),
                writes: vec![],
            },
            signature: vec![],
            context_signature: vec![],
        })
    }

    #[tokio::test]
    async fn test_all_subscribers_receive() {
        let hub = Arc::new(SubscriptionHub::new(8));
        let first = hub.subscribe();
        let second = hub.subscribe();
        hub.publish(&message(0x10));
        assert_eq!(first.recv().await.unwrap().message.request_hash, B256::repeat_byte(0x10));
        assert_eq!(second.recv().await.unwrap().message.request_hash, B256::repeat_byte(0x10));
    }

    #[tokio::test]
    async fn test_cancelled_subscriber_receives_nothing_further() {
        let hub = Arc::new(SubscriptionHub::new(8));
        let cancelled = hub.subscribe();
        let active = hub.subscribe();

        // One message still queued at cancellation time
        hub.publish(&message(0x10));
        cancelled.cancel();
        hub.publish(&message(0x20));

        assert_eq!(hub.subscriber_count(), 1);
        assert_eq!(active.try_recv().unwrap().message.request_hash, B256::repeat_byte(0x10));
        assert_eq!(active.try_recv().unwrap().message.request_hash, B256::repeat_byte(0x20));
    }

    #[tokio::test]
    async fn test_slow_subscriber_drops_without_stalling_others() {
        let hub = Arc::new(SubscriptionHub::new(1));
        let slow = hub.subscribe();
        let fast = hub.subscribe();

        hub.publish(&message(0x10));
        assert_eq!(fast.try_recv().unwrap().message.request_hash, B256::repeat_byte(0x10));
        hub.publish(&message(0x20));
        assert_eq!(fast.try_recv().unwrap().message.request_hash, B256::repeat_byte(0x20));

        // The slow subscriber never drained its queue, so only the first
        // message fit; the second was dropped for it alone
        assert_eq!(slow.try_recv().unwrap().message.request_hash, B256::repeat_byte(0x10));
        assert!(slow.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_dropped_subscription_deregisters() {
        let hub = Arc::new(SubscriptionHub::new(8));
        drop(hub.subscribe());
        assert_eq!(hub.subscriber_count(), 0);
        hub.publish(&message(0x10));
    }
}
