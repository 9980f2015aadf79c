// Broadcast Hub - Multicast of tick events to live subscriber mailboxes
// Non-blocking publish; a full mailbox evicts its subscriber

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};
use uuid::Uuid;

struct Entry<T> {
    tx: mpsc::Sender<T>,
    alive: Arc<AtomicBool>,
}

struct Inner<T> {
    subscribers: Mutex<HashMap<Uuid, Entry<T>>>,
    mailbox_capacity: usize,
    published: AtomicU64,
    delivered: AtomicU64,
    evicted: AtomicU64,
}

/// Hub counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HubStats {
    pub subscribers: usize,
    pub mailbox_capacity: usize,
    pub published: u64,
    pub delivered: u64,
    pub evicted: u64,
}

/// Cheap-clone handle to the subscriber registry
pub struct BroadcastHub<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for BroadcastHub<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + 'static> BroadcastHub<T> {
    pub fn new(mailbox_capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                subscribers: Mutex::new(HashMap::new()),
                mailbox_capacity: mailbox_capacity.max(1),
                published: AtomicU64::new(0),
                delivered: AtomicU64::new(0),
                evicted: AtomicU64::new(0),
            }),
        }
    }

    /// Register a new mailbox
    pub fn subscribe(&self) -> Subscription<T> {
        let (tx, rx) = mpsc::channel(self.inner.mailbox_capacity);
        let id = Uuid::new_v4();
        let alive = Arc::new(AtomicBool::new(true));

        let count = {
            let mut subscribers = self.inner.subscribers.lock();
            subscribers.insert(
                id,
                Entry {
                    tx,
                    alive: Arc::clone(&alive),
                },
            );
            subscribers.len()
        };
        info!(subscriber = %id, subscribers = count, "Subscriber connected");

        Subscription {
            id,
            rx,
            alive,
            hub: self.clone(),
        }
    }

    /// Remove a subscriber. Unknown ids are a no-op.
    pub fn unsubscribe(&self, id: Uuid) -> bool {
        let removed = self.inner.subscribers.lock().remove(&id);
        match removed {
            Some(entry) => {
                entry.alive.store(false, Ordering::Release);
                debug!(subscriber = %id, "Subscriber removed");
                true
            }
            None => false,
        }
    }

    /// Enqueue into every mailbox without waiting. Returns the number of mailboxes reached.
    pub fn publish(&self, event: T) -> usize {
        let mut delivered = 0usize;
        let mut evicted = 0u64;

        {
            let mut subscribers = self.inner.subscribers.lock();
            subscribers.retain(|id, entry| match entry.tx.try_send(event.clone()) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(TrySendError::Full(_)) => {
                    warn!(subscriber = %id, "Subscriber mailbox full, dropping subscriber");
                    entry.alive.store(false, Ordering::Release);
                    evicted += 1;
                    false
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(subscriber = %id, "Subscriber mailbox closed");
                    entry.alive.store(false, Ordering::Release);
                    evicted += 1;
                    false
                }
            });
        }

        self.inner.published.fetch_add(1, Ordering::Relaxed);
        self.inner
            .delivered
            .fetch_add(delivered as u64, Ordering::Relaxed);
        self.inner.evicted.fetch_add(evicted, Ordering::Relaxed);
        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }

    pub fn stats(&self) -> HubStats {
        HubStats {
            subscribers: self.subscriber_count(),
            mailbox_capacity: self.inner.mailbox_capacity,
            published: self.inner.published.load(Ordering::Relaxed),
            delivered: self.inner.delivered.load(Ordering::Relaxed),
            evicted: self.inner.evicted.load(Ordering::Relaxed),
        }
    }
}

/// Receiving end of one subscriber. Dropping it unsubscribes.
pub struct Subscription<T: Clone + Send + 'static> {
    id: Uuid,
    rx: mpsc::Receiver<T>,
    alive: Arc<AtomicBool>,
    hub: BroadcastHub<T>,
}

impl<T: Clone + Send + 'static> Subscription<T> {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// False once the hub has dropped this subscriber
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Next event. `None` once evicted and the mailbox is drained.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }
}

impl<T: Clone + Send + 'static> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.hub.unsubscribe(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_reaches_every_subscriber() {
        let hub = BroadcastHub::<u64>::new(10);
        let mut a = hub.subscribe();
        let mut b = hub.subscribe();

        assert_eq!(hub.publish(7), 2);
        assert_eq!(a.try_recv(), Some(7));
        assert_eq!(b.try_recv(), Some(7));
        assert_eq!(hub.stats().delivered, 2);
    }

    #[test]
    fn test_full_mailbox_is_evicted_on_next_publish() {
        let hub = BroadcastHub::<u64>::new(2);
        let mut slow = hub.subscribe();
        let mut fast = hub.subscribe();

        hub.publish(1);
        assert_eq!(fast.try_recv(), Some(1));
        hub.publish(2);
        assert_eq!(fast.try_recv(), Some(2));

        // slow never drained: mailbox holds 2, third publish overflows it
        assert_eq!(hub.publish(3), 1);
        assert!(!slow.is_alive());
        assert!(fast.is_alive());
        assert_eq!(hub.subscriber_count(), 1);
        assert_eq!(hub.stats().evicted, 1);

        // buffered events drain, then the stream ends
        assert_eq!(slow.try_recv(), Some(1));
        assert_eq!(slow.try_recv(), Some(2));
        assert_eq!(slow.try_recv(), None);
    }

    #[tokio::test]
    async fn test_evicted_recv_ends_after_drain() {
        let hub = BroadcastHub::<u64>::new(1);
        let mut sub = hub.subscribe();
        hub.publish(1);
        hub.publish(2);

        assert_eq!(sub.recv().await, Some(1));
        assert_eq!(sub.recv().await, None);
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let hub = BroadcastHub::<u64>::new(4);
        let sub = hub.subscribe();
        let id = sub.id();

        assert!(hub.unsubscribe(id));
        assert!(!hub.unsubscribe(id));
        assert!(!sub.is_alive());
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let hub = BroadcastHub::<u64>::new(4);
        {
            let _sub = hub.subscribe();
            assert_eq!(hub.subscriber_count(), 1);
        }
        assert_eq!(hub.subscriber_count(), 0);
        assert_eq!(hub.publish(1), 0);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let hub = BroadcastHub::<u64>::new(4);
        assert_eq!(hub.publish(1), 0);
        assert_eq!(hub.stats().published, 1);
    }
}
