//! Subscriber registry and mailboxes.
//!
//! Every live consumer owns a [`Mailbox`]: a single-slot queue that keeps only
//! the newest payload. Publishing never waits on a consumer; a payload that
//! was not picked up before the next one arrives is dropped.

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{debug, trace};

/// Serialized snapshot delivered to subscribers.
pub type Payload = Arc<Value>;

#[derive(Debug, Default)]
struct SlotState {
    value: Option<Payload>,
    closed: bool,
}

/// Shared slot between the registry and the owning [`Mailbox`].
#[derive(Debug, Default)]
struct Slot {
    state: Mutex<SlotState>,
    notify: Notify,
}

impl Slot {
    /// Store `payload`, replacing any undelivered one. Returns `false` if the
    /// slot is closed.
    fn offer(&self, payload: Payload) -> bool {
        let replaced = {
            let mut state = self.state.lock();
            if state.closed {
                return false;
            }
            state.value.replace(payload).is_some()
        };

        if replaced {
            trace!("Dropped undelivered payload");
        }
        self.notify.notify_one();
        true
    }

    fn close(&self) {
        {
            let mut state = self.state.lock();
            state.closed = true;
            state.value = None;
        }
        // Every waiter on this slot must observe the close.
        self.notify.notify_waiters();
    }
}

/// Receiving end of one subscription.
#[derive(Debug)]
pub struct Mailbox {
    id: u64,
    slot: Arc<Slot>,
}

impl Mailbox {
    /// Registry-assigned identifier.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Wait for the next payload.
    ///
    /// Returns `None` once the mailbox has been unsubscribed or the registry
    /// closed. Cancel-safe: dropping the future loses nothing.
    pub async fn recv(&self) -> Option<Payload> {
        loop {
            // Register before checking so a close in between still wakes us.
            let notified = self.slot.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(result) = self.poll_slot() {
                return result;
            }
            notified.await;
        }
    }

    /// Take the pending payload without waiting.
    pub fn try_recv(&self) -> Option<Payload> {
        self.poll_slot().flatten()
    }

    /// Whether the mailbox no longer receives payloads.
    pub fn is_closed(&self) -> bool {
        self.slot.state.lock().closed
    }

    /// `Some(Some(_))` for a payload, `Some(None)` when closed, `None` when
    /// empty and open.
    fn poll_slot(&self) -> Option<Option<Payload>> {
        let mut state = self.slot.state.lock();
        match state.value.take() {
            Some(value) => Some(Some(value)),
            None if state.closed => Some(None),
            None => None,
        }
    }
}

/// The set of live mailboxes.
#[derive(Debug, Default)]
pub struct SubscriberRegistry {
    slots: RwLock<HashMap<u64, Arc<Slot>>>,
    next_id: AtomicU64,
    /// Set by `close_all`, only while holding the `slots` write lock.
    closed: AtomicBool,
}

impl SubscriberRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new mailbox. It only receives payloads published after
    /// this call. After [`close_all`](Self::close_all) the mailbox is
    /// returned already closed.
    pub fn subscribe(&self) -> Mailbox {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let slot = Arc::new(Slot::default());

        let mut slots = self.slots.write();
        if self.closed.load(Ordering::SeqCst) {
            slot.close();
        } else {
            slots.insert(id, slot.clone());
            debug!("Subscriber {} registered", id);
        }

        Mailbox { id, slot }
    }

    /// Register a mailbox wrapped in a guard that unsubscribes on drop.
    pub fn subscribe_guarded(self: &Arc<Self>) -> Subscription {
        Subscription {
            mailbox: self.subscribe(),
            registry: self.clone(),
        }
    }

    /// Remove a mailbox. Unknown or already removed mailboxes are ignored.
    ///
    /// Once this returns the mailbox receives nothing further, even from a
    /// publish that is already iterating.
    pub fn unsubscribe(&self, mailbox: &Mailbox) {
        if self.slots.write().remove(&mailbox.id).is_some() {
            debug!("Subscriber {} unregistered", mailbox.id);
        }
        mailbox.slot.close();
    }

    /// Deliver `payload` to every registered mailbox. Never blocks on a
    /// consumer. Returns the number of mailboxes that accepted it.
    pub fn publish(&self, payload: Payload) -> usize {
        let targets: Vec<Arc<Slot>> = self.slots.read().values().cloned().collect();

        let delivered = targets
            .iter()
            .filter(|slot| slot.offer(payload.clone()))
            .count();

        trace!("Published to {} of {} subscribers", delivered, targets.len());
        delivered
    }

    /// Close and remove every mailbox, waking all waiting consumers.
    pub fn close_all(&self) {
        let slots: Vec<Arc<Slot>> = {
            let mut slots = self.slots.write();
            self.closed.store(true, Ordering::SeqCst);
            slots.drain().map(|(_, s)| s).collect()
        };

        for slot in &slots {
            slot.close();
        }

        if !slots.is_empty() {
            debug!("Closed {} subscribers", slots.len());
        }
    }

    /// Number of live mailboxes.
    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    /// Whether no mailbox is registered.
    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }
}

/// A registered mailbox that unsubscribes itself when dropped.
///
/// Dropping covers every way a consumer can go away: normal return, error,
/// or cancellation of the task holding it.
#[derive(Debug)]
pub struct Subscription {
    mailbox: Mailbox,
    registry: Arc<SubscriberRegistry>,
}

impl Subscription {
    /// Wait for the next payload; `None` once closed.
    pub async fn recv(&self) -> Option<Payload> {
        self.mailbox.recv().await
    }

    /// Take the pending payload without waiting.
    pub fn try_recv(&self) -> Option<Payload> {
        self.mailbox.try_recv()
    }

    /// The underlying mailbox.
    pub fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.registry.unsubscribe(&self.mailbox);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio_test::{assert_pending, assert_ready_eq, task};

    fn payload(temp: f64) -> Payload {
        Arc::new(json!({ "current_temp_c": temp }))
    }

    #[test]
    fn test_subscribe_and_publish() {
        let registry = SubscriberRegistry::new();
        let mailbox = registry.subscribe();

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.publish(payload(18.01)), 1);
        assert_eq!(mailbox.try_recv(), Some(payload(18.01)));
        assert_eq!(mailbox.try_recv(), None);
    }

    #[test]
    fn test_never_drained_mailbox_keeps_latest() {
        let registry = SubscriberRegistry::new();
        let mailbox = registry.subscribe();

        registry.publish(payload(1.0));
        registry.publish(payload(2.0));

        assert_eq!(mailbox.try_recv(), Some(payload(2.0)));
        assert_eq!(mailbox.try_recv(), None);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let registry = SubscriberRegistry::new();
        assert_eq!(registry.publish(payload(1.0)), 0);
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let registry = SubscriberRegistry::new();
        let mailbox = registry.subscribe();
        let other = registry.subscribe();

        registry.unsubscribe(&mailbox);
        registry.unsubscribe(&mailbox);

        assert_eq!(registry.len(), 1);
        assert!(mailbox.is_closed());
        assert!(!other.is_closed());
    }

    #[test]
    fn test_unsubscribe_unknown_mailbox() {
        let registry = SubscriberRegistry::new();
        let foreign = SubscriberRegistry::new().subscribe();
        let own = registry.subscribe();

        registry.unsubscribe(&foreign);

        assert_eq!(registry.len(), 1);
        assert!(!own.is_closed());
    }

    #[test]
    fn test_unsubscribed_mailbox_receives_nothing() {
        let registry = SubscriberRegistry::new();
        let mailbox = registry.subscribe();

        registry.publish(payload(1.0));
        registry.unsubscribe(&mailbox);
        assert_eq!(registry.publish(payload(2.0)), 0);

        assert_eq!(mailbox.try_recv(), None);
    }

    #[test]
    fn test_independent_mailboxes() {
        let registry = SubscriberRegistry::new();
        let first = registry.subscribe();
        let second = registry.subscribe();

        assert_ne!(first.id(), second.id());
        assert_eq!(registry.publish(payload(18.01)), 2);

        let a = first.try_recv().unwrap();
        let b = second.try_recv().unwrap();
        assert_eq!(a, b);
        assert_eq!(first.try_recv(), None);
        assert_eq!(second.try_recv(), None);
    }

    #[test]
    fn test_recv_wakes_on_publish() {
        let registry = SubscriberRegistry::new();
        let mailbox = registry.subscribe();

        let mut recv = task::spawn(mailbox.recv());
        assert_pending!(recv.poll());

        registry.publish(payload(42.0));

        assert!(recv.is_woken());
        assert_ready_eq!(recv.poll(), Some(payload(42.0)));
    }

    #[test]
    fn test_recv_ends_on_close_all() {
        let registry = SubscriberRegistry::new();
        let mailbox = registry.subscribe();

        let mut recv = task::spawn(mailbox.recv());
        assert_pending!(recv.poll());

        registry.close_all();

        assert!(recv.is_woken());
        assert_ready_eq!(recv.poll(), None);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_close_all_wakes_every_waiter_on_one_subscription() {
        let registry = Arc::new(SubscriberRegistry::new());
        let subscription = Arc::new(registry.subscribe_guarded());

        let waiters: Vec<_> = (0..2)
            .map(|_| {
                let subscription = subscription.clone();
                tokio::spawn(async move { subscription.recv().await })
            })
            .collect();
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;

        registry.close_all();

        for waiter in waiters {
            let result = tokio::time::timeout(std::time::Duration::from_millis(500), waiter)
                .await
                .expect("waiter stayed blocked after close_all")
                .unwrap();
            assert_eq!(result, None);
        }
    }

    #[test]
    fn test_subscribe_after_close_all_is_closed() {
        let registry = SubscriberRegistry::new();
        registry.close_all();

        let mailbox = registry.subscribe();
        assert!(mailbox.is_closed());
        assert!(registry.is_empty());
        assert_eq!(registry.publish(payload(1.0)), 0);
    }

    #[test]
    fn test_subscription_guard_unsubscribes_on_drop() {
        let registry = Arc::new(SubscriberRegistry::new());
        let subscription = registry.subscribe_guarded();
        assert_eq!(registry.len(), 1);

        registry.publish(payload(3.0));
        assert_eq!(subscription.try_recv(), Some(payload(3.0)));

        drop(subscription);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_subscription_released_when_task_cancelled() {
        let registry = Arc::new(SubscriberRegistry::new());
        let subscription = registry.subscribe_guarded();

        let handle = tokio::spawn(async move {
            while subscription.recv().await.is_some() {}
        });
        tokio::task::yield_now().await;
        assert_eq!(registry.len(), 1);

        handle.abort();
        let _ = handle.await;

        assert!(registry.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_no_delivery_after_unsubscribe_under_concurrent_publish() {
        let registry = Arc::new(SubscriberRegistry::new());
        let stop = Arc::new(AtomicBool::new(false));

        let publisher = {
            let registry = registry.clone();
            let stop = stop.clone();
            tokio::spawn(async move {
                let mut n = 0.0;
                while !stop.load(Ordering::SeqCst) {
                    registry.publish(payload(n));
                    n += 1.0;
                    tokio::task::yield_now().await;
                }
            })
        };

        for _ in 0..200 {
            let mailbox = registry.subscribe();
            tokio::task::yield_now().await;
            registry.unsubscribe(&mailbox);
            for _ in 0..5 {
                tokio::task::yield_now().await;
                assert_eq!(mailbox.try_recv(), None);
            }
        }

        stop.store(true, Ordering::SeqCst);
        publisher.await.unwrap();
        assert!(registry.is_empty());
    }
}
