//! Process-wide invalidation bus.
//!
//! Mutations publish a topic when shared state changes; screens that cache
//! a view of that state subscribe and re-fetch. Subscriptions are owned by
//! their consumer: dropping the [`Subscription`] guard (or calling
//! [`InvalidationBus::unsubscribe`]) removes the handler, and a handler
//! removed mid-delivery is never invoked afterwards.

use std::borrow::Cow;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::mpsc;
use tracing::debug;

/// Name of a broadcast channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Topic(Cow<'static, str>);

impl Topic {
    /// Published after the principal's saved-zines set changes.
    pub const SAVED_ZINES_CHANGED: Self = Self(Cow::Borrowed("saved-zines-changed"));

    /// Topic with a caller-chosen name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    /// Topic name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Handle identifying one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

type Handler = Arc<dyn Fn(&Topic) + Send + Sync>;

struct Entry {
    id: SubscriptionId,
    topic: Topic,
    handler: Handler,
    active: Arc<AtomicBool>,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    entries: Vec<Entry>,
}

impl Registry {
    /// Detach an entry. The caller drops it after releasing the lock, since
    /// a handler may own further subscriptions.
    fn remove(&mut self, id: SubscriptionId) -> Option<Entry> {
        let index = self.entries.iter().position(|entry| entry.id == id)?;
        let entry = self.entries.remove(index);
        entry.active.store(false, Ordering::Release);
        Some(entry)
    }
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    // Handlers run outside the lock, so a poisoned registry still holds
    // consistent data.
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Topic-keyed publish/subscribe relay.
///
/// Cloning is cheap; clones share one subscriber registry. Pass the bus to
/// every consumer that needs it rather than reaching for a global.
///
/// # Examples
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use zinezone::domain::{InvalidationBus, Topic};
///
/// let bus = InvalidationBus::new();
/// let hits = Arc::new(AtomicUsize::new(0));
/// let counter = Arc::clone(&hits);
/// let subscription = bus.subscribe(Topic::SAVED_ZINES_CHANGED, move |_| {
///     counter.fetch_add(1, Ordering::SeqCst);
/// });
///
/// bus.publish(&Topic::SAVED_ZINES_CHANGED);
/// drop(subscription);
/// bus.publish(&Topic::SAVED_ZINES_CHANGED);
/// assert_eq!(hits.load(Ordering::SeqCst), 1);
/// ```
#[derive(Clone, Default)]
pub struct InvalidationBus {
    registry: Arc<Mutex<Registry>>,
}

impl fmt::Debug for InvalidationBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvalidationBus")
            .field("subscribers", &lock(&self.registry).entries.len())
            .finish()
    }
}

impl InvalidationBus {
    /// Bus with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Invoke `handler` on every publish of `topic` until the returned
    /// guard is dropped.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe<F>(&self, topic: Topic, handler: F) -> Subscription
    where
        F: Fn(&Topic) + Send + Sync + 'static,
    {
        let active = Arc::new(AtomicBool::new(true));
        let mut registry = lock(&self.registry);
        let id = SubscriptionId(registry.next_id);
        registry.next_id += 1;
        debug!(topic = %topic, subscription = id.0, "subscribed");
        registry.entries.push(Entry {
            id,
            topic,
            handler: Arc::new(handler),
            active: Arc::clone(&active),
        });
        Subscription {
            id,
            active,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Queue publishes of `topic` on a channel drained by the consumer's
    /// own update loop.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe_queued(&self, topic: Topic) -> QueuedSubscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        let subscription = self.subscribe(topic, move |published| {
            if sender.send(published.clone()).is_err() {
                debug!(topic = %published, "queued subscriber receiver dropped");
            }
        });
        QueuedSubscription {
            subscription,
            receiver,
        }
    }

    /// Remove a subscription. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = lock(&self.registry).remove(id);
        if removed.is_some() {
            debug!(subscription = id.0, "unsubscribed");
        }
        removed.is_some()
    }

    /// Deliver `topic` to every current subscriber and return how many
    /// handlers ran.
    ///
    /// Handlers run on the calling thread against a snapshot of the
    /// registry, so they may subscribe or unsubscribe freely.
    pub fn publish(&self, topic: &Topic) -> usize {
        let snapshot: Vec<(Handler, Arc<AtomicBool>)> = lock(&self.registry)
            .entries
            .iter()
            .filter(|entry| &entry.topic == topic)
            .map(|entry| (Arc::clone(&entry.handler), Arc::clone(&entry.active)))
            .collect();

        let mut delivered = 0;
        for (handler, active) in snapshot {
            if active.load(Ordering::Acquire) {
                handler(topic);
                delivered += 1;
            }
        }
        debug!(topic = %topic, delivered, "published");
        delivered
    }

    /// Number of live subscriptions to `topic`.
    pub fn subscriber_count(&self, topic: &Topic) -> usize {
        lock(&self.registry)
            .entries
            .iter()
            .filter(|entry| &entry.topic == topic)
            .count()
    }
}

/// Guard owning one subscription; unsubscribes on drop.
pub struct Subscription {
    id: SubscriptionId,
    active: Arc<AtomicBool>,
    registry: Weak<Mutex<Registry>>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

impl Subscription {
    /// Identifier accepted by [`InvalidationBus::unsubscribe`].
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Return `true` while the handler can still be invoked.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Unsubscribe now.
    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
        if let Some(registry) = self.registry.upgrade() {
            let removed = lock(&registry).remove(self.id);
            drop(removed);
        }
    }
}

/// Subscription whose deliveries are queued on a channel.
#[derive(Debug)]
pub struct QueuedSubscription {
    subscription: Subscription,
    receiver: mpsc::UnboundedReceiver<Topic>,
}

impl QueuedSubscription {
    /// Wait for the next delivery.
    ///
    /// Resolves to `None` once the bus has been dropped and the queue is
    /// drained.
    pub async fn recv(&mut self) -> Option<Topic> {
        self.receiver.recv().await
    }

    /// Take a queued delivery without waiting.
    pub fn try_recv(&mut self) -> Option<Topic> {
        self.receiver.try_recv().ok()
    }

    /// Drain every queued delivery, returning how many were pending.
    pub fn drain(&mut self) -> usize {
        let mut pending = 0;
        while self.receiver.try_recv().is_ok() {
            pending += 1;
        }
        pending
    }

    /// Underlying subscription guard.
    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use std::sync::atomic::AtomicUsize;

    #[fixture]
    fn bus() -> InvalidationBus {
        InvalidationBus::new()
    }

    fn counting(bus: &InvalidationBus, topic: Topic) -> (Subscription, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let subscription = bus.subscribe(topic, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (subscription, hits)
    }

    #[rstest]
    fn publish_reaches_every_subscriber_of_the_topic(bus: InvalidationBus) {
        let (_first, first_hits) = counting(&bus, Topic::SAVED_ZINES_CHANGED);
        let (_second, second_hits) = counting(&bus, Topic::SAVED_ZINES_CHANGED);
        let (_other, other_hits) = counting(&bus, Topic::new("profile-changed"));

        assert_eq!(bus.publish(&Topic::SAVED_ZINES_CHANGED), 2);
        assert_eq!(first_hits.load(Ordering::SeqCst), 1);
        assert_eq!(second_hits.load(Ordering::SeqCst), 1);
        assert_eq!(other_hits.load(Ordering::SeqCst), 0);
    }

    #[rstest]
    fn dropped_subscription_is_not_invoked(bus: InvalidationBus) {
        let (subscription, hits) = counting(&bus, Topic::SAVED_ZINES_CHANGED);
        drop(subscription);

        assert_eq!(bus.publish(&Topic::SAVED_ZINES_CHANGED), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(bus.subscriber_count(&Topic::SAVED_ZINES_CHANGED), 0);
    }

    #[rstest]
    fn explicit_unsubscribe_deactivates_guard(bus: InvalidationBus) {
        let (subscription, hits) = counting(&bus, Topic::SAVED_ZINES_CHANGED);
        assert!(bus.unsubscribe(subscription.id()));
        assert!(!subscription.is_active());
        assert!(!bus.unsubscribe(subscription.id()));

        bus.publish(&Topic::SAVED_ZINES_CHANGED);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[rstest]
    fn handler_removed_during_delivery_is_skipped(bus: InvalidationBus) {
        let victim_hits = Arc::new(AtomicUsize::new(0));
        let victim_slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let slot = Arc::clone(&victim_slot);
        let _killer = bus.subscribe(Topic::SAVED_ZINES_CHANGED, move |_| {
            slot.lock().expect("slot lock").take();
        });
        let counter = Arc::clone(&victim_hits);
        let victim = bus.subscribe(Topic::SAVED_ZINES_CHANGED, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        *victim_slot.lock().expect("slot lock") = Some(victim);

        assert_eq!(bus.publish(&Topic::SAVED_ZINES_CHANGED), 1);
        assert_eq!(victim_hits.load(Ordering::SeqCst), 0);
    }

    #[rstest]
    fn handlers_may_subscribe_during_delivery(bus: InvalidationBus) {
        let inner_bus = bus.clone();
        let spawned: Arc<Mutex<Vec<Subscription>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&spawned);
        let _outer = bus.subscribe(Topic::SAVED_ZINES_CHANGED, move |topic| {
            let nested = inner_bus.subscribe(topic.clone(), |_| {});
            sink.lock().expect("sink lock").push(nested);
        });

        assert_eq!(bus.publish(&Topic::SAVED_ZINES_CHANGED), 1);
        assert_eq!(bus.subscriber_count(&Topic::SAVED_ZINES_CHANGED), 2);
    }

    #[rstest]
    fn subscription_outliving_bus_drops_cleanly() {
        let bus = InvalidationBus::new();
        let (subscription, _) = counting(&bus, Topic::SAVED_ZINES_CHANGED);
        drop(bus);
        subscription.cancel();
    }

    #[tokio::test]
    async fn queued_subscription_receives_in_order() {
        let bus = InvalidationBus::new();
        let mut queued = bus.subscribe_queued(Topic::SAVED_ZINES_CHANGED);

        bus.publish(&Topic::SAVED_ZINES_CHANGED);
        bus.publish(&Topic::SAVED_ZINES_CHANGED);

        assert_eq!(queued.recv().await, Some(Topic::SAVED_ZINES_CHANGED));
        assert_eq!(queued.drain(), 1);
        assert!(queued.try_recv().is_none());
        assert!(queued.subscription().is_active());
    }
}
