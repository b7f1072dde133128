//! Fire-and-forget publish/subscribe for [`StateEvent`]s.
//!
//! Each subscriber owns an `mpsc` receiver. Publishing clones the event into
//! every live channel and prunes subscribers whose receiver has been dropped.
//! There is no replay buffer: a subscriber that attaches after an event was
//! published has to query current state itself.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, mpsc};

use crate::state::events::StateEvent;

/// Identifier handed out by [`EventBus::subscribe`].
pub type SubscriptionId = u64;

/// A live subscription: its id and the receiving end of its channel.
pub struct Subscription {
    pub id: SubscriptionId,
    pub receiver: mpsc::Receiver<StateEvent>,
}

#[derive(Default)]
struct Registry {
    subscribers: BTreeMap<SubscriptionId, mpsc::Sender<StateEvent>>,
}

/// Cloneable handle to a shared subscriber registry.
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Arc<Mutex<Registry>>,
    next_id: Arc<AtomicU64>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a new subscriber. Only events published from now on are delivered.
    pub fn subscribe(&self) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let (sender, receiver) = mpsc::channel();
        if let Ok(mut registry) = self.registry.lock() {
            registry.subscribers.insert(id, sender);
        }
        Subscription { id, receiver }
    }

    /// Detach a subscriber. Its receiver sees the channel close.
    ///
    /// Returns false if the id was unknown or already pruned.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.registry
            .lock()
            .map(|mut registry| registry.subscribers.remove(&id).is_some())
            .unwrap_or(false)
    }

    /// Deliver `event` to every live subscriber, best effort.
    ///
    /// Returns how many subscribers received it.
    pub fn publish(&self, event: StateEvent) -> usize {
        let Ok(mut registry) = self.registry.lock() else {
            return 0;
        };

        let mut dead = Vec::new();
        let mut delivered = 0;
        for (id, sender) in &registry.subscribers {
            if sender.send(event.clone()).is_ok() {
                delivered += 1;
            } else {
                dead.push(*id);
            }
        }
        for id in dead {
            registry.subscribers.remove(&id);
        }

        delivered
    }

    /// Number of currently registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.registry
            .lock()
            .map(|registry| registry.subscribers.len())
            .unwrap_or(0)
    }
}
