//! Path-keyed subscriptions
//!
//! Consumers register as observers and subscribe to slices of a single path.
//! Mutations mark matching subscriptions as pending; each observer drains its
//! own queue during its update pass. A subscription is queued at most once
//! between drains, so repeated writes to the same slice coalesce and the
//! consumer only ever reads the latest value from the store.

use std::collections::HashMap;

use bitflags::bitflags;
use slotmap::SlotMap;

bitflags! {
    /// Slices of per-path state a subscription can watch
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Slice: u8 {
        /// The ordered child list
        const CHILDREN   = 0b0_0001;
        /// The node record itself (added, re-skinned or removed)
        const NODE       = 0b0_0010;
        /// The visibility overlay entry
        const VISIBILITY = 0b0_0100;
        /// The transform overlay entry
        const TRANSFORM  = 0b0_1000;
        /// The renderable handle overlay entry
        const HANDLE     = 0b1_0000;
        /// Visibility and transform, the slices applied in place
        const ATTRIBUTES = Self::VISIBILITY.bits() | Self::TRANSFORM.bits();
    }
}

slotmap::new_key_type! {
    /// Identifies one consumer of store notifications
    pub struct ObserverId;

    /// Identifies one (path, slices) subscription
    pub struct SubscriptionId;
}

/// A pending change delivered to an observer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Subscription that fired
    pub subscription: SubscriptionId,
    /// Path it watches
    pub path: String,
    /// Slices that changed since the last drain
    pub changed: Slice,
}

#[derive(Debug)]
struct Subscription {
    observer: ObserverId,
    path: String,
    mask: Slice,
    pending: Slice,
}

#[derive(Debug, Default)]
struct Observer {
    queue: Vec<SubscriptionId>,
}

/// Registry of observers and their subscriptions
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    observers: SlotMap<ObserverId, Observer>,
    subscriptions: SlotMap<SubscriptionId, Subscription>,
    by_path: HashMap<String, Vec<SubscriptionId>>,
}

impl SubscriptionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new observer
    pub fn register_observer(&mut self) -> ObserverId {
        self.observers.insert(Observer::default())
    }

    /// Drop an observer together with all of its subscriptions
    pub fn unregister_observer(&mut self, observer: ObserverId) {
        if self.observers.remove(observer).is_none() {
            return;
        }
        let owned: Vec<SubscriptionId> = self
            .subscriptions
            .iter()
            .filter(|(_, s)| s.observer == observer)
            .map(|(id, _)| id)
            .collect();
        for id in owned {
            self.unsubscribe(id);
        }
    }

    /// Watch `mask` slices of `path` on behalf of `observer`
    pub fn subscribe(&mut self, observer: ObserverId, path: &str, mask: Slice) -> SubscriptionId {
        if !self.observers.contains_key(observer) {
            log::warn!("Subscription to '{path}' for an unregistered observer will never fire");
        }
        let id = self.subscriptions.insert(Subscription {
            observer,
            path: path.to_string(),
            mask,
            pending: Slice::empty(),
        });
        self.by_path.entry(path.to_string()).or_default().push(id);
        id
    }

    /// Cancel a subscription, discarding anything pending for it
    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        let Some(subscription) = self.subscriptions.remove(id) else {
            return;
        };
        if let Some(ids) = self.by_path.get_mut(&subscription.path) {
            ids.retain(|other| *other != id);
            if ids.is_empty() {
                self.by_path.remove(&subscription.path);
            }
        }
    }

    /// Mark every subscription on `path` watching any of `changed` as pending
    pub fn notify(&mut self, path: &str, changed: Slice) {
        let Some(ids) = self.by_path.get(path) else {
            return;
        };
        for id in ids {
            if let Some(subscription) = self.subscriptions.get_mut(*id) {
                Self::mark(&mut self.observers, *id, subscription, changed);
            }
        }
    }

    /// Mark every live subscription as pending on all of its slices
    pub fn notify_all(&mut self) {
        for (id, subscription) in &mut self.subscriptions {
            let mask = subscription.mask;
            Self::mark(&mut self.observers, id, subscription, mask);
        }
    }

    /// Take everything pending for `observer`, in the order it became pending
    pub fn drain(&mut self, observer: ObserverId) -> Vec<Notification> {
        let Some(entry) = self.observers.get_mut(observer) else {
            return Vec::new();
        };
        let queue = std::mem::take(&mut entry.queue);

        queue
            .into_iter()
            .filter_map(|id| {
                let subscription = self.subscriptions.get_mut(id)?;
                let changed = std::mem::replace(&mut subscription.pending, Slice::empty());
                (!changed.is_empty()).then(|| Notification {
                    subscription: id,
                    path: subscription.path.clone(),
                    changed,
                })
            })
            .collect()
    }

    /// Whether `observer` has anything waiting
    pub fn has_pending(&self, observer: ObserverId) -> bool {
        self.observers
            .get(observer)
            .is_some_and(|o| o.queue.iter().any(|id| self.subscriptions.contains_key(*id)))
    }

    /// Number of live subscriptions
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    fn mark(
        observers: &mut SlotMap<ObserverId, Observer>,
        id: SubscriptionId,
        subscription: &mut Subscription,
        changed: Slice,
    ) {
        let relevant = subscription.mask & changed;
        if relevant.is_empty() {
            return;
        }
        if subscription.pending.is_empty() {
            if let Some(observer) = observers.get_mut(subscription.observer) {
                observer.queue.push(id);
            }
        }
        subscription.pending |= relevant;
    }
}
