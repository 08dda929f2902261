//! Change listeners.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use storefront_cart_core::Product;

/// Handle returned by [`CartStore::subscribe`](super::CartStore::subscribe).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

type Listener = Arc<dyn Fn(&[Product]) + Send + Sync>;

#[derive(Default)]
pub(crate) struct Subscribers {
    next_id: AtomicU64,
    listeners: RwLock<Vec<(SubscriptionId, Listener)>>,
    /// Revision of the last delivered snapshot; held while listeners run.
    delivered: Mutex<u64>,
}

impl Subscribers {
    pub(crate) fn add(&self, listener: Listener) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));
        id
    }

    pub(crate) fn remove(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Call every listener in subscription order with the snapshot taken at
    /// `revision`, unless a later revision was already delivered.
    ///
    /// The list is copied first so a listener may subscribe or unsubscribe.
    pub(crate) fn notify(&self, revision: u64, cart: &[Product]) {
        let mut delivered = self.delivered.lock().unwrap_or_else(PoisonError::into_inner);
        if revision <= *delivered {
            return;
        }
        *delivered = revision;

        let listeners: Vec<Listener> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            listener(cart);
        }
    }
}
