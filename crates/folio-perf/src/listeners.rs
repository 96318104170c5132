//! Subscriber lists for monitor notifications.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Handle returned by a subscription, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubscriptionId(u64);

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

// Ids are unique across every list so one id can be handed to any unsubscribe.
static NEXT_SUBSCRIPTION_ID: AtomicU64 = AtomicU64::new(1);

/// Registered callbacks for one kind of notification.
///
/// `emit` copies the callback list and calls each entry with no lock held,
/// so a callback may subscribe, unsubscribe or call back into its owner.
pub(crate) struct Listeners<T> {
    callbacks: Mutex<Vec<(SubscriptionId, Callback<T>)>>,
}

impl<T> Listeners<T> {
    pub(crate) fn new() -> Self {
        Self {
            callbacks: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = SubscriptionId(NEXT_SUBSCRIPTION_ID.fetch_add(1, Ordering::Relaxed));
        self.callbacks.lock().push((id, Arc::new(callback)));
        id
    }

    pub(crate) fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut callbacks = self.callbacks.lock();
        let before = callbacks.len();
        callbacks.retain(|(existing, _)| *existing != id);
        callbacks.len() != before
    }

    pub(crate) fn emit(&self, value: &T) {
        let callbacks: Vec<Callback<T>> = self
            .callbacks
            .lock()
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();
        for callback in callbacks {
            callback(value);
        }
    }

    pub(crate) fn clear(&self) {
        self.callbacks.lock().clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.callbacks.lock().len()
    }
}

impl<T> fmt::Debug for Listeners<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_emit_and_unsubscribe() {
        let listeners = Listeners::<u32>::new();
        let total = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&total);
        let id = listeners.subscribe(move |value| {
            counter.fetch_add(*value as usize, Ordering::SeqCst);
        });

        listeners.emit(&3);
        assert!(listeners.unsubscribe(id));
        assert!(!listeners.unsubscribe(id));
        listeners.emit(&5);

        assert_eq!(total.load(Ordering::SeqCst), 3);
        assert_eq!(listeners.len(), 0);
    }

    #[test]
    fn test_ids_unique_across_lists() {
        let first = Listeners::<u32>::new();
        let second = Listeners::<String>::new();
        let a = first.subscribe(|_| {});
        let b = second.subscribe(|_| {});
        assert_ne!(a, b);
        assert!(!second.unsubscribe(a));
        assert_eq!(second.len(), 1);
        assert!(first.unsubscribe(a));
    }

    #[test]
    fn test_callback_may_reenter() {
        let listeners = Arc::new(Listeners::<u32>::new());
        let inner = Arc::clone(&listeners);
        listeners.subscribe(move |_| {
            inner.subscribe(|_| {});
        });

        listeners.emit(&1);
        assert_eq!(listeners.len(), 2);
    }
}
