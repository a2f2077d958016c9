//! Observable values exposed by the controller to the presentation layer.

use std::fmt;
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::Mutex;

struct ObservableInner<T> {
    value: T,
    subscribers: Vec<Sender<T>>,
}

/// A value with change notification.
///
/// `get()` returns the latest value; every `subscribe()` receiver gets each
/// distinct new value in the order it was set. Setting a value equal to the
/// current one notifies nobody. Dropped receivers are pruned on the next
/// change.
pub struct Observable<T> {
    inner: Arc<Mutex<ObservableInner<T>>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + PartialEq + Send> Observable<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ObservableInner {
                value,
                subscribers: Vec::new(),
            })),
        }
    }

    pub fn get(&self) -> T {
        self.inner.lock().value.clone()
    }

    pub fn subscribe(&self) -> Receiver<T> {
        let (tx, rx) = unbounded::<T>();
        self.inner.lock().subscribers.push(tx);
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().subscribers.len()
    }

    /// Replaces the value and notifies subscribers. Returns true if it changed.
    pub(crate) fn set(&self, value: T) -> bool {
        let mut inner = self.inner.lock();
        if inner.value == value {
            return false;
        }
        inner.value = value;
        let current = inner.value.clone();
        inner
            .subscribers
            .retain(|tx| tx.send(current.clone()).is_ok());
        true
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Observable")
            .field("value", &inner.value)
            .field("subscribers", &inner.subscribers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_returns_latest() {
        let value = Observable::new(0u64);
        assert_eq!(value.get(), 0);
        assert!(value.set(42));
        assert_eq!(value.get(), 42);
    }

    #[test]
    fn test_subscribers_receive_changes_in_order() {
        let value = Observable::new(false);
        let rx = value.subscribe();

        value.set(true);
        value.set(false);

        assert_eq!(rx.try_recv(), Ok(true));
        assert_eq!(rx.try_recv(), Ok(false));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_unchanged_value_is_not_broadcast() {
        let value = Observable::new(7u64);
        let rx = value.subscribe();

        assert!(!value.set(7));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_dropped_subscribers_are_pruned() {
        let value = Observable::new(0u64);
        let kept = value.subscribe();
        let dropped = value.subscribe();
        assert_eq!(value.subscriber_count(), 2);

        drop(dropped);
        value.set(1);

        assert_eq!(value.subscriber_count(), 1);
        assert_eq!(kept.try_recv(), Ok(1));
    }

    #[test]
    fn test_clones_share_state() {
        let value = Observable::new(String::from("a"));
        let view = value.clone();
        value.set("b".to_string());
        assert_eq!(view.get(), "b");
    }
}
