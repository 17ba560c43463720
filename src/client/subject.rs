use std::sync::Arc;

use parking_lot::Mutex;

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Inner<T> {
    value: T,
    next_id: u64,
    listeners: Vec<(u64, Listener<T>)>,
}

/// Replay-latest broadcast: keeps the last published value and hands it to
/// every new subscriber before any later publish.
///
/// Listeners run outside the lock, so a listener may read the subject or
/// publish again without deadlocking.
pub struct Subject<T> {
    inner: Mutex<Inner<T>>,
}

impl<T: Clone> Subject<T> {
    pub fn new(initial: T) -> Self {
        Self {
            inner: Mutex::new(Inner {
                value: initial,
                next_id: 0,
                listeners: Vec::new(),
            }),
        }
    }

    pub fn value(&self) -> T {
        self.inner.lock().value.clone()
    }

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let listener: Listener<T> = Arc::new(listener);
        let (id, current) = {
            let mut inner = self.inner.lock();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.listeners.push((id, listener.clone()));
            (id, inner.value.clone())
        };
        listener(&current);
        SubscriptionId(id)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self.inner.lock();
        let before = inner.listeners.len();
        inner.listeners.retain(|(lid, _)| *lid != id.0);
        inner.listeners.len() != before
    }

    /// Stores `value` and notifies a snapshot of the current listeners.
    pub fn publish(&self, value: T) {
        let (snapshot, listeners) = {
            let mut inner = self.inner.lock();
            inner.value = value;
            let listeners: Vec<Listener<T>> =
                inner.listeners.iter().map(|(_, l)| l.clone()).collect();
            (inner.value.clone(), listeners)
        };
        for listener in listeners {
            listener(&snapshot);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().listeners.len()
    }
}
