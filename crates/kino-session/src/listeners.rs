//! Observer registries for public session events

use parking_lot::Mutex;
use std::sync::Arc;

/// Listener callback
pub type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Handle returned when registering a listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

/// Ordered list of listeners with idempotent add/remove
pub struct ListenerRegistry<T> {
    next_id: u64,
    listeners: Vec<(ListenerId, Listener<T>)>,
}

impl<T> Default for ListenerRegistry<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            listeners: Vec::new(),
        }
    }
}

impl<T> ListenerRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener; registering the same `Arc` twice returns the original id
    pub fn add(&mut self, listener: Listener<T>) -> ListenerId {
        let ptr = Arc::as_ptr(&listener) as *const ();
        if let Some((id, _)) = self
            .listeners
            .iter()
            .find(|(_, existing)| Arc::as_ptr(existing) as *const () == ptr)
        {
            return *id;
        }

        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, listener));
        id
    }

    /// Remove a listener, returns false if it was not registered
    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    /// Listeners in registration order
    pub fn snapshot(&self) -> Vec<Listener<T>> {
        self.listeners.iter().map(|(_, l)| Arc::clone(l)).collect()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn clear(&mut self) {
        self.listeners.clear();
    }
}

/// Thread-safe registry shared between a controller handle and its session
pub struct SharedRegistry<T> {
    inner: Arc<Mutex<ListenerRegistry<T>>>,
}

impl<T> Clone for SharedRegistry<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for SharedRegistry<T> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ListenerRegistry::new())),
        }
    }
}

impl<T> SharedRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, listener: Listener<T>) -> ListenerId {
        self.inner.lock().add(listener)
    }

    pub fn remove(&self, id: ListenerId) -> bool {
        self.inner.lock().remove(id)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    /// Call every listener; the lock is released first so listeners may re-register
    pub fn notify(&self, event: &T) {
        let listeners = self.inner.lock().snapshot();
        for listener in listeners {
            listener(event);
        }
    }
}

type ReadyCallback = Box<dyn FnOnce() + Send>;

enum ReadyState {
    Pending(Vec<ReadyCallback>),
    Fired,
    Cancelled,
}

/// One-shot gate for the session ready callbacks
#[derive(Clone)]
pub struct ReadyGate {
    inner: Arc<Mutex<ReadyState>>,
}

impl Default for ReadyGate {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ReadyState::Pending(Vec::new()))),
        }
    }
}

impl ReadyGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback. Runs immediately if the gate already opened,
    /// never if it was cancelled.
    pub fn on_ready(&self, callback: impl FnOnce() + Send + 'static) {
        let fired = {
            let mut state = self.inner.lock();
            match &mut *state {
                ReadyState::Pending(callbacks) => {
                    callbacks.push(Box::new(callback));
                    return;
                }
                ReadyState::Fired => true,
                ReadyState::Cancelled => false,
            }
        };
        if fired {
            callback();
        }
    }

    /// Open the gate, returns true only the first time
    pub fn fire(&self) -> bool {
        let callbacks = {
            let mut state = self.inner.lock();
            match std::mem::replace(&mut *state, ReadyState::Fired) {
                ReadyState::Pending(callbacks) => callbacks,
                other => {
                    *state = other;
                    return false;
                }
            }
        };
        for callback in callbacks {
            callback();
        }
        true
    }

    /// Close the gate for good, dropping pending callbacks
    pub fn cancel(&self) {
        let mut state = self.inner.lock();
        if let ReadyState::Pending(_) = &*state {
            *state = ReadyState::Cancelled;
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(&*self.inner.lock(), ReadyState::Pending(_))
    }

    pub fn has_fired(&self) -> bool {
        matches!(&*self.inner.lock(), ReadyState::Fired)
    }
}
