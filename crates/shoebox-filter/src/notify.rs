//! Listener registry for change notifications.
//!
//! Dispatch iterates over a snapshot of the registered listeners, so a
//! listener may subscribe or unsubscribe (itself included) while an event
//! is being delivered. Everything here is single-threaded.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Handle identifying one registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

type Callback<E> = Rc<dyn Fn(&E)>;

struct Registry<E> {
    next_id: Cell<u64>,
    entries: RefCell<Vec<(ListenerId, Callback<E>)>>,
}

/// A cloneable registry of event listeners.
///
/// Clones share the same registry, which lets a listener hold a handle to
/// remove itself.
pub struct Listeners<E> {
    inner: Rc<Registry<E>>,
}

impl<E> Listeners<E> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(Registry {
                next_id: Cell::new(0),
                entries: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Register a listener; returns the id needed to remove it.
    pub fn subscribe(&self, listener: impl Fn(&E) + 'static) -> ListenerId {
        let id = ListenerId(self.inner.next_id.get());
        self.inner.next_id.set(id.0 + 1);
        self.inner
            .entries
            .borrow_mut()
            .push((id, Rc::new(listener)));
        id
    }

    /// Remove a listener. Returns whether it was registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut entries = self.inner.entries.borrow_mut();
        let before = entries.len();
        entries.retain(|(existing, _)| *existing != id);
        entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.inner.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver an event to every listener registered when dispatch starts.
    pub fn emit(&self, event: &E) {
        let snapshot: Vec<Callback<E>> = self
            .inner
            .entries
            .borrow()
            .iter()
            .map(|(_, callback)| callback.clone())
            .collect();
        for callback in snapshot {
            callback(event);
        }
    }
}

impl<E> Default for Listeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for Listeners<E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<E> fmt::Debug for Listeners<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners").field("len", &self.len()).finish()
    }
}
