//! Observable state container for the map UI.
//!
//! A [`Store`] owns one piece of state (current indicator, year, ...) and
//! notifies listeners when it changes. There is no listener cap.

use std::fmt;

/// Handle returned by [`Store::add_change_listener`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

type Listener<S> = Box<dyn FnMut(&S)>;

pub struct Store<S> {
    state: S,
    listeners: Vec<(ListenerId, Listener<S>)>,
    next_id: u64,
}

impl<S> Store<S> {
    pub fn new(state: S) -> Self {
        Self {
            state,
            listeners: Vec::new(),
            next_id: 1,
        }
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    /// Mutate the state and notify listeners.
    pub fn update(&mut self, f: impl FnOnce(&mut S)) {
        f(&mut self.state);
        self.emit_change();
    }

    /// Call every listener with the current state, in registration order.
    pub fn emit_change(&mut self) {
        log::trace!("store change, {} listener(s)", self.listeners.len());
        for (_, listener) in self.listeners.iter_mut() {
            listener(&self.state);
        }
    }

    pub fn add_change_listener(&mut self, listener: impl FnMut(&S) + 'static) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns `false` if `id` was not registered (or already removed).
    pub fn remove_change_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl<S: Default> Default for Store<S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}

impl<S: fmt::Debug> fmt::Debug for Store<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("state", &self.state)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn removed_listener_is_not_called() {
        let hits = Rc::new(RefCell::new(Vec::new()));
        let mut store = Store::new(0u32);
        let a = {
            let hits = hits.clone();
            store.add_change_listener(move |s| hits.borrow_mut().push(("a", *s)))
        };
        {
            let hits = hits.clone();
            store.add_change_listener(move |s| hits.borrow_mut().push(("b", *s)));
        }
        store.update(|s| *s = 1);
        assert!(store.remove_change_listener(a));
        assert!(!store.remove_change_listener(a));
        store.update(|s| *s = 2);
        assert_eq!(*hits.borrow(), vec![("a", 1), ("b", 1), ("b", 2)]);
    }
}
