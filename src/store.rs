/// Per-page config state container
///
/// Each extension page (popup, new tab) builds its own `ConfigStore` at startup;
/// the handle is cloned into whatever needs it. State only changes through
/// [`ConfigStore::dispatch`].

use crate::clock::Clock;
use crate::config::{ConfigState, Transition};
use chrono::{DateTime, Utc};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

/// Hook run after every dispatched transition, once listeners have been notified
pub trait Middleware {
    fn after_dispatch(&self, store: &ConfigStore, transition: &Transition);
}

type Listener = Rc<dyn Fn(&ConfigState)>;

struct Shared {
    state: RefCell<ConfigState>,
    // Bumped by every dispatch
    generation: Cell<u64>,
    clock: Rc<dyn Clock>,
    listeners: RefCell<Vec<(u64, Listener)>>,
    next_listener_id: Cell<u64>,
    middleware: RefCell<Vec<Rc<dyn Middleware>>>,
}

#[derive(Clone)]
pub struct ConfigStore {
    shared: Rc<Shared>,
}

impl ConfigStore {
    /// A store holding the default config, stamped with the clock's current time
    pub fn new(clock: Rc<dyn Clock>) -> ConfigStore {
        let state = ConfigState::new(clock.now());
        ConfigStore::with_state(state, clock)
    }

    pub fn with_state(state: ConfigState, clock: Rc<dyn Clock>) -> ConfigStore {
        ConfigStore {
            shared: Rc::new(Shared {
                state: RefCell::new(state),
                generation: Cell::new(0),
                clock,
                listeners: RefCell::new(Vec::new()),
                next_listener_id: Cell::new(0),
                middleware: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn state(&self) -> ConfigState {
        self.shared.state.borrow().clone()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.shared.clock.now()
    }

    /// Apply a transition, then notify listeners in subscription order, then
    /// run middleware. Safe to call from inside a listener: the nested
    /// dispatch notifies every listener with the newer state, and the outer
    /// notification stops there so nobody is left holding the older one.
    pub fn dispatch(&self, transition: Transition) {
        let now = self.shared.clock.now();
        log::debug!("[store] {}", transition.name());

        let snapshot = {
            let mut state = self.shared.state.borrow_mut();
            state.apply(transition.clone(), now);
            state.clone()
        };
        let generation = self.shared.generation.get() + 1;
        self.shared.generation.set(generation);

        let listeners: Vec<Listener> = self
            .shared
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in listeners {
            if self.shared.generation.get() != generation {
                break;
            }
            listener(&snapshot);
        }

        let middleware = self.shared.middleware.borrow().clone();
        for hook in middleware {
            hook.after_dispatch(self, &transition);
        }
    }

    /// Register a listener; it stays registered until the returned
    /// [`Subscription`] is dropped.
    pub fn subscribe(&self, listener: impl Fn(&ConfigState) + 'static) -> Subscription {
        let id = self.shared.next_listener_id.get();
        self.shared.next_listener_id.set(id + 1);
        self.shared
            .listeners
            .borrow_mut()
            .push((id, Rc::new(listener)));

        Subscription {
            shared: Rc::downgrade(&self.shared),
            id,
        }
    }

    pub fn add_middleware(&self, middleware: Rc<dyn Middleware>) {
        self.shared.middleware.borrow_mut().push(middleware);
    }

    pub fn listener_count(&self) -> usize {
        self.shared.listeners.borrow().len()
    }

    pub fn downgrade(&self) -> WeakConfigStore {
        WeakConfigStore(Rc::downgrade(&self.shared))
    }
}

// Identity, not value equality: two handles are equal when they share a store.
impl PartialEq for ConfigStore {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.shared, &other.shared)
    }
}

impl fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigStore")
            .field("state", &*self.shared.state.borrow())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Non-owning store handle for timers and callbacks that may outlive the page
#[derive(Clone)]
pub struct WeakConfigStore(Weak<Shared>);

impl WeakConfigStore {
    pub fn upgrade(&self) -> Option<ConfigStore> {
        self.0.upgrade().map(|shared| ConfigStore { shared })
    }
}

/// Listener registration; dropping it unsubscribes
#[must_use = "dropping a Subscription unsubscribes the listener"]
pub struct Subscription {
    shared: Weak<Shared>,
    id: u64,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.upgrade() {
            shared
                .listeners
                .borrow_mut()
                .retain(|(id, _)| *id != self.id);
        }
    }
}
