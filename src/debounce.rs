/// Debounced write-back of user config changes to durable storage

use crate::config::Transition;
use crate::storage::{ExtensionStore, FastCache, StorageAdapter};
use crate::store::{ConfigStore, Middleware};
use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::time::Duration;

pub type LocalTask = Pin<Box<dyn Future<Output = ()>>>;

/// Delayed tasks and fire-and-forget futures on the page's event loop
pub trait Scheduler {
    /// Dropping the handle cancels the timer if it has not fired yet
    type Handle;

    fn schedule(&self, delay: Duration, task: Box<dyn FnOnce()>) -> Self::Handle;
    fn spawn(&self, task: LocalTask);
}

struct DebouncerInner<P, C, S: Scheduler> {
    adapter: Rc<StorageAdapter<P, C>>,
    scheduler: S,
    delay: Duration,
    // Handle of the most recent timer. It is only replaced, never dropped from
    // inside its own callback.
    pending: RefCell<Option<S::Handle>>,
    armed: Cell<bool>,
}

/// Store middleware that coalesces qualifying transitions into one storage
/// write after `delay` of quiet. Rehydration loads never schedule a write.
pub struct WriteBackDebouncer<P, C, S: Scheduler> {
    inner: Rc<DebouncerInner<P, C, S>>,
}

impl<P, C, S: Scheduler> Clone for WriteBackDebouncer<P, C, S> {
    fn clone(&self) -> Self {
        WriteBackDebouncer {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<P, C, S> WriteBackDebouncer<P, C, S>
where
    P: ExtensionStore + 'static,
    C: FastCache + 'static,
    S: Scheduler + 'static,
{
    pub fn new(adapter: Rc<StorageAdapter<P, C>>, scheduler: S, delay: Duration) -> Self {
        WriteBackDebouncer {
            inner: Rc::new(DebouncerInner {
                adapter,
                scheduler,
                delay,
                pending: RefCell::new(None),
                armed: Cell::new(false),
            }),
        }
    }

    /// Whether a write is waiting for its quiet window to elapse
    pub fn is_pending(&self) -> bool {
        self.inner.armed.get()
    }

    fn schedule(&self, store: &ConfigStore) {
        let inner = Rc::downgrade(&self.inner);
        let store = store.downgrade();

        let handle = self.inner.scheduler.schedule(
            self.inner.delay,
            Box::new(move || {
                let (Some(inner), Some(store)) = (inner.upgrade(), store.upgrade()) else {
                    return;
                };
                inner.armed.set(false);
                inner.write_back(&store);
            }),
        );

        // Replacing the handle cancels the previous timer
        let previous = self.inner.pending.replace(Some(handle));
        drop(previous);
        self.inner.armed.set(true);
    }

    /// Write a pending change now instead of waiting for the timer
    pub fn flush(&self, store: &ConfigStore) {
        if !self.inner.armed.replace(false) {
            return;
        }
        let cancelled = self.inner.pending.borrow_mut().take();
        drop(cancelled);
        self.inner.write_back(store);
    }
}

impl<P, C, S> DebouncerInner<P, C, S>
where
    P: ExtensionStore + 'static,
    C: FastCache + 'static,
    S: Scheduler + 'static,
{
    fn write_back(&self, store: &ConfigStore) {
        let mut snapshot = store.state();
        snapshot.updated_at = store.now().max(snapshot.updated_at);
        let record = snapshot.to_record();
        let adapter = Rc::clone(&self.adapter);

        log::debug!("[sync] Writing config stamped {}", snapshot.updated_at);
        self.scheduler.spawn(Box::pin(async move {
            match adapter.set_many(record).await {
                Ok(()) => log::info!("Config synced to storage"),
                Err(e) => log::error!("Failed to sync config to storage: {}", e),
            }
        }));
    }
}

impl<P, C, S> Middleware for WriteBackDebouncer<P, C, S>
where
    P: ExtensionStore + 'static,
    C: FastCache + 'static,
    S: Scheduler + 'static,
{
    fn after_dispatch(&self, store: &ConfigStore, transition: &Transition) {
        if transition.is_qualifying() {
            self.schedule(store);
        }
    }
}
