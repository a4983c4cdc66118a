/// In-memory backends, clock and scheduler used by unit tests

use crate::clock::Clock;
use crate::debounce::{LocalTask, Scheduler};
use crate::storage::{Backend, ExtensionStore, FastCache, StorageError};
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use serde_json::{Map, Value};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};
use std::time::Duration;

#[derive(Default)]
struct MemoryStoreState {
    data: Map<String, Value>,
    fail_reads: bool,
    fail_writes: bool,
    writes: Vec<Map<String, Value>>,
}

/// Stand-in for chrome.storage.local; clones share the same data
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Rc<RefCell<MemoryStoreState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: &str, value: Value) {
        self.state.borrow_mut().data.insert(key.to_string(), value);
    }

    pub fn value(&self, key: &str) -> Option<Value> {
        self.state.borrow().data.get(key).cloned()
    }

    /// Every successful `set` call, in order
    pub fn writes(&self) -> Vec<Map<String, Value>> {
        self.state.borrow().writes.clone()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.state.borrow_mut().fail_reads = fail;
    }

    pub fn fail_writes(&self, fail: bool) {
        self.state.borrow_mut().fail_writes = fail;
    }
}

impl ExtensionStore for MemoryStore {
    async fn get(&self, keys: &[&str]) -> Result<Map<String, Value>, StorageError> {
        let state = self.state.borrow();
        if state.fail_reads {
            return Err(StorageError::backend(Backend::Extension, "get", "simulated read failure"));
        }
        Ok(keys
            .iter()
            .filter_map(|key| state.data.get(*key).map(|value| (key.to_string(), value.clone())))
            .collect())
    }

    async fn set(&self, items: Map<String, Value>) -> Result<(), StorageError> {
        let mut state = self.state.borrow_mut();
        if state.fail_writes {
            return Err(StorageError::backend(Backend::Extension, "set", "QUOTA_BYTES quota exceeded"));
        }
        state.writes.push(items.clone());
        state.data.extend(items);
        Ok(())
    }

    async fn remove(&self, keys: &[&str]) -> Result<(), StorageError> {
        let mut state = self.state.borrow_mut();
        if state.fail_writes {
            return Err(StorageError::backend(Backend::Extension, "remove", "simulated failure"));
        }
        for key in keys {
            state.data.remove(*key);
        }
        Ok(())
    }
}

#[derive(Default)]
struct MemoryCacheState {
    data: BTreeMap<String, String>,
    fail: bool,
}

/// Stand-in for localStorage; clones share the same data
#[derive(Clone, Default)]
pub struct MemoryCache {
    state: Rc<RefCell<MemoryCacheState>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_raw(&self, key: &str, raw: &str) {
        self.state
            .borrow_mut()
            .data
            .insert(key.to_string(), raw.to_string());
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.state.borrow().data.get(key).cloned()
    }

    /// Make every operation throw, like a disabled or full localStorage
    pub fn fail(&self, fail: bool) {
        self.state.borrow_mut().fail = fail;
    }

    fn check(&self, operation: &'static str) -> Result<(), StorageError> {
        if self.state.borrow().fail {
            Err(StorageError::backend(Backend::FastCache, operation, "SecurityError"))
        } else {
            Ok(())
        }
    }
}

impl FastCache for MemoryCache {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.check("getItem")?;
        Ok(self.raw(key))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check("setItem")?;
        self.insert_raw(key, value);
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.check("removeItem")?;
        self.state.borrow_mut().data.remove(key);
        Ok(())
    }
}

/// Clock that only moves when told to
#[derive(Clone)]
pub struct ManualClock {
    now: Rc<Cell<DateTime<Utc>>>,
}

impl ManualClock {
    /// Starts at 2023-11-14T22:13:20.000Z
    pub fn new() -> Self {
        Self::starting_at(Utc.timestamp_millis_opt(1_700_000_000_000).unwrap())
    }

    pub fn starting_at(now: DateTime<Utc>) -> Self {
        ManualClock {
            now: Rc::new(Cell::new(now)),
        }
    }

    pub fn advance(&self, by: ChronoDuration) {
        self.now.set(self.now.get() + by);
    }

    pub fn rewind(&self, by: ChronoDuration) {
        self.now.set(self.now.get() - by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }
}

struct Timer {
    id: u64,
    due: Duration,
    task: Box<dyn FnOnce()>,
}

#[derive(Default)]
struct SchedulerState {
    elapsed: Duration,
    next_id: u64,
    timers: Vec<Timer>,
    spawned: Vec<LocalTask>,
}

/// Virtual-time scheduler: timers fire on `advance`, spawned futures are
/// driven to completion right after
#[derive(Clone, Default)]
pub struct ManualScheduler {
    state: Rc<RefCell<SchedulerState>>,
}

/// Cancels its timer when dropped, if it has not fired yet
pub struct ManualTimer {
    id: u64,
    state: Weak<RefCell<SchedulerState>>,
}

impl Drop for ManualTimer {
    fn drop(&mut self) {
        if let Some(state) = self.state.upgrade() {
            state.borrow_mut().timers.retain(|timer| timer.id != self.id);
        }
    }
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending_timers(&self) -> usize {
        self.state.borrow().timers.len()
    }

    pub fn advance(&self, by: Duration) {
        let deadline = self.state.borrow().elapsed + by;

        loop {
            let next = {
                let mut state = self.state.borrow_mut();
                let earliest = state
                    .timers
                    .iter()
                    .enumerate()
                    .filter(|(_, timer)| timer.due <= deadline)
                    .min_by_key(|(_, timer)| timer.due)
                    .map(|(index, _)| index);
                earliest.map(|index| {
                    let timer = state.timers.remove(index);
                    state.elapsed = timer.due;
                    timer
                })
            };

            match next {
                Some(timer) => (timer.task)(),
                None => break,
            }
        }

        self.state.borrow_mut().elapsed = deadline;
        self.run_spawned();
    }

    pub fn run_spawned(&self) {
        loop {
            let tasks = std::mem::take(&mut self.state.borrow_mut().spawned);
            if tasks.is_empty() {
                break;
            }
            for task in tasks {
                futures::executor::block_on(task);
            }
        }
    }
}

impl Scheduler for ManualScheduler {
    type Handle = ManualTimer;

    fn schedule(&self, delay: Duration, task: Box<dyn FnOnce()>) -> ManualTimer {
        let mut state = self.state.borrow_mut();
        let id = state.next_id;
        state.next_id += 1;
        let due = state.elapsed + delay;
        state.timers.push(Timer { id, due, task });

        ManualTimer {
            id,
            state: Rc::downgrade(&self.state),
        }
    }

    fn spawn(&self, task: LocalTask) {
        self.state.borrow_mut().spawned.push(task);
    }
}
