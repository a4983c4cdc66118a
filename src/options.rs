/// Tunables for a page context
use std::time::Duration;

/// Quiet period before a config change is written back
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncOptions {
    pub debounce: Duration,
    pub log_level: log::Level,
}

impl SyncOptions {
    pub fn new() -> Self {
        SyncOptions {
            debounce: DEFAULT_DEBOUNCE,
            log_level: if cfg!(debug_assertions) {
                log::Level::Debug
            } else {
                log::Level::Info
            },
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_log_level(mut self, log_level: log::Level) -> Self {
        self.log_level = log_level;
        self
    }
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self::new()
    }
}
