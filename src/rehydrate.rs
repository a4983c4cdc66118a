/// Startup rehydration: fast cache first, then the authoritative store
///
/// Phase one reads localStorage synchronously so the first paint shows the
/// last known config. Phase two reads chrome.storage.local, applies what it
/// finds and repairs the cache so the next page load starts from the
/// authoritative values. Both phases only ever dispatch `LoadConfig`, so
/// nothing here schedules a write-back.

use crate::config::{self, PERSISTED_KEYS, Transition};
use crate::storage::{self, ExtensionStore, FastCache, StorageAdapter, StorageError};
use crate::store::ConfigStore;
use serde_json::{Map, Value};

/// What one phase did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhaseOutcome {
    /// Number of fields merged into the store
    pub applied: usize,
    /// Keys whose stored value was rewritten (corrupt or non-canonical timestamps)
    pub repaired: Vec<String>,
    /// Keys whose stored value was dropped as malformed
    pub discarded: Vec<&'static str>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RehydrateReport {
    pub cached: PhaseOutcome,
    /// `None` when there is no extension store or reading it failed
    pub authoritative: Option<PhaseOutcome>,
}

/// Phase one: synchronous fast-cache read
pub fn load_cached<P: ExtensionStore, C: FastCache>(
    adapter: &StorageAdapter<P, C>,
    store: &ConfigStore,
) -> PhaseOutcome {
    let record: Map<String, Value> = PERSISTED_KEYS
        .into_iter()
        .filter_map(|key| {
            adapter
                .cached(key)
                .map(|raw| (key.to_string(), storage::decode_cached(&raw)))
        })
        .collect();

    if record.is_empty() {
        return PhaseOutcome::default();
    }

    let outcome = apply_record(adapter, store, &record);
    log::debug!("[rehydrate] {} field(s) from fast cache", outcome.applied);
    outcome
}

/// Phase two: read the extension store and reconcile. Returns `Ok(None)` when
/// this page has no extension store, leaving the cached values in place.
pub async fn load_authoritative<P: ExtensionStore, C: FastCache>(
    adapter: &StorageAdapter<P, C>,
    store: &ConfigStore,
) -> Result<Option<PhaseOutcome>, StorageError> {
    if !adapter.has_primary() {
        log::info!("Extension storage unavailable, keeping cached config");
        return Ok(None);
    }

    // get_many mirrors what it read into the cache
    let record = adapter.get_many(&PERSISTED_KEYS).await?;
    let outcome = apply_record(adapter, store, &record);
    log::info!(
        "Loaded config from storage ({} field(s), {} repaired, {} discarded)",
        outcome.applied,
        outcome.repaired.len(),
        outcome.discarded.len()
    );
    Ok(Some(outcome))
}

/// Run both phases. Storage faults are logged and never surface to the caller.
pub async fn rehydrate<P: ExtensionStore, C: FastCache>(
    adapter: &StorageAdapter<P, C>,
    store: &ConfigStore,
) -> RehydrateReport {
    let cached = load_cached(adapter, store);

    let authoritative = match load_authoritative(adapter, store).await {
        Ok(outcome) => outcome,
        Err(e) => {
            log::warn!("Failed to load config from storage: {}", e);
            None
        }
    };

    RehydrateReport {
        cached,
        authoritative,
    }
}

fn apply_record<P: ExtensionStore, C: FastCache>(
    adapter: &StorageAdapter<P, C>,
    store: &ConfigStore,
    record: &Map<String, Value>,
) -> PhaseOutcome {
    let validated = config::validate_record(record, store.now());

    adapter.mirror(&validated.repaired);
    adapter.evict(&validated.discarded);

    let applied = validated.patch.field_count();
    if applied > 0 {
        store.dispatch(Transition::LoadConfig(validated.patch));
    }

    PhaseOutcome {
        applied,
        repaired: validated.repaired.keys().cloned().collect(),
        discarded: validated.discarded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{self, Clock};
    use crate::config::{ConfigState, DEFAULT_THEME_COLOR};
    use crate::debounce::WriteBackDebouncer;
    use crate::search::SearchEngineId;
    use crate::testing::{ManualClock, ManualScheduler, MemoryCache, MemoryStore};
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};
    use futures::executor::block_on;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    struct Page {
        store: ConfigStore,
        clock: ManualClock,
        adapter: StorageAdapter<MemoryStore, MemoryCache>,
    }

    fn page(primary: Option<&MemoryStore>, cache: Option<&MemoryCache>) -> Page {
        let clock = ManualClock::new();
        Page {
            store: ConfigStore::new(Rc::new(clock.clone())),
            clock,
            adapter: StorageAdapter::new(primary.cloned(), cache.cloned()),
        }
    }

    fn stored_state() -> ConfigState {
        let mut state = ConfigState::new(Utc.timestamp_millis_opt(1_690_000_000_250).unwrap());
        state.theme = true;
        state.theme_color = "#ff0000".to_string();
        state.choose_engine = SearchEngineId::Bing;
        state.is_direct_link = true;
        state
    }

    fn fill_primary(primary: &MemoryStore, state: &ConfigState) {
        for (key, value) in state.to_record() {
            primary.insert(&key, value);
        }
    }

    #[test]
    fn test_cached_values_apply_synchronously() {
        let cache = MemoryCache::new();
        cache.insert_raw("theme", "true");
        cache.insert_raw("themeColor", "\"#00ff00\"");
        let p = page(None, Some(&cache));

        let outcome = load_cached(&p.adapter, &p.store);

        assert_eq!(outcome.applied, 2);
        let state = p.store.state();
        assert!(state.theme);
        assert_eq!(state.theme_color, "#00ff00");
        assert_eq!(state.updated_at, p.clock.now());
    }

    #[test]
    fn test_empty_cache_dispatches_nothing() {
        let cache = MemoryCache::new();
        let p = page(None, Some(&cache));
        let calls = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&calls);
        let _subscription = p.store.subscribe(move |_| *counter.borrow_mut() += 1);

        let outcome = load_cached(&p.adapter, &p.store);

        assert_eq!(outcome, PhaseOutcome::default());
        assert_eq!(*calls.borrow(), 0);
    }

    #[test]
    fn test_authoritative_overrides_stale_cache() {
        let primary = MemoryStore::new();
        let cache = MemoryCache::new();
        let stored = stored_state();
        fill_primary(&primary, &stored);
        cache.insert_raw("theme", "false");
        cache.insert_raw("chooseEngine", "\"google\"");
        let p = page(Some(&primary), Some(&cache));

        let report = block_on(rehydrate(&p.adapter, &p.store));

        assert_eq!(report.cached.applied, 2);
        assert_eq!(report.authoritative.map(|o| o.applied), Some(5));
        assert_eq!(p.store.state(), stored);
        assert_eq!(cache.raw("theme"), Some("true".to_string()));
        assert_eq!(cache.raw("chooseEngine"), Some("\"bing\"".to_string()));
        assert_eq!(
            cache.raw("updatedAt"),
            Some(format!("\"{}\"", clock::to_iso_string(&stored.updated_at)))
        );
    }

    #[test]
    fn test_rehydration_is_idempotent() {
        let primary = MemoryStore::new();
        let cache = MemoryCache::new();
        fill_primary(&primary, &stored_state());
        let p = page(Some(&primary), Some(&cache));

        block_on(rehydrate(&p.adapter, &p.store));
        let first = p.store.state();
        p.clock.advance(ChronoDuration::minutes(5));
        block_on(rehydrate(&p.adapter, &p.store));

        assert_eq!(p.store.state(), first);
    }

    #[test]
    fn test_corrupt_timestamp_is_replaced_with_now() {
        let primary = MemoryStore::new();
        let cache = MemoryCache::new();
        primary.insert("theme", json!(true));
        primary.insert("updatedAt", json!("2024-02-30T25:61:00Z"));
        let p = page(Some(&primary), Some(&cache));
        p.clock.advance(ChronoDuration::seconds(42));

        let outcome = block_on(load_authoritative(&p.adapter, &p.store))
            .unwrap()
            .unwrap();

        let now = p.clock.now();
        assert_eq!(outcome.repaired, vec!["updatedAt".to_string()]);
        assert_eq!(p.store.state().updated_at, now);
        assert_eq!(
            cache.raw("updatedAt"),
            Some(format!("\"{}\"", clock::to_iso_string(&now)))
        );
    }

    #[test]
    fn test_epoch_millis_timestamp_is_kept_and_cached_canonically() {
        let primary = MemoryStore::new();
        let cache = MemoryCache::new();
        primary.insert("updatedAt", json!(1_690_000_000_250_i64));
        let p = page(Some(&primary), Some(&cache));

        let outcome = block_on(load_authoritative(&p.adapter, &p.store))
            .unwrap()
            .unwrap();

        assert_eq!(outcome.repaired, vec!["updatedAt".to_string()]);
        assert_eq!(
            p.store.state().updated_at,
            Utc.timestamp_millis_opt(1_690_000_000_250).unwrap()
        );
        assert_eq!(
            cache.raw("updatedAt"),
            Some("\"2023-07-22T04:26:40.250Z\"".to_string())
        );
    }

    #[test]
    fn test_malformed_fields_fall_back_to_defaults_and_leave_cache() {
        let primary = MemoryStore::new();
        let cache = MemoryCache::new();
        primary.insert("themeColor", json!(42));
        primary.insert("chooseEngine", json!("lycos"));
        primary.insert("isDirectLink", json!(true));
        let p = page(Some(&primary), Some(&cache));

        let outcome = block_on(load_authoritative(&p.adapter, &p.store))
            .unwrap()
            .unwrap();

        assert_eq!(outcome.applied, 1);
        assert_eq!(outcome.discarded, vec!["themeColor", "chooseEngine"]);
        let state = p.store.state();
        assert_eq!(state.theme_color, DEFAULT_THEME_COLOR);
        assert_eq!(state.choose_engine, SearchEngineId::Default);
        assert!(state.is_direct_link);
        assert_eq!(cache.raw("themeColor"), None);
        assert_eq!(cache.raw("chooseEngine"), None);
        assert_eq!(cache.raw("isDirectLink"), Some("true".to_string()));
    }

    #[test]
    fn test_without_primary_cache_value_stands() {
        let cache = MemoryCache::new();
        cache.insert_raw("themeColor", "#abcdef");
        let p = page(None, Some(&cache));

        let report = block_on(rehydrate(&p.adapter, &p.store));

        assert_eq!(report.cached.applied, 1);
        assert_eq!(report.authoritative, None);
        assert_eq!(p.store.state().theme_color, "#abcdef");
    }

    #[test]
    fn test_primary_read_failure_keeps_cached_state() {
        let primary = MemoryStore::new();
        let cache = MemoryCache::new();
        primary.fail_reads(true);
        cache.insert_raw("theme", "true");
        let p = page(Some(&primary), Some(&cache));

        let report = block_on(rehydrate(&p.adapter, &p.store));

        assert_eq!(report.authoritative, None);
        assert!(p.store.state().theme);
    }

    #[test]
    fn test_no_backends_keeps_defaults() {
        let p = page(None, None);
        let report = block_on(rehydrate(&p.adapter, &p.store));

        assert_eq!(report, RehydrateReport::default());
        assert_eq!(p.store.state(), ConfigState::new(p.clock.now()));
    }

    #[test]
    fn test_rehydration_never_writes_back() {
        let primary = MemoryStore::new();
        let cache = MemoryCache::new();
        fill_primary(&primary, &stored_state());
        cache.insert_raw("theme", "false");
        let scheduler = ManualScheduler::new();
        let clock = ManualClock::new();
        let store = ConfigStore::new(Rc::new(clock));
        let adapter = Rc::new(StorageAdapter::new(Some(primary.clone()), Some(cache.clone())));
        let debouncer = WriteBackDebouncer::new(Rc::clone(&adapter), scheduler.clone(), Duration::from_millis(300));
        store.add_middleware(Rc::new(debouncer.clone()));

        block_on(rehydrate(&adapter, &store));
        scheduler.advance(Duration::from_secs(5));

        assert!(!debouncer.is_pending());
        assert!(primary.writes().is_empty());
    }
}
