/// Durable storage adapter: chrome.storage.local is authoritative,
/// localStorage is a fast cache for first paint

use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// Which backing store an operation went to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Extension,
    FastCache,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Extension => write!(f, "chrome.storage.local"),
            Backend::FastCache => write!(f, "localStorage"),
        }
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    /// Neither backend exists in this page context
    #[error("no storage backend available")]
    Unavailable,

    #[error("{backend} {operation} failed: {message}")]
    Backend {
        backend: Backend,
        operation: &'static str,
        message: String,
    },

    #[error("failed to encode value for {key}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StorageError {
    pub fn backend(backend: Backend, operation: &'static str, message: impl Into<String>) -> Self {
        StorageError::Backend {
            backend,
            operation,
            message: message.into(),
        }
    }
}

/// Extension-scoped key-value store (async, may report a last-error)
#[allow(async_fn_in_trait)]
pub trait ExtensionStore {
    async fn get(&self, keys: &[&str]) -> Result<Map<String, Value>, StorageError>;
    async fn set(&self, items: Map<String, Value>) -> Result<(), StorageError>;
    async fn remove(&self, keys: &[&str]) -> Result<(), StorageError>;
}

/// Same-origin synchronous string store (may throw when disabled or full)
pub trait FastCache {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

/// Encode a value the way the fast cache stores it (JSON text)
pub fn encode_cached(key: &str, value: &Value) -> Result<String, StorageError> {
    serde_json::to_string(value).map_err(|source| StorageError::Encode {
        key: key.to_string(),
        source,
    })
}

/// Decode a fast-cache entry. Entries are JSON; bare strings written by older
/// builds are taken as string values.
pub fn decode_cached(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Uniform get/set/remove over the two backends.
///
/// The primary (extension) store is preferred whenever it exists. Successful
/// primary reads and writes are mirrored into the cache afterwards, never before.
/// Without a primary the cache acts as the store; with neither, every operation
/// returns [`StorageError::Unavailable`].
pub struct StorageAdapter<P, C> {
    primary: Option<P>,
    cache: Option<C>,
}

impl<P: ExtensionStore, C: FastCache> StorageAdapter<P, C> {
    pub fn new(primary: Option<P>, cache: Option<C>) -> Self {
        StorageAdapter { primary, cache }
    }

    pub fn has_primary(&self) -> bool {
        self.primary.is_some()
    }

    pub fn has_cache(&self) -> bool {
        self.cache.is_some()
    }

    pub async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let mut found = self.get_many(&[key]).await?;
        Ok(found.remove(key))
    }

    pub async fn get_many(&self, keys: &[&str]) -> Result<Map<String, Value>, StorageError> {
        if let Some(primary) = &self.primary {
            let found = primary.get(keys).await?;
            log::debug!(
                "[storage] get {:?} from {} ({} found)",
                keys,
                Backend::Extension,
                found.len()
            );
            self.mirror(&found);
            return Ok(found);
        }

        let cache = self.cache.as_ref().ok_or(StorageError::Unavailable)?;
        let mut found = Map::new();
        for key in keys {
            if let Some(raw) = cache.get_item(key)? {
                found.insert(key.to_string(), decode_cached(&raw));
            }
        }
        log::debug!(
            "[storage] get {:?} from {} ({} found)",
            keys,
            Backend::FastCache,
            found.len()
        );
        Ok(found)
    }

    pub async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let mut items = Map::new();
        items.insert(key.to_string(), value);
        self.set_many(items).await
    }

    /// Write a batch of keys in one backend call
    pub async fn set_many(&self, items: Map<String, Value>) -> Result<(), StorageError> {
        if let Some(primary) = &self.primary {
            primary.set(items.clone()).await?;
            log::debug!("[storage] set {:?} in {}", keys_of(&items), Backend::Extension);
            self.mirror(&items);
            return Ok(());
        }

        let cache = self.cache.as_ref().ok_or(StorageError::Unavailable)?;
        for (key, value) in &items {
            cache.set_item(key, &encode_cached(key, value)?)?;
        }
        log::debug!("[storage] set {:?} in {}", keys_of(&items), Backend::FastCache);
        Ok(())
    }

    pub async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.remove_many(&[key]).await
    }

    pub async fn remove_many(&self, keys: &[&str]) -> Result<(), StorageError> {
        if let Some(primary) = &self.primary {
            primary.remove(keys).await?;
            log::debug!("[storage] remove {:?} from {}", keys, Backend::Extension);
            self.evict(keys);
            return Ok(());
        }

        let cache = self.cache.as_ref().ok_or(StorageError::Unavailable)?;
        for key in keys {
            cache.remove_item(key)?;
        }
        log::debug!("[storage] remove {:?} from {}", keys, Backend::FastCache);
        Ok(())
    }

    /// Synchronous raw cache read, for first paint
    pub fn cached(&self, key: &str) -> Option<String> {
        let cache = self.cache.as_ref()?;
        match cache.get_item(key) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("[storage] {} unreadable for {}: {}", Backend::FastCache, key, e);
                None
            }
        }
    }

    /// Best-effort copy of values into the cache
    pub fn mirror(&self, items: &Map<String, Value>) {
        let Some(cache) = &self.cache else {
            return;
        };

        for (key, value) in items {
            let written = encode_cached(key, value).and_then(|raw| cache.set_item(key, &raw));
            if let Err(e) = written {
                log::warn!("[storage] Failed to mirror {} to {}: {}", key, Backend::FastCache, e);
            }
        }
    }

    /// Best-effort removal of keys from the cache
    pub fn evict(&self, keys: &[&str]) {
        let Some(cache) = &self.cache else {
            return;
        };

        for key in keys {
            if let Err(e) = cache.remove_item(key) {
                log::warn!("[storage] Failed to evict {} from {}: {}", key, Backend::FastCache, e);
            }
        }
    }
}

fn keys_of(items: &Map<String, Value>) -> Vec<&str> {
    items.keys().map(String::as_str).collect()
}
