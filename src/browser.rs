/// Browser bindings: chrome.* extension APIs, localStorage and timers

use crate::debounce::{LocalTask, Scheduler};
use crate::search::{Disposition, SearchTarget};
use crate::storage::{Backend, ExtensionStore, FastCache, StorageAdapter, StorageError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(catch, js_namespace = ["chrome", "storage", "local"], js_name = get)]
    async fn storage_local_get(keys: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "storage", "local"], js_name = set)]
    async fn storage_local_set(items: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "storage", "local"], js_name = remove)]
    async fn storage_local_remove(keys: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "search"], js_name = query)]
    async fn search_query(options: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "tabs"], js_name = query)]
    async fn tabs_query(query: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "tabs"], js_name = sendMessage)]
    async fn tabs_send_message(tab_id: i32, message: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(js_namespace = ["chrome", "runtime", "onMessage"], js_name = addListener)]
    fn add_runtime_message_listener(listener: &Closure<dyn FnMut(JsValue, JsValue, JsValue) -> JsValue>);
}

/// Resolve a dotted path on the global object, e.g. `chrome.storage.local`
fn lookup_global(path: &[&str]) -> Option<JsValue> {
    let mut current: JsValue = js_sys::global().into();
    for segment in path {
        current = js_sys::Reflect::get(&current, &JsValue::from_str(segment)).ok()?;
        if current.is_undefined() || current.is_null() {
            return None;
        }
    }
    Some(current)
}

fn js_error(backend: Backend, operation: &'static str, error: JsValue) -> StorageError {
    StorageError::backend(backend, operation, format!("{:?}", error))
}

fn keys_to_js(keys: &[&str]) -> JsValue {
    keys.iter()
        .map(|key| JsValue::from_str(key))
        .collect::<js_sys::Array>()
        .into()
}

/// `chrome.storage.local` through its promise API
#[derive(Debug, Clone, Copy)]
pub struct ChromeStorageLocal {
    _private: (),
}

impl ChromeStorageLocal {
    /// Only present inside extension pages
    pub fn detect() -> Option<Self> {
        lookup_global(&["chrome", "storage", "local"]).map(|_| ChromeStorageLocal { _private: () })
    }
}

impl ExtensionStore for ChromeStorageLocal {
    async fn get(&self, keys: &[&str]) -> Result<Map<String, Value>, StorageError> {
        let result = storage_local_get(keys_to_js(keys))
            .await
            .map_err(|e| js_error(Backend::Extension, "get", e))?;

        serde_wasm_bindgen::from_value(result)
            .map_err(|e| StorageError::backend(Backend::Extension, "get", e.to_string()))
    }

    async fn set(&self, items: Map<String, Value>) -> Result<(), StorageError> {
        // Plain object, not a JS Map
        let items = items
            .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
            .map_err(|e| StorageError::backend(Backend::Extension, "set", e.to_string()))?;

        storage_local_set(items)
            .await
            .map(|_| ())
            .map_err(|e| js_error(Backend::Extension, "set", e))
    }

    async fn remove(&self, keys: &[&str]) -> Result<(), StorageError> {
        storage_local_remove(keys_to_js(keys))
            .await
            .map(|_| ())
            .map_err(|e| js_error(Backend::Extension, "remove", e))
    }
}

/// `window.localStorage`
pub struct LocalStorageCache {
    storage: web_sys::Storage,
}

impl LocalStorageCache {
    pub fn detect() -> Option<Self> {
        match web_sys::window()?.local_storage() {
            Ok(Some(storage)) => Some(LocalStorageCache { storage }),
            Ok(None) => None,
            Err(e) => {
                log::warn!("localStorage unavailable: {:?}", e);
                None
            }
        }
    }
}

impl FastCache for LocalStorageCache {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.storage
            .get_item(key)
            .map_err(|e| js_error(Backend::FastCache, "getItem", e))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.storage
            .set_item(key, value)
            .map_err(|e| js_error(Backend::FastCache, "setItem", e))
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.storage
            .remove_item(key)
            .map_err(|e| js_error(Backend::FastCache, "removeItem", e))
    }
}

pub type BrowserStorage = StorageAdapter<ChromeStorageLocal, LocalStorageCache>;

/// Adapter over whichever backends this page has
pub fn browser_storage() -> BrowserStorage {
    let primary = ChromeStorageLocal::detect();
    let cache = LocalStorageCache::detect();
    log::debug!(
        "[storage] backends: extension={} cache={}",
        primary.is_some(),
        cache.is_some()
    );
    StorageAdapter::new(primary, cache)
}

/// `setTimeout` timers and `spawn_local`
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserScheduler;

/// Clears its timeout when dropped; owns the JS callback until then
pub struct BrowserTimer {
    id: Option<i32>,
    _callback: Closure<dyn FnMut()>,
}

impl Drop for BrowserTimer {
    fn drop(&mut self) {
        if let (Some(id), Some(window)) = (self.id, web_sys::window()) {
            window.clear_timeout_with_handle(id);
        }
    }
}

impl Scheduler for BrowserScheduler {
    type Handle = BrowserTimer;

    fn schedule(&self, delay: Duration, task: Box<dyn FnOnce()>) -> BrowserTimer {
        let callback: Closure<dyn FnMut()> = Closure::once(move || task());
        let timeout = i32::try_from(delay.as_millis()).unwrap_or(i32::MAX);

        let id = web_sys::window().and_then(|window| {
            window
                .set_timeout_with_callback_and_timeout_and_arguments_0(
                    callback.as_ref().unchecked_ref(),
                    timeout,
                )
                .inspect_err(|e| log::error!("setTimeout failed: {:?}", e))
                .ok()
        });

        BrowserTimer {
            id,
            _callback: callback,
        }
    }

    fn spawn(&self, task: LocalTask) {
        wasm_bindgen_futures::spawn_local(task);
    }
}

#[derive(Serialize)]
struct SearchQueryOptions<'a> {
    text: &'a str,
    disposition: &'static str,
}

/// Execute a resolved search
pub async fn run_search(target: &SearchTarget) -> Result<(), String> {
    match target {
        SearchTarget::BrowserDefault { text, disposition } => {
            if lookup_global(&["chrome", "search", "query"]).is_none() {
                log::warn!("chrome.search unavailable, ignoring search");
                return Ok(());
            }

            let options = serde_wasm_bindgen::to_value(&SearchQueryOptions {
                text,
                disposition: disposition.as_chrome_str(),
            })
            .map_err(|e| format!("Failed to serialize search: {:?}", e))?;

            search_query(options)
                .await
                .map(|_| ())
                .map_err(|e| format!("Search failed: {:?}", e))
        }
        SearchTarget::Url { url, disposition } => navigate(url.as_str(), *disposition),
    }
}

fn navigate(url: &str, disposition: Disposition) -> Result<(), String> {
    let window = web_sys::window().ok_or_else(|| "No window".to_string())?;

    match disposition {
        Disposition::CurrentTab => window
            .location()
            .set_href(url)
            .map_err(|e| format!("Navigation failed: {:?}", e)),
        Disposition::NewTab => window
            .open_with_url_and_target(url, "_blank")
            .map(|_| ())
            .map_err(|e| format!("Failed to open tab: {:?}", e)),
    }
}

/// Messages exchanged between extension pages and the content script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ExtensionMessage {
    Hello,
}

/// Subset of `chrome.tabs.Tab` the popup needs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TabInfo {
    pub id: Option<i32>,
    pub title: Option<String>,
    pub url: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TabQuery {
    active: bool,
    current_window: bool,
}

pub async fn active_tab() -> Result<Option<TabInfo>, String> {
    let query = serde_wasm_bindgen::to_value(&TabQuery {
        active: true,
        current_window: true,
    })
    .map_err(|e| format!("Failed to serialize query: {:?}", e))?;

    let tabs_js = tabs_query(query)
        .await
        .map_err(|e| format!("Failed to get tabs: {:?}", e))?;
    let tabs: Vec<TabInfo> = serde_wasm_bindgen::from_value(tabs_js)
        .map_err(|e| format!("Failed to parse tabs: {:?}", e))?;

    Ok(tabs.into_iter().next())
}

pub async fn send_to_tab(tab_id: i32, message: &ExtensionMessage) -> Result<(), String> {
    let message = serde_wasm_bindgen::to_value(message)
        .map_err(|e| format!("Failed to serialize message: {:?}", e))?;

    tabs_send_message(tab_id, message)
        .await
        .map(|_| ())
        .map_err(|e| format!("Failed to send message: {:?}", e))
}

/// Content-script side: answer `hello` with an alert
pub fn listen_for_messages() {
    if lookup_global(&["chrome", "runtime", "onMessage"]).is_none() {
        log::warn!("chrome.runtime.onMessage unavailable");
        return;
    }

    let listener = Closure::wrap(Box::new(
        |message: JsValue, _sender: JsValue, _send_response: JsValue| -> JsValue {
            match serde_wasm_bindgen::from_value::<ExtensionMessage>(message) {
                Ok(ExtensionMessage::Hello) => {
                    log::info!("Hello from content script!");
                    if let Some(window) = web_sys::window() {
                        if let Err(e) = window.alert_with_message("Hello from the extension!") {
                            log::warn!("alert failed: {:?}", e);
                        }
                    }
                }
                Err(e) => log::debug!("Ignoring message: {}", e),
            }
            JsValue::FALSE
        },
    ) as Box<dyn FnMut(JsValue, JsValue, JsValue) -> JsValue>);

    add_runtime_message_listener(&listener);
    // Lives as long as the page
    listener.forget();
}
