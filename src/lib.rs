/// Tab Config Sync - Chrome Extension new tab and popup
/// Built with Rust + WASM + Yew

mod browser;
mod clock;
mod config;
mod context;
mod debounce;
mod options;
mod rehydrate;
mod search;
mod storage;
mod store;
mod theme;
pub mod ui;

#[cfg(test)]
mod testing;

pub use browser::{BrowserScheduler, ChromeStorageLocal, LocalStorageCache};
pub use clock::{Clock, SystemClock};
pub use config::{ConfigPatch, ConfigState, Transition};
pub use context::{PageContext, PageKind};
pub use debounce::{Scheduler, WriteBackDebouncer};
pub use options::SyncOptions;
pub use rehydrate::{RehydrateReport, rehydrate};
pub use search::SearchEngineId;
pub use storage::{ExtensionStore, FastCache, StorageAdapter, StorageError};
pub use store::{ConfigStore, Middleware, Subscription};

use wasm_bindgen::prelude::*;

// Set up panic hook and logging before anything else runs
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::new(SyncOptions::default().log_level));
}

// Start the Yew app for the popup
#[wasm_bindgen]
pub fn start_popup() {
    let context = PageContext::init(PageKind::Popup, &SyncOptions::default());
    yew::Renderer::<ui::popup::App>::with_props(ui::PageProps { context }).render();
}

// Start the Yew app for the new tab page
#[wasm_bindgen]
pub fn start_newtab() {
    let context = PageContext::init(PageKind::NewTab, &SyncOptions::default());
    yew::Renderer::<ui::newtab::NewTab>::with_props(ui::PageProps { context }).render();
}

#[wasm_bindgen]
pub fn start_content_script() {
    log::info!("Content script loaded");
    browser::listen_for_messages();
}
