/// Composition root for one extension page
///
/// Every page (popup, new tab) owns an independent store. `PageContext::init`
/// wires it to the browser backends, rehydrates it and keeps the document
/// theme in sync with it.

use crate::browser::{self, BrowserScheduler, BrowserStorage, ChromeStorageLocal, LocalStorageCache};
use crate::clock::{Clock, SystemClock};
use crate::debounce::WriteBackDebouncer;
use crate::options::SyncOptions;
use crate::rehydrate;
use crate::store::{ConfigStore, Subscription};
use crate::theme;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Popup,
    NewTab,
}

pub type BrowserDebouncer = WriteBackDebouncer<ChromeStorageLocal, LocalStorageCache, BrowserScheduler>;

pub struct PageContext {
    pub kind: PageKind,
    pub store: ConfigStore,
    debouncer: BrowserDebouncer,
    _theme: Subscription,
}

impl PageContext {
    pub fn init(kind: PageKind, options: &SyncOptions) -> Rc<PageContext> {
        // System preference until a stored or chosen theme arrives
        theme::apply_theme(theme::system_prefers_dark());

        let adapter: Rc<BrowserStorage> = Rc::new(browser::browser_storage());
        let clock: Rc<dyn Clock> = Rc::new(SystemClock);
        let store = ConfigStore::new(clock);

        let debouncer = WriteBackDebouncer::new(Rc::clone(&adapter), BrowserScheduler, options.debounce);
        store.add_middleware(Rc::new(debouncer.clone()));
        let theme_subscription = store.subscribe(theme::apply_config);

        let cached = rehydrate::load_cached(&adapter, &store);
        log::info!("{:?} page: {} cached field(s) applied", kind, cached.applied);

        {
            let adapter = Rc::clone(&adapter);
            let store = store.clone();
            spawn_local(async move {
                if let Err(e) = rehydrate::load_authoritative(&adapter, &store).await {
                    log::warn!("Failed to load config from storage: {}", e);
                }
            });
        }

        let context = Rc::new(PageContext {
            kind,
            store,
            debouncer,
            _theme: theme_subscription,
        });
        context.flush_on_pagehide();
        context
    }

    // A popup can close inside the debounce window; write before it goes.
    fn flush_on_pagehide(self: &Rc<Self>) {
        let Some(window) = web_sys::window() else {
            return;
        };

        let context = Rc::downgrade(self);
        let listener = Closure::<dyn FnMut()>::new(move || {
            if let Some(context) = context.upgrade() {
                context.debouncer.flush(&context.store);
            }
        });

        if let Err(e) = window.add_event_listener_with_callback("pagehide", listener.as_ref().unchecked_ref()) {
            log::warn!("Failed to watch pagehide: {:?}", e);
        }
        listener.forget();
    }
}
