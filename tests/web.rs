//! Browser smoke tests; run with `wasm-pack test --headless --firefox`

#![cfg(target_arch = "wasm32")]

use serde_json::json;
use std::rc::Rc;
use tab_config_sync::ui::search::press_is_outside;
use tab_config_sync::{
    ChromeStorageLocal, ConfigStore, FastCache, LocalStorageCache, StorageAdapter, SystemClock,
    rehydrate,
};
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

const KEYS: [&str; 5] = ["theme", "themeColor", "chooseEngine", "isDirectLink", "updatedAt"];

fn local_storage() -> LocalStorageCache {
    let cache = LocalStorageCache::detect().expect("localStorage in test page");
    for key in KEYS {
        cache.remove_item(key).unwrap();
    }
    cache
}

#[wasm_bindgen_test]
fn local_storage_round_trip() {
    let cache = local_storage();

    cache.set_item("themeColor", "\"#ff0000\"").unwrap();

    assert_eq!(cache.get_item("themeColor").unwrap(), Some("\"#ff0000\"".to_string()));
    cache.remove_item("themeColor").unwrap();
    assert_eq!(cache.get_item("themeColor").unwrap(), None);
}

#[wasm_bindgen_test]
fn no_extension_store_outside_extension_pages() {
    assert!(ChromeStorageLocal::detect().is_none());
}

#[wasm_bindgen_test]
async fn adapter_falls_back_to_local_storage() {
    let adapter: StorageAdapter<ChromeStorageLocal, LocalStorageCache> =
        StorageAdapter::new(None, Some(local_storage()));

    adapter.set("theme", json!(true)).await.unwrap();

    assert_eq!(adapter.cached("theme"), Some("true".to_string()));
    assert_eq!(adapter.get("theme").await.unwrap(), Some(json!(true)));
}

#[wasm_bindgen_test]
async fn rehydrates_from_local_storage() {
    let cache = local_storage();
    cache.set_item("isDirectLink", "true").unwrap();
    cache.set_item("chooseEngine", "\"bing\"").unwrap();
    let adapter = StorageAdapter::<ChromeStorageLocal, _>::new(None, Some(cache));
    let store = ConfigStore::new(Rc::new(SystemClock));

    let report = rehydrate(&adapter, &store).await;

    assert_eq!(report.cached.applied, 2);
    assert_eq!(report.authoritative, None);
    assert!(store.state().is_direct_link);
    assert_eq!(store.state().choose_engine.key(), "bing");
}

#[wasm_bindgen_test]
fn engine_menu_press_outside_detection() {
    let document = web_sys::window().unwrap().document().unwrap();
    let body = document.body().unwrap();
    let menu = document.create_element("div").unwrap();
    let item = document.create_element("span").unwrap();
    let elsewhere = document.create_element("input").unwrap();
    menu.append_child(&item).unwrap();
    body.append_child(&menu).unwrap();
    body.append_child(&elsewhere).unwrap();

    assert!(!press_is_outside(&menu, Some(item.clone().into())));
    assert!(!press_is_outside(&menu, Some(menu.clone().into())));
    assert!(press_is_outside(&menu, Some(elsewhere.clone().into())));
    assert!(press_is_outside(&menu, None));

    menu.remove();
    elsewhere.remove();
}
