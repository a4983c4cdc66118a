/// Applying the configured theme to the page
use crate::config::ConfigState;
use wasm_bindgen::JsCast;
use web_sys::HtmlElement;

pub const PRIMARY_COLOR_VAR: &str = "--color-primary";

pub fn theme_name(dark: bool) -> &'static str {
    if dark { "dark" } else { "light" }
}

fn root_element() -> Option<HtmlElement> {
    web_sys::window()?
        .document()?
        .document_element()?
        .dyn_into::<HtmlElement>()
        .ok()
}

/// Whether the OS asks for a dark color scheme
pub fn system_prefers_dark() -> bool {
    web_sys::window()
        .and_then(|window| window.match_media("(prefers-color-scheme: dark)").ok().flatten())
        .map(|query| query.matches())
        .unwrap_or(false)
}

/// Set `data-theme` and `color-scheme` on the root element
pub fn apply_theme(dark: bool) {
    let Some(root) = root_element() else {
        return;
    };
    let name = theme_name(dark);

    if let Err(e) = root.set_attribute("data-theme", name) {
        log::warn!("Failed to set data-theme: {:?}", e);
    }
    if let Err(e) = root.style().set_property("color-scheme", name) {
        log::warn!("Failed to set color-scheme: {:?}", e);
    }
}

pub fn apply_theme_color(color: &str) {
    let Some(root) = root_element() else {
        return;
    };
    if let Err(e) = root.style().set_property(PRIMARY_COLOR_VAR, color) {
        log::warn!("Failed to set {}: {:?}", PRIMARY_COLOR_VAR, e);
    }
}

/// Store listener keeping the document in step with the config
pub fn apply_config(state: &ConfigState) {
    apply_theme(state.is_dark());
    apply_theme_color(&state.theme_color);
}
