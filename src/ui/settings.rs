/// Settings side panel for the new tab page

use crate::config::{DEFAULT_THEME_COLOR, Transition};
use crate::store::ConfigStore;
use crate::ui::components::Switch;
use crate::ui::use_config;
use wasm_bindgen::prelude::*;
use web_sys::HtmlInputElement;
use yew::prelude::*;

#[derive(Properties, PartialEq)]
pub struct SettingsPanelProps {
    pub store: ConfigStore,
    pub open: bool,
    pub on_close: Callback<()>,
}

#[function_component(SettingsPanel)]
pub fn settings_panel(props: &SettingsPanelProps) -> Html {
    let config = use_config(&props.store);

    // Close on Escape while open
    {
        let on_close = props.on_close.clone();
        use_effect_with(props.open, move |open| {
            let registered = if *open { watch_escape(on_close) } else { None };
            move || {
                if let Some((document, listener)) = registered {
                    if let Err(e) = document
                        .remove_event_listener_with_callback("keydown", listener.as_ref().unchecked_ref())
                    {
                        log::warn!("Failed to remove keydown listener: {:?}", e);
                    }
                }
            }
        });
    }

    let on_color_input = {
        let store = props.store.clone();
        Callback::from(move |e: InputEvent| {
            if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
                store.dispatch(Transition::SetThemeColor(input.value()));
            }
        })
    };

    let on_direct_link = {
        let store = props.store.clone();
        Callback::from(move |checked: bool| {
            store.dispatch(Transition::SetIsDirectLink(checked));
        })
    };

    let on_overlay_click = {
        let on_close = props.on_close.clone();
        Callback::from(move |_: MouseEvent| on_close.emit(()))
    };

    let on_close_click = {
        let on_close = props.on_close.clone();
        Callback::from(move |_: MouseEvent| on_close.emit(()))
    };

    let color = if config.theme_color.is_empty() {
        DEFAULT_THEME_COLOR.to_string()
    } else {
        config.theme_color.clone()
    };

    html! {
        <>
            if props.open {
                <div class="settings-overlay" onclick={on_overlay_click}></div>
            }
            <div class={classes!("settings-panel", props.open.then_some("open"))}>
                <div class="settings-header">
                    <h2 class="settings-title">{"Settings"}</h2>
                    <button class="close-button" onclick={on_close_click} aria-label="Close settings">
                        {"\u{00d7}"}
                    </button>
                </div>

                <div class="settings-section">
                    <div class="setting-item">
                        <label class="setting-label">
                            <span class="setting-text">{"Theme color"}</span>
                            <span class="setting-description">{"Accent color used across pages"}</span>
                        </label>
                        <input
                            type="color"
                            class="color-input"
                            value={color}
                            oninput={on_color_input}
                            aria-label="Choose theme color"
                        />
                    </div>

                    <div class="setting-item">
                        <label class="setting-label">
                            <span class="setting-text">{"Open links"}</span>
                            <span class="setting-description">
                                {if config.is_direct_link { "In the current tab" } else { "In a new tab" }}
                            </span>
                        </label>
                        <Switch
                            checked={config.is_direct_link}
                            onchange={on_direct_link}
                            accent={AttrValue::from(config.theme_color.clone())}
                            aria_label="Toggle how links open"
                        />
                    </div>
                </div>
            </div>
        </>
    }
}

type EscapeListener = (web_sys::Document, Closure<dyn FnMut(KeyboardEvent)>);

fn watch_escape(on_close: Callback<()>) -> Option<EscapeListener> {
    let document = web_sys::window()?.document()?;
    let listener = Closure::<dyn FnMut(KeyboardEvent)>::new(move |e: KeyboardEvent| {
        if e.key() == "Escape" {
            on_close.emit(());
        }
    });

    match document.add_event_listener_with_callback("keydown", listener.as_ref().unchecked_ref()) {
        Ok(()) => Some((document, listener)),
        Err(e) => {
            log::warn!("Failed to add keydown listener: {:?}", e);
            None
        }
    }
}

#[derive(Properties, PartialEq)]
pub struct SettingsButtonProps {
    pub onclick: Callback<MouseEvent>,
}

#[function_component(SettingsButton)]
pub fn settings_button(props: &SettingsButtonProps) -> Html {
    html! {
        <button class="settings-button" onclick={props.onclick.clone()} aria-label="Open settings">
            {"Settings"}
        </button>
    }
}
