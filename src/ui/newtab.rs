/// New tab page: search box, theme toggle and settings

use crate::config::Transition;
use crate::ui::components::ThemeButton;
use crate::ui::search::Search;
use crate::ui::settings::{SettingsButton, SettingsPanel};
use crate::ui::{PageProps, use_config};
use yew::prelude::*;

#[function_component(NewTab)]
pub fn new_tab(props: &PageProps) -> Html {
    let store = props.context.store.clone();
    let config = use_config(&store);
    let is_settings_open = use_state(|| false);

    let on_toggle_theme = {
        let store = store.clone();
        let is_dark = config.is_dark();
        Callback::from(move |_: MouseEvent| {
            store.dispatch(Transition::SetTheme(!is_dark));
        })
    };

    let on_open_settings = {
        let is_settings_open = is_settings_open.clone();
        Callback::from(move |_: MouseEvent| is_settings_open.set(true))
    };

    let on_close_settings = {
        let is_settings_open = is_settings_open.clone();
        Callback::from(move |_: ()| is_settings_open.set(false))
    };

    html! {
        <div class="newtab-container">
            <div class="toolbar">
                <ThemeButton is_dark_mode={config.is_dark()} onclick={on_toggle_theme} />
                <SettingsButton onclick={on_open_settings} />
            </div>

            <main class="newtab-main">
                <Search store={store.clone()} />
            </main>

            <SettingsPanel
                store={store}
                open={*is_settings_open}
                on_close={on_close_settings}
            />
        </div>
    }
}
