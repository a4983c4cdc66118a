/// Popup UI: config summary, theme toggle and a ping to the active tab

use crate::browser::{ExtensionMessage, active_tab, send_to_tab};
use crate::config::Transition;
use crate::ui::components::{ConfigInfo, Loading, LoadingSize, ThemeButton};
use crate::ui::{PageProps, use_config};
use patternfly_yew::prelude::*;
use wasm_bindgen_futures::spawn_local;
use yew::prelude::*;

#[derive(Clone, PartialEq)]
enum PopupState {
    Idle,
    Sending,
    Sent(String),
    Error(String),
}

#[function_component(App)]
pub fn app(props: &PageProps) -> Html {
    let store = props.context.store.clone();
    let config = use_config(&store);
    let state = use_state(|| PopupState::Idle);

    // Popup-specific sizing lives under this body class
    use_effect_with((), |_| {
        let body = web_sys::window()
            .and_then(|w| w.document())
            .and_then(|d| d.body());
        if let Some(body) = body {
            if let Err(e) = body.class_list().add_1("popup-page") {
                log::warn!("Failed to tag popup body: {:?}", e);
            }
        }
    });

    let on_toggle_theme = {
        let store = store.clone();
        let is_dark = config.is_dark();
        Callback::from(move |_: MouseEvent| {
            store.dispatch(Transition::SetTheme(!is_dark));
        })
    };

    let on_send = {
        let state = state.clone();
        Callback::from(move |_: MouseEvent| {
            let state = state.clone();
            state.set(PopupState::Sending);

            spawn_local(async move {
                let tab = match active_tab().await {
                    Ok(Some(tab)) => tab,
                    Ok(None) => {
                        state.set(PopupState::Error("No active tab".to_string()));
                        return;
                    }
                    Err(e) => {
                        state.set(PopupState::Error(e));
                        return;
                    }
                };

                let Some(id) = tab.id else {
                    state.set(PopupState::Error("Active tab has no id".to_string()));
                    return;
                };

                match send_to_tab(id, &ExtensionMessage::Hello).await {
                    Ok(()) => {
                        let title = tab.title.unwrap_or_else(|| "the active tab".to_string());
                        log::info!("Sent hello to tab {}", id);
                        state.set(PopupState::Sent(title));
                    }
                    Err(e) => {
                        log::error!("{}", e);
                        state.set(PopupState::Error(e));
                    }
                }
            });
        })
    };

    let is_busy = matches!(*state, PopupState::Sending);

    html! {
        <div class="popup-container">
            <header class="popup-header">
                <h1 class="popup-title">{"Tab Config Sync"}</h1>
                <ThemeButton is_dark_mode={config.is_dark()} onclick={on_toggle_theme} />
            </header>

            <p class="welcome-text">{"Settings made here follow you to every new tab."}</p>

            <ConfigInfo state={config.clone()} />

            <div class="popup-actions">
                <Button onclick={on_send} disabled={is_busy} variant={ButtonVariant::Primary} block={true}>
                    {"Send message to page"}
                </Button>
            </div>

            {match &*state {
                PopupState::Sending => html! {
                    <Loading size={LoadingSize::Small} />
                },
                PopupState::Sent(title) => html! {
                    <p class="message-text">{format!("Message sent to {}", title)}</p>
                },
                PopupState::Error(err) => html! {
                    <div class="message-top-margin">
                        <Alert r#type={AlertType::Danger} title={"Error"} inline={true}>
                            {err.clone()}
                        </Alert>
                    </div>
                },
                PopupState::Idle => html! {}
            }}
        </div>
    }
}
