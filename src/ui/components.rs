/// Reusable UI components

use crate::clock::describe_elapsed;
use crate::config::ConfigState;
use crate::theme::theme_name;
use chrono::{Local, Utc};
use patternfly_yew::prelude::*;
use web_sys::HtmlInputElement;
use yew::prelude::*;

#[derive(Properties, PartialEq)]
pub struct SwitchProps {
    pub checked: bool,
    pub onchange: Callback<bool>,
    /// Track color while checked
    #[prop_or_default]
    pub accent: Option<AttrValue>,
    #[prop_or_default]
    pub aria_label: AttrValue,
}

#[function_component(Switch)]
pub fn switch(props: &SwitchProps) -> Html {
    let onchange = {
        let onchange = props.onchange.clone();
        Callback::from(move |e: Event| {
            if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
                onchange.emit(input.checked());
            }
        })
    };

    let slider_style = match (&props.accent, props.checked) {
        (Some(color), true) => format!("background-color: {};", color),
        _ => String::new(),
    };

    html! {
        <label class="switch" aria-label={props.aria_label.clone()}>
            <input type="checkbox" checked={props.checked} {onchange} />
            <span class="slider" style={slider_style}></span>
        </label>
    }
}

#[derive(PartialEq, Clone, Copy, Default)]
pub enum LoadingSize {
    Small,
    #[default]
    Medium,
    Large,
}

impl LoadingSize {
    fn class(&self) -> &'static str {
        match self {
            LoadingSize::Small => "loading-small",
            LoadingSize::Medium => "loading-medium",
            LoadingSize::Large => "loading-large",
        }
    }
}

#[derive(Properties, PartialEq)]
pub struct LoadingProps {
    #[prop_or_default]
    pub size: LoadingSize,
}

#[function_component(Loading)]
pub fn loading(props: &LoadingProps) -> Html {
    html! {
        <div class={classes!("loading", props.size.class())}>
            <Spinner />
        </div>
    }
}

#[derive(Properties, PartialEq)]
pub struct ThemeButtonProps {
    pub is_dark_mode: bool,
    pub onclick: Callback<MouseEvent>,
}

#[function_component(ThemeButton)]
pub fn theme_button(props: &ThemeButtonProps) -> Html {
    let label = if props.is_dark_mode {
        "Dark mode"
    } else {
        "Light mode"
    };

    html! {
        <Button onclick={props.onclick.clone()} variant={ButtonVariant::Secondary}>
            {label}
        </Button>
    }
}

#[derive(Properties, PartialEq)]
pub struct ConfigInfoProps {
    pub state: ConfigState,
}

/// Current theme and when the config last changed
#[function_component(ConfigInfo)]
pub fn config_info(props: &ConfigInfoProps) -> Html {
    let updated_at = props.state.updated_at;
    let formatted = updated_at
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string();
    let relative = describe_elapsed(&updated_at, &Utc::now());

    html! {
        <div class="config-info">
            <div class="info-item">
                <span class="info-label">{"Current theme:"}</span>
                <span class="info-value">{theme_name(props.state.is_dark())}</span>
            </div>
            <div class="info-item">
                <span class="info-label">{"Last modified:"}</span>
                <span class="info-value" title={formatted.clone()}>{relative}</span>
            </div>
            <div class="info-item">
                <span class="info-label">{"Modified at:"}</span>
                <span class="info-value">{formatted}</span>
            </div>
        </div>
    }
}
