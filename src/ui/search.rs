/// Search box with engine picker

use crate::browser::run_search;
use crate::config::Transition;
use crate::search::{SearchEngineId, plan_search};
use crate::ui::{StoreProps, use_config};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{EventTarget, HtmlInputElement, Node};
use yew::prelude::*;

#[function_component(Search)]
pub fn search(props: &StoreProps) -> Html {
    let config = use_config(&props.store);
    let query = use_state(String::new);
    let is_menu_visible = use_state(|| false);
    let engines_ref = use_node_ref();

    // Close the menu on a press anywhere outside it
    {
        let is_menu_visible = is_menu_visible.clone();
        let engines_ref = engines_ref.clone();
        use_effect_with(*is_menu_visible, move |open| {
            let registered = if *open {
                let on_outside = Callback::from(move |_: ()| is_menu_visible.set(false));
                watch_outside_press(engines_ref, on_outside)
            } else {
                None
            };
            move || {
                if let Some((document, listener)) = registered {
                    if let Err(e) = document
                        .remove_event_listener_with_callback("mousedown", listener.as_ref().unchecked_ref())
                    {
                        log::warn!("Failed to remove mousedown listener: {:?}", e);
                    }
                }
            }
        });
    }

    let on_toggle_menu = {
        let is_menu_visible = is_menu_visible.clone();
        Callback::from(move |_: MouseEvent| is_menu_visible.set(!*is_menu_visible))
    };

    let on_choose_engine = {
        let store = props.store.clone();
        let is_menu_visible = is_menu_visible.clone();
        move |engine: SearchEngineId| {
            let store = store.clone();
            let is_menu_visible = is_menu_visible.clone();
            Callback::from(move |_: MouseEvent| {
                store.dispatch(Transition::SetChooseEngine(engine));
                is_menu_visible.set(false);
            })
        }
    };

    let on_input = {
        let query = query.clone();
        Callback::from(move |e: InputEvent| {
            if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
                query.set(input.value());
            }
        })
    };

    let on_keydown = {
        let query = query.clone();
        let engine = config.choose_engine;
        let is_direct_link = config.is_direct_link;
        Callback::from(move |e: KeyboardEvent| {
            if e.key() != "Enter" {
                return;
            }
            let Some(target) = plan_search(engine, &query, is_direct_link) else {
                return;
            };
            spawn_local(async move {
                if let Err(e) = run_search(&target).await {
                    log::error!("{}", e);
                }
            });
        })
    };

    let on_clear = {
        let query = query.clone();
        Callback::from(move |_: MouseEvent| query.set(String::new()))
    };

    let current = config.choose_engine.engine();

    html! {
        <div class="search-container">
            <div class="engines-container" ref={engines_ref}>
                <div class="current-engine" onclick={on_toggle_menu}>
                    <img src={current.favicon} alt={format!("{} favicon", current.name)} />
                </div>

                if *is_menu_visible {
                    <div class="engines-list">
                        {for SearchEngineId::ALL.into_iter().map(|id| {
                            let engine = id.engine();
                            let class = classes!(
                                "engine-item",
                                (id == config.choose_engine).then_some("selected")
                            );
                            html! {
                                <div key={engine.key} {class} onclick={on_choose_engine(id)}>
                                    <img src={engine.favicon} alt={format!("{} favicon", engine.name)} />
                                    <span>{engine.name}</span>
                                </div>
                            }
                        })}
                    </div>
                }
            </div>

            <div class="input-wrapper">
                <input
                    id="searchInput"
                    class="search-input"
                    type="text"
                    placeholder="Search..."
                    value={(*query).clone()}
                    oninput={on_input}
                    onkeydown={on_keydown}
                />
                if !query.is_empty() {
                    <button class="clear-button" onclick={on_clear} type="button" aria-label="Clear search">
                        {"\u{00d7}"}
                    </button>
                }
            </div>
        </div>
    }
}

/// Whether a press on `target` landed outside `container`
pub fn press_is_outside(container: &Node, target: Option<EventTarget>) -> bool {
    match target.and_then(|target| target.dyn_into::<Node>().ok()) {
        Some(node) => !container.contains(Some(&node)),
        None => true,
    }
}

type PressListener = (web_sys::Document, Closure<dyn FnMut(MouseEvent)>);

fn watch_outside_press(container: NodeRef, on_outside: Callback<()>) -> Option<PressListener> {
    let document = web_sys::window()?.document()?;
    let listener = Closure::<dyn FnMut(MouseEvent)>::new(move |e: MouseEvent| {
        if let Some(container) = container.get() {
            if press_is_outside(&container, e.target()) {
                on_outside.emit(());
            }
        }
    });

    match document.add_event_listener_with_callback("mousedown", listener.as_ref().unchecked_ref()) {
        Ok(()) => Some((document, listener)),
        Err(e) => {
            log::warn!("Failed to add mousedown listener: {:?}", e);
            None
        }
    }
}
