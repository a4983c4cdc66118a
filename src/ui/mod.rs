/// UI module exports
use crate::config::ConfigState;
use crate::context::PageContext;
use crate::store::ConfigStore;
use std::rc::Rc;
use yew::prelude::*;

pub mod components;
pub mod newtab;
pub mod popup;
pub mod search;
pub mod settings;

/// Root props: the page's context, built before rendering
#[derive(Properties, Clone)]
pub struct PageProps {
    pub context: Rc<PageContext>,
}

impl PartialEq for PageProps {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.context, &other.context)
    }
}

#[derive(Properties, Clone, PartialEq)]
pub struct StoreProps {
    pub store: ConfigStore,
}

/// Current config, re-rendering the component on every transition
#[hook]
pub fn use_config(store: &ConfigStore) -> ConfigState {
    let state = use_state_eq(|| store.state());

    {
        let state = state.clone();
        use_effect_with(store.clone(), move |store| {
            // Catch anything dispatched between first render and now
            state.set(store.state());
            let subscription = store.subscribe(move |next| state.set(next.clone()));
            move || drop(subscription)
        });
    }

    (*state).clone()
}
