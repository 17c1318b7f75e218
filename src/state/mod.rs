//! The application state container.
//!
//! [`AppState`] owns one [`Runtime`], the five primitive stores and the three
//! derived views. The composition root builds it and hands clones to
//! collaborators; clones share the same stores.

mod chat;
mod models;
mod settings;
pub mod views;

pub use chat::ChatState;
pub use settings::merge_settings;
pub use views::ModelsByProvider;

use crate::store::{Derived, ReadOnly, Readable, Runtime, Store};
use crate::types::{Model, ProviderData, Settings};
use serde::Serialize;

#[derive(Clone)]
pub struct AppState {
    runtime: Runtime,
    available_models: Store<Vec<Model>>,
    available_providers: Store<Vec<ProviderData>>,
    settings: Store<Option<Settings>>,
    chat_state: Store<ChatState>,
    selected_model: Store<Option<Model>>,
    models_by_provider: Derived<ModelsByProvider>,
    valid_providers: Derived<Vec<ProviderData>>,
    is_waiting_for_response: Derived<bool>,
}

impl AppState {
    pub fn new() -> Self {
        let runtime = Runtime::new();
        let available_models = Store::new(&runtime, "available_models", Vec::new());
        let available_providers = Store::new(&runtime, "available_providers", Vec::new());
        let settings = Store::new(&runtime, "settings", None);
        let chat_state = Store::new(&runtime, "chat_state", ChatState::default());
        let selected_model = Store::new(&runtime, "selected_model", None);

        let models_by_provider = Derived::combine(
            "models_by_provider",
            &available_models,
            &available_providers,
            |models: &Vec<Model>, providers: &Vec<ProviderData>| {
                views::group_models_by_provider(models, providers)
            },
        );
        let valid_providers = Derived::new(
            "valid_providers",
            &available_providers,
            |providers: &Vec<ProviderData>| views::valid_providers(providers),
        );
        let is_waiting_for_response =
            Derived::new("is_waiting_for_response", &chat_state, |state: &ChatState| {
                views::is_waiting_for_response(&state.current_messages)
            });

        Self {
            runtime,
            available_models,
            available_providers,
            settings,
            chat_state,
            selected_model,
            models_by_provider,
            valid_providers,
            is_waiting_for_response,
        }
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Runs several mutations as one batch: every store publishes its final
    /// value once and each derived view recomputes at most once.
    pub fn batch<R>(&self, f: impl FnOnce(&Self) -> R) -> R {
        self.runtime.batch(|| f(self))
    }

    pub fn available_models(&self) -> ReadOnly<Vec<Model>> {
        self.available_models.read_only()
    }

    pub fn available_providers(&self) -> ReadOnly<Vec<ProviderData>> {
        self.available_providers.read_only()
    }

    pub fn settings(&self) -> ReadOnly<Option<Settings>> {
        self.settings.read_only()
    }

    pub fn chat_state(&self) -> ReadOnly<ChatState> {
        self.chat_state.read_only()
    }

    pub fn selected_model(&self) -> ReadOnly<Option<Model>> {
        self.selected_model.read_only()
    }

    pub fn models_by_provider(&self) -> &Derived<ModelsByProvider> {
        &self.models_by_provider
    }

    pub fn valid_providers(&self) -> &Derived<Vec<ProviderData>> {
        &self.valid_providers
    }

    pub fn is_waiting_for_response(&self) -> &Derived<bool> {
        &self.is_waiting_for_response
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            available_models: self.available_models.get(),
            available_providers: self.available_providers.get(),
            settings: self.settings.get(),
            chat_state: self.chat_state.get(),
            selected_model: self.selected_model.get(),
            models_by_provider: self.models_by_provider.get(),
            valid_providers: self.valid_providers.get(),
            is_waiting_for_response: self.is_waiting_for_response.get(),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("runtime", &self.runtime)
            .field("chat_state", &self.chat_state)
            .finish_non_exhaustive()
    }
}

/// Point-in-time copy of every store and view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateSnapshot {
    pub available_models: Vec<Model>,
    pub available_providers: Vec<ProviderData>,
    pub settings: Option<Settings>,
    pub chat_state: ChatState,
    pub selected_model: Option<Model>,
    pub models_by_provider: ModelsByProvider,
    pub valid_providers: Vec<ProviderData>,
    pub is_waiting_for_response: bool,
}
