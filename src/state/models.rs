use super::AppState;
use crate::store::Readable;
use crate::types::{Model, ProviderData};
use tracing::{debug, info};

impl AppState {
    /// Full replacement of the available models.
    pub fn set_models(&self, models: Vec<Model>) {
        info!(count = models.len(), "models loaded");
        self.available_models.set(models);
    }

    /// Full replacement of the provider list.
    pub fn set_providers(&self, providers: Vec<ProviderData>) {
        info!(
            count = providers.len(),
            valid = providers.iter().filter(|p| p.api_key_valid).count(),
            "providers loaded"
        );
        self.available_providers.set(providers);
    }

    pub fn select_model(&self, model: Model) {
        debug!(model = %model.qualified_name(), "select model");
        self.selected_model.set(Some(model));
    }

    pub fn clear_selected_model(&self) {
        debug!("clear selected model");
        self.selected_model.set(None);
    }

    /// Selects the available model with this provider and name. Returns
    /// `false` and leaves the selection alone when there is none.
    pub fn select_model_by_name(&self, provider_name: &str, model_name: &str) -> bool {
        let found = self.available_models.with(|models| {
            models
                .iter()
                .find(|m| m.provider_name == provider_name && m.model_name == model_name)
                .cloned()
        });
        match found {
            Some(model) => {
                self.select_model(model);
                true
            }
            None => {
                debug!(provider_name, model_name, "no such model");
                false
            }
        }
    }
}
