//! Pure derivations behind the container's derived views.

use crate::types::{Message, Model, ProviderData};
use indexmap::IndexMap;
use std::collections::HashSet;

/// Provider name to its models, in order of first appearance.
pub type ModelsByProvider = IndexMap<String, Vec<Model>>;

/// Groups models under their provider, keeping only providers that are in
/// `providers`. A provider with no models never gets a key.
pub fn group_models_by_provider(models: &[Model], providers: &[ProviderData]) -> ModelsByProvider {
    let known: HashSet<&str> = providers.iter().map(|p| p.provider_name.as_str()).collect();

    let mut grouped = ModelsByProvider::new();
    for model in models {
        if known.contains(model.provider_name.as_str()) {
            grouped
                .entry(model.provider_name.clone())
                .or_default()
                .push(model.clone());
        }
    }
    grouped
}

pub fn valid_providers(providers: &[ProviderData]) -> Vec<ProviderData> {
    providers
        .iter()
        .filter(|p| p.api_key_valid)
        .cloned()
        .collect()
}

/// Only the last message is inspected, so the in-progress placeholder has to
/// be the final entry.
pub fn is_waiting_for_response(messages: &[Message]) -> bool {
    messages
        .last()
        .is_some_and(|message| message.role.is_in_progress())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;
    use proptest::prelude::*;

    #[test]
    fn test_model_without_listed_provider_is_dropped() {
        let models = vec![Model::new("a", "m1")];
        assert!(group_models_by_provider(&models, &[]).is_empty());
    }

    #[test]
    fn test_grouping_preserves_model_order_and_first_appearance() {
        let models = vec![
            Model::new("openai", "gpt-4o"),
            Model::new("anthropic", "claude"),
            Model::new("openai", "gpt-4o-mini"),
            Model::new("groqcloud", "llama"),
        ];
        let providers = vec![
            ProviderData::new("anthropic", true),
            ProviderData::new("openai", false),
            ProviderData::new("mistralai", true),
        ];

        let grouped = group_models_by_provider(&models, &providers);

        let keys: Vec<&str> = grouped.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["openai", "anthropic"]);
        let openai: Vec<&str> = grouped["openai"]
            .iter()
            .map(|m| m.model_name.as_str())
            .collect();
        assert_eq!(openai, vec!["gpt-4o", "gpt-4o-mini"]);
        assert!(!grouped.contains_key("mistralai"));
    }

    #[test]
    fn test_waiting_only_looks_at_last_message() {
        assert!(!is_waiting_for_response(&[]));
        assert!(is_waiting_for_response(&[
            Message::user("hi"),
            Message::placeholder()
        ]));
        // A message appended after the placeholder hides it.
        assert!(!is_waiting_for_response(&[
            Message::placeholder(),
            Message::new(Role::System, "note")
        ]));
    }

    fn arb_model() -> impl Strategy<Value = Model> {
        ("[a-d]", "[a-z]{1,6}").prop_map(|(provider, name)| Model::new(provider, name))
    }

    fn arb_provider() -> impl Strategy<Value = ProviderData> {
        ("[a-e]", any::<bool>()).prop_map(|(name, valid)| ProviderData::new(name, valid))
    }

    proptest! {
        #[test]
        fn grouping_never_yields_empty_entries(
            models in prop::collection::vec(arb_model(), 0..20),
            providers in prop::collection::vec(arb_provider(), 0..6),
        ) {
            let grouped = group_models_by_provider(&models, &providers);
            for (provider, group) in &grouped {
                prop_assert!(!group.is_empty());
                prop_assert!(group.iter().all(|m| &m.provider_name == provider));
                prop_assert!(providers.iter().any(|p| &p.provider_name == provider));
            }
            let total: usize = grouped.values().map(Vec::len).sum();
            let expected = models
                .iter()
                .filter(|m| providers.iter().any(|p| p.provider_name == m.provider_name))
                .count();
            prop_assert_eq!(total, expected);
        }

        #[test]
        fn valid_providers_is_an_ordered_subsequence(
            providers in prop::collection::vec(arb_provider(), 0..12),
        ) {
            let valid = valid_providers(&providers);
            let mut rest = providers.iter();
            for provider in &valid {
                prop_assert!(provider.api_key_valid);
                prop_assert!(rest.any(|p| p == provider));
            }
            prop_assert_eq!(valid.len(), providers.iter().filter(|p| p.api_key_valid).count());
        }
    }
}
