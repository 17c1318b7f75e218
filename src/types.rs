use crate::core::error::StateError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Named configuration options. The store wraps this in `Option`; `None`
/// means "not loaded yet", which is not the same as an empty mapping.
pub type Settings = Map<String, Value>;

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub provider_name: String,
    pub model_name: String,
    #[serde(default)]
    pub model_display_name: String,
    #[serde(default = "default_true")]
    pub show: bool,
    #[serde(default)]
    pub max_tokens: u32,
    #[serde(default)]
    pub context_window: u32,
}

impl Model {
    pub fn new(provider_name: impl Into<String>, model_name: impl Into<String>) -> Self {
        let model_name = model_name.into();
        Self {
            provider_name: provider_name.into(),
            model_display_name: model_name.clone(),
            model_name,
            show: true,
            max_tokens: 0,
            context_window: 0,
        }
    }

    /// `provider/model`, the form the console accepts and prints.
    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.provider_name, self.model_name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderData {
    pub provider_name: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub api_key_valid: bool,
}

impl ProviderData {
    pub fn new(provider_name: impl Into<String>, api_key_valid: bool) -> Self {
        let provider_name = provider_name.into();
        Self {
            display_name: provider_name.clone(),
            provider_name,
            api_key: String::new(),
            api_key_valid,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    /// Placeholder role of a response that is still streaming.
    Animate,
}

impl Role {
    pub fn is_in_progress(&self) -> bool {
        matches!(self, Role::Animate)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
            Role::Animate => "animate",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = StateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            "system" => Ok(Role::System),
            "animate" => Ok(Role::Animate),
            other => Err(StateError::Input(format!("Unknown message role: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageBlock {
    #[serde(default)]
    pub id: Option<i32>,
    pub type_: String,
    #[serde(default)]
    pub language: Option<String>,
    pub raw_content: String,
    pub rendered_content: String,
    #[serde(default)]
    pub copied: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub model_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocks: Option<Vec<MessageBlock>>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            role,
            content: content.into(),
            model_name: String::new(),
            blocks: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Empty in-progress message appended while a response streams.
    pub fn placeholder() -> Self {
        Self::new(Role::Animate, "")
    }

    pub fn with_model(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = model_name.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default = "Utc::now")]
    pub creation_date: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub last_updated: DateTime<Utc>,
}

impl Chat {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            display_name: display_name.into(),
            creation_date: now,
            last_updated: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trips_through_lowercase_names() {
        let message: Message =
            serde_json::from_str(r#"{"role":"animate","content":""}"#).unwrap();
        assert_eq!(message.role, Role::Animate);
        assert!(message.role.is_in_progress());
        assert_eq!(serde_json::to_value(Role::Assistant).unwrap(), "assistant");
    }

    #[test]
    fn test_role_from_str_rejects_unknown() {
        assert_eq!("User".parse::<Role>().unwrap(), Role::User);
        assert!(matches!("tool".parse::<Role>(), Err(StateError::Input(_))));
    }

    #[test]
    fn test_minimal_payloads_fill_defaults() {
        let chat: Chat = serde_json::from_str(r#"{"id":"c1"}"#).unwrap();
        assert_eq!(chat.id, "c1");
        assert!(chat.display_name.is_empty());

        let model: Model =
            serde_json::from_str(r#"{"provider_name":"a","model_name":"m1"}"#).unwrap();
        assert!(model.show);
        assert_eq!(model.qualified_name(), "a/m1");

        let provider: ProviderData =
            serde_json::from_str(r#"{"provider_name":"openai"}"#).unwrap();
        assert!(!provider.api_key_valid);
    }
}
