use std::io;
use thiserror::Error;

/// Errors raised at the edges of the state layer: configuration, console
/// input and payload decoding. Mutations on the state itself never fail.
#[derive(Error, Debug)]
pub enum StateError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed command arguments or payloads
    #[error("Input error: {0}")]
    Input(String),

    #[error("Unknown command: /{0}")]
    UnknownCommand(String),

    /// IO-related errors
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StateError {
    fn from(err: serde_json::Error) -> Self {
        StateError::Serialization(format!("JSON error: {}", err))
    }
}

impl From<serde_yml::Error> for StateError {
    fn from(err: serde_yml::Error) -> Self {
        StateError::Serialization(format!("YAML error: {}", err))
    }
}

impl From<String> for StateError {
    fn from(err: String) -> Self {
        StateError::Input(err)
    }
}

impl From<&str> for StateError {
    fn from(err: &str) -> Self {
        StateError::Input(err.to_string())
    }
}
