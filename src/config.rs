use crate::core::error::StateError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

fn default_log_filter() -> String {
    "byok_state=info".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// `tracing` filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    /// Print the derived views after every console command.
    #[serde(default)]
    pub echo_views: bool,
    /// `provider/model` selected as soon as a models payload contains it.
    #[serde(default)]
    pub preferred_model: Option<String>,
    /// Where the interactive console keeps its line history.
    #[serde(default)]
    pub history_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
            echo_views: false,
            preferred_model: None,
            history_file: None,
        }
    }
}

impl Config {
    fn config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".byok")
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.yaml")
    }

    /// Loads `~/.byok/config.yaml`, writing a default file on first run.
    pub fn load() -> Result<Config, StateError> {
        let path = Self::config_path();
        if path.exists() {
            return Self::load_from(&path);
        }

        let config = Config::default();
        let _ = config.save_to(&path);
        Ok(config)
    }

    /// Loads a specific file. Missing files are an error here.
    pub fn load_from(path: &Path) -> Result<Config, StateError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| StateError::Config(format!("Read {}: {}", path.display(), e)))?;
        if contents.trim().is_empty() {
            return Ok(Config::default());
        }
        serde_yml::from_str::<Config>(&contents)
            .map_err(|e| StateError::Config(format!("Parse {}: {}", path.display(), e)))
    }

    pub fn save_to(&self, path: &Path) -> Result<(), StateError> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let yaml_content = serde_yml::to_string(self)?;
        fs::write(path, yaml_content)?;
        Ok(())
    }

    pub fn history_path(&self) -> PathBuf {
        self.history_file
            .clone()
            .unwrap_or_else(|| Self::config_dir().join("console_history.txt"))
    }

    /// Splits `preferred_model` into provider and model name.
    pub fn preferred_model(&self) -> Option<(&str, &str)> {
        self.preferred_model.as_deref()?.split_once('/')
    }
}
