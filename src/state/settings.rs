use super::AppState;
use crate::types::Settings;
use tracing::debug;

/// Shallow merge: keys in `partial` overwrite, every other key is kept.
pub fn merge_settings(current: &Settings, partial: &Settings) -> Settings {
    let mut merged = current.clone();
    for (key, value) in partial {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

impl AppState {
    /// The full load that materializes settings. Partial updates before this
    /// are ignored.
    pub fn load_settings(&self, settings: Settings) {
        debug!(keys = settings.len(), "load settings");
        self.settings.set(Some(settings));
    }

    pub fn unload_settings(&self) {
        debug!("unload settings");
        self.settings.set(None);
    }

    /// Merges `partial` into the loaded settings. Does nothing until settings
    /// have been loaded.
    pub fn update_settings(&self, partial: Settings) {
        self.settings.update(|current| match current {
            Some(current) => {
                debug!(keys = partial.len(), "update settings");
                Some(merge_settings(current, &partial))
            }
            None => {
                debug!("settings not loaded, ignoring update");
                None
            }
        });
    }
}
