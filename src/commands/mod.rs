pub mod dispatcher;
pub mod handler;
pub mod registry;

use crate::config::Config;
use crate::state::AppState;
pub use dispatcher::create_command_registry;

/// What the console commands operate on.
pub struct Session {
    pub state: AppState,
    pub preferred_model: Option<(String, String)>,
    pub should_continue: bool,
}

impl Session {
    pub fn new(state: AppState, config: &Config) -> Self {
        Self {
            state,
            preferred_model: config
                .preferred_model()
                .map(|(provider, model)| (provider.to_string(), model.to_string())),
            should_continue: true,
        }
    }
}
