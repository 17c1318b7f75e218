use super::{
    Session,
    handler::{
        ChatsCommand, ClearCommand, DeselectCommand, DumpCommand, HelpCommand, LoadingCommand,
        MessageCommand, ModelCommand, ModelsCommand, ProvidersCommand, QuitCommand,
        RemoveCommand, RenameCommand, RespondCommand, SelectCommand, SetCommand,
        SettingsCommand, ShowCommand,
    },
    registry::CommandRegistry,
};
use crate::core::error::StateError;
use crate::types::Message;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct CommandDispatcher {
    registry: Arc<CommandRegistry>,
}

impl CommandDispatcher {
    pub fn new(registry: Arc<CommandRegistry>) -> Self {
        Self { registry }
    }

    pub fn execute(
        &self,
        command: &str,
        args: &str,
        session: &mut Session,
    ) -> Result<Option<String>, StateError> {
        self.registry.execute(command, args, session)
    }

    pub fn get_command_names(&self) -> Vec<String> {
        self.registry.get_command_names()
    }

    /// Runs one console line. Blank lines and `#` comments do nothing;
    /// a line without a leading `/` is added as a user message.
    pub fn execute_line(
        &self,
        line: &str,
        session: &mut Session,
    ) -> Result<Option<String>, StateError> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let Some(command_line) = line.strip_prefix('/') else {
            session.state.add_message(Message::user(line));
            return Ok(None);
        };

        let (command, args) = match command_line.split_once(char::is_whitespace) {
            Some((command, args)) => (command, args.trim()),
            None => (command_line, ""),
        };
        debug!(command, "dispatching console command");
        self.execute(command, args, session)
    }
}

pub fn create_command_registry() -> CommandDispatcher {
    let mut registry = CommandRegistry::new();

    registry.register("quit", QuitCommand);
    registry.register("help", HelpCommand);
    registry.register("models", ModelsCommand);
    registry.register("providers", ProvidersCommand);
    registry.register("settings", SettingsCommand);
    registry.register("set", SetCommand);
    registry.register("chats", ChatsCommand);
    registry.register("select", SelectCommand);
    registry.register("deselect", DeselectCommand);
    registry.register("loading", LoadingCommand);
    registry.register("message", MessageCommand);
    registry.register("respond", RespondCommand);
    registry.register("clear", ClearCommand);
    registry.register("rename", RenameCommand);
    registry.register("remove", RemoveCommand);
    registry.register("model", ModelCommand);
    registry.register("show", ShowCommand);
    registry.register("dump", DumpCommand);

    CommandDispatcher::new(Arc::new(registry))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::state::AppState;
    use crate::store::Readable;
    use crate::types::Role;

    fn session() -> Session {
        Session::new(AppState::new(), &Config::default())
    }

    #[test]
    fn test_plain_line_becomes_user_message() {
        let dispatcher = create_command_registry();
        let mut session = session();

        dispatcher.execute_line("hello there", &mut session).unwrap();

        let messages = session.state.chat_state().get().current_messages;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[0].content, "hello there");
    }

    #[test]
    fn test_comments_and_blank_lines_are_skipped() {
        let dispatcher = create_command_registry();
        let mut session = session();

        assert!(dispatcher.execute_line("   ", &mut session).unwrap().is_none());
        assert!(dispatcher.execute_line("# note", &mut session).unwrap().is_none());
        assert!(session.state.chat_state().with(|s| s.current_messages.is_empty()));
    }

    #[test]
    fn test_unknown_command() {
        let dispatcher = create_command_registry();
        let mut session = session();

        let err = dispatcher.execute_line("/frobnicate", &mut session).unwrap_err();
        assert_eq!(err.to_string(), "Unknown command: /frobnicate");
    }

    #[test]
    fn test_quit_stops_session() {
        let dispatcher = create_command_registry();
        let mut session = session();

        dispatcher.execute_line("/quit", &mut session).unwrap();
        assert!(!session.should_continue);
    }

    #[test]
    fn test_loading_then_respond() {
        let dispatcher = create_command_registry();
        let mut session = session();

        dispatcher.execute_line("/loading on", &mut session).unwrap();
        dispatcher.execute_line("question", &mut session).unwrap();
        dispatcher.execute_line("/message animate", &mut session).unwrap();
        assert!(session.state.is_waiting_for_response().get());

        dispatcher.execute_line("/respond answer", &mut session).unwrap();
        dispatcher.execute_line("/loading off", &mut session).unwrap();
        let messages = session.state.chat_state().get().current_messages;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[1].content, "answer");
        assert!(!session.state.chat_state().get().is_loading);
        assert!(!session.state.is_waiting_for_response().get());
    }

    #[test]
    fn test_preferred_model_selected_when_models_arrive() {
        let dispatcher = create_command_registry();
        let config = Config {
            preferred_model: Some("openai/gpt-4o".to_string()),
            ..Config::default()
        };
        let mut session = Session::new(AppState::new(), &config);

        let output = dispatcher
            .execute_line(
                r#"/models [{"provider_name":"openai","model_name":"gpt-4o"}]"#,
                &mut session,
            )
            .unwrap()
            .unwrap();

        assert!(output.contains("selected openai/gpt-4o"));
        let selected = session.state.selected_model().get().unwrap();
        assert_eq!(selected.model_name, "gpt-4o");
    }

    #[test]
    fn test_select_with_messages() {
        let dispatcher = create_command_registry();
        let mut session = session();

        dispatcher
            .execute_line(
                r#"/select c1 [{"role":"user","content":"hi"},{"role":"assistant","content":"yo"}]"#,
                &mut session,
            )
            .unwrap();

        let chat = session.state.chat_state().get();
        assert_eq!(chat.selected_chat_id.as_deref(), Some("c1"));
        assert_eq!(chat.current_messages.len(), 2);
    }

    #[test]
    fn test_bad_payload_is_input_error() {
        let dispatcher = create_command_registry();
        let mut session = session();

        let err = dispatcher.execute_line("/models not-json", &mut session).unwrap_err();
        assert!(matches!(err, StateError::Input(_)));
        let err = dispatcher.execute_line("/settings 42", &mut session).unwrap_err();
        assert!(matches!(err, StateError::Input(_)));
        let err = dispatcher.execute_line("/message robot hi", &mut session).unwrap_err();
        assert!(matches!(err, StateError::Input(_)));
    }

    #[test]
    fn test_set_before_settings_loaded_is_ignored() {
        let dispatcher = create_command_registry();
        let mut session = session();

        let output = dispatcher.execute_line(r#"/set {"theme":"dark"}"#, &mut session).unwrap();
        assert_eq!(output.as_deref(), Some("Settings not loaded yet; update ignored"));
        assert!(session.state.settings().get().is_none());

        dispatcher.execute_line(r#"/settings {"theme":"light","font":12}"#, &mut session).unwrap();
        let output = dispatcher.execute_line(r#"/set {"theme":"dark"}"#, &mut session).unwrap();
        assert_eq!(output.as_deref(), Some("Updated 1 setting(s)"));
        let settings = session.state.settings().get().unwrap();
        assert_eq!(settings["theme"], "dark");
        assert_eq!(settings["font"], 12);
    }
}
