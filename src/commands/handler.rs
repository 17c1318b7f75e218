use super::Session;
use crate::core::error::StateError;
use crate::display;
use crate::store::Readable;
use crate::types::{Chat, Message, Model, ProviderData, Role, Settings};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::info;

use console::style;

pub trait CommandHandler: Send + Sync {
    fn execute(&self, session: &mut Session, args: &str) -> Result<Option<String>, StateError>;
    fn help(&self) -> &'static str;
}

fn parse_payload<T: DeserializeOwned>(args: &str, what: &str) -> Result<T, StateError> {
    let args = args.trim();
    if args.is_empty() {
        return Err(StateError::Input(format!("Missing {} payload", what)));
    }
    serde_json::from_str(args)
        .map_err(|e| StateError::Input(format!("Invalid {} payload: {}", what, e)))
}

fn split_first(args: &str) -> (&str, &str) {
    let args = args.trim();
    match args.split_once(char::is_whitespace) {
        Some((first, rest)) => (first, rest.trim()),
        None => (args, ""),
    }
}

pub struct QuitCommand;
pub struct HelpCommand;
pub struct ModelsCommand;
pub struct ProvidersCommand;
pub struct SettingsCommand;
pub struct SetCommand;
pub struct ChatsCommand;
pub struct SelectCommand;
pub struct DeselectCommand;
pub struct LoadingCommand;
pub struct MessageCommand;
pub struct RespondCommand;
pub struct ClearCommand;
pub struct RenameCommand;
pub struct RemoveCommand;
pub struct ModelCommand;
pub struct ShowCommand;
pub struct DumpCommand;

impl CommandHandler for QuitCommand {
    fn execute(&self, session: &mut Session, _args: &str) -> Result<Option<String>, StateError> {
        session.should_continue = false;
        Ok(None)
    }

    fn help(&self) -> &'static str {
        "/quit - Stop reading commands"
    }
}

impl CommandHandler for HelpCommand {
    fn execute(&self, _session: &mut Session, _args: &str) -> Result<Option<String>, StateError> {
        let title = style("Available Commands").bold().underlined();
        let help_text = [
            title.to_string(),
            ModelsCommand.help().to_string(),
            ProvidersCommand.help().to_string(),
            SettingsCommand.help().to_string(),
            SetCommand.help().to_string(),
            ChatsCommand.help().to_string(),
            SelectCommand.help().to_string(),
            DeselectCommand.help().to_string(),
            LoadingCommand.help().to_string(),
            MessageCommand.help().to_string(),
            RespondCommand.help().to_string(),
            ClearCommand.help().to_string(),
            RenameCommand.help().to_string(),
            RemoveCommand.help().to_string(),
            ModelCommand.help().to_string(),
            ShowCommand.help().to_string(),
            DumpCommand.help().to_string(),
            HelpCommand.help().to_string(),
            QuitCommand.help().to_string(),
            style("Lines without a leading '/' are added as user messages.")
                .dim()
                .to_string(),
        ]
        .join("\n");

        Ok(Some(help_text))
    }

    fn help(&self) -> &'static str {
        "/help - Show available commands"
    }
}

impl CommandHandler for ModelsCommand {
    fn execute(&self, session: &mut Session, args: &str) -> Result<Option<String>, StateError> {
        let models: Vec<Model> = parse_payload(args, "models")?;
        let count = models.len();
        session.state.set_models(models);

        let mut output = format!("Loaded {} models", count);
        if session.state.selected_model().with(Option::is_none) {
            if let Some((provider, model)) = &session.preferred_model {
                if session.state.select_model_by_name(provider, model) {
                    info!(provider = %provider, model = %model, "preferred model selected");
                    output.push_str(&format!(" (selected {}/{})", provider, model));
                }
            }
        }
        Ok(Some(output))
    }

    fn help(&self) -> &'static str {
        "/models <json> - Replace the available models"
    }
}

impl CommandHandler for ProvidersCommand {
    fn execute(&self, session: &mut Session, args: &str) -> Result<Option<String>, StateError> {
        let providers: Vec<ProviderData> = parse_payload(args, "providers")?;
        let count = providers.len();
        session.state.set_providers(providers);
        Ok(Some(format!("Loaded {} providers", count)))
    }

    fn help(&self) -> &'static str {
        "/providers <json> - Replace the provider list"
    }
}

impl CommandHandler for SettingsCommand {
    fn execute(&self, session: &mut Session, args: &str) -> Result<Option<String>, StateError> {
        match parse_payload::<Value>(args, "settings")? {
            Value::Null => {
                session.state.unload_settings();
                Ok(Some("Settings unloaded".to_string()))
            }
            Value::Object(settings) => {
                session.state.load_settings(settings);
                Ok(Some("Settings loaded".to_string()))
            }
            other => Err(StateError::Input(format!(
                "Settings must be an object or null, got {}",
                other
            ))),
        }
    }

    fn help(&self) -> &'static str {
        "/settings <json|null> - Load (or unload) the full settings object"
    }
}

impl CommandHandler for SetCommand {
    fn execute(&self, session: &mut Session, args: &str) -> Result<Option<String>, StateError> {
        let partial: Settings = parse_payload(args, "settings")?;
        let keys = partial.len();
        let loaded = session.state.settings().with(Option::is_some);
        session.state.update_settings(partial);

        let output = if loaded {
            format!("Updated {} setting(s)", keys)
        } else {
            "Settings not loaded yet; update ignored".to_string()
        };
        Ok(Some(output))
    }

    fn help(&self) -> &'static str {
        "/set <json> - Merge a partial settings object"
    }
}

impl CommandHandler for ChatsCommand {
    fn execute(&self, session: &mut Session, args: &str) -> Result<Option<String>, StateError> {
        let chats: Vec<Chat> = parse_payload(args, "chats")?;
        let count = chats.len();
        session.state.update_chats(chats);
        Ok(Some(format!("Loaded {} chats", count)))
    }

    fn help(&self) -> &'static str {
        "/chats <json> - Replace the chat list"
    }
}

impl CommandHandler for SelectCommand {
    fn execute(&self, session: &mut Session, args: &str) -> Result<Option<String>, StateError> {
        let (chat_id, payload) = split_first(args);
        if chat_id.is_empty() {
            return Err(StateError::Input("Usage: /select <chat_id> [messages-json]".to_string()));
        }
        let messages: Vec<Message> = if payload.is_empty() {
            Vec::new()
        } else {
            parse_payload(payload, "messages")?
        };
        let count = messages.len();
        session.state.set_current_chat(chat_id, messages);
        Ok(Some(format!("Selected chat {} ({} messages)", chat_id, count)))
    }

    fn help(&self) -> &'static str {
        "/select <chat_id> [messages-json] - Select a chat and load its messages"
    }
}

impl CommandHandler for DeselectCommand {
    fn execute(&self, session: &mut Session, _args: &str) -> Result<Option<String>, StateError> {
        session.state.deselect_chat();
        Ok(Some("Selection cleared".to_string()))
    }

    fn help(&self) -> &'static str {
        "/deselect - Clear the selected chat and its messages"
    }
}

impl CommandHandler for LoadingCommand {
    fn execute(&self, session: &mut Session, args: &str) -> Result<Option<String>, StateError> {
        let is_loading = match args.trim() {
            "on" | "true" => true,
            "off" | "false" => false,
            other => {
                return Err(StateError::Input(format!(
                    "Expected on/off, got '{}'",
                    other
                )));
            }
        };
        session.state.set_loading(is_loading);
        Ok(None)
    }

    fn help(&self) -> &'static str {
        "/loading <on|off> - Set the loading flag"
    }
}

impl CommandHandler for MessageCommand {
    fn execute(&self, session: &mut Session, args: &str) -> Result<Option<String>, StateError> {
        let (role, content) = split_first(args);
        let role: Role = role.parse()?;
        session.state.add_message(Message::new(role, content));
        Ok(None)
    }

    fn help(&self) -> &'static str {
        "/message <role> <content> - Append a message (role: user, assistant, system, animate)"
    }
}

impl CommandHandler for RespondCommand {
    fn execute(&self, session: &mut Session, args: &str) -> Result<Option<String>, StateError> {
        let model_name = session
            .state
            .selected_model()
            .with(|model| model.as_ref().map(|m| m.model_name.clone()))
            .unwrap_or_default();
        session
            .state
            .resolve_response(Message::assistant(args.trim()).with_model(model_name));
        Ok(None)
    }

    fn help(&self) -> &'static str {
        "/respond <content> - Finish the pending response with this content"
    }
}

impl CommandHandler for ClearCommand {
    fn execute(&self, session: &mut Session, _args: &str) -> Result<Option<String>, StateError> {
        session.state.clear_messages();
        Ok(Some("Messages cleared.".to_string()))
    }

    fn help(&self) -> &'static str {
        "/clear - Clear the current messages"
    }
}

impl CommandHandler for RenameCommand {
    fn execute(&self, session: &mut Session, args: &str) -> Result<Option<String>, StateError> {
        let (chat_id, name) = split_first(args);
        if chat_id.is_empty() || name.is_empty() {
            return Err(StateError::Input("Usage: /rename <chat_id> <name>".to_string()));
        }
        session.state.rename_chat(chat_id, name);
        Ok(None)
    }

    fn help(&self) -> &'static str {
        "/rename <chat_id> <name> - Rename a chat"
    }
}

impl CommandHandler for RemoveCommand {
    fn execute(&self, session: &mut Session, args: &str) -> Result<Option<String>, StateError> {
        let chat_id = args.trim();
        if chat_id.is_empty() {
            return Err(StateError::Input("Usage: /remove <chat_id>".to_string()));
        }
        session.state.remove_chat(chat_id);
        Ok(None)
    }

    fn help(&self) -> &'static str {
        "/remove <chat_id> - Remove a chat from the list"
    }
}

impl CommandHandler for ModelCommand {
    fn execute(&self, session: &mut Session, args: &str) -> Result<Option<String>, StateError> {
        match args.trim() {
            "" => {
                let current = session
                    .state
                    .selected_model()
                    .with(|model| model.as_ref().map(Model::qualified_name));
                Ok(Some(format!(
                    "Current model: {}",
                    current.unwrap_or_else(|| "none".to_string())
                )))
            }
            "none" => {
                session.state.clear_selected_model();
                Ok(Some("Model selection cleared".to_string()))
            }
            name => {
                let (provider, model) = name.split_once('/').ok_or_else(|| {
                    StateError::Input(format!("Expected provider/model, got '{}'", name))
                })?;
                if session.state.select_model_by_name(provider, model) {
                    Ok(Some(format!("Model changed to: {}", name)))
                } else {
                    Err(StateError::Input(format!("Model not available: {}", name)))
                }
            }
        }
    }

    fn help(&self) -> &'static str {
        "/model [provider/model|none] - Show or change the selected model"
    }
}

impl CommandHandler for ShowCommand {
    fn execute(&self, session: &mut Session, _args: &str) -> Result<Option<String>, StateError> {
        Ok(Some(display::render_state(&session.state)))
    }

    fn help(&self) -> &'static str {
        "/show - Print the stores and derived views"
    }
}

impl CommandHandler for DumpCommand {
    fn execute(&self, session: &mut Session, _args: &str) -> Result<Option<String>, StateError> {
        let json = serde_json::to_string_pretty(&session.state.snapshot())?;
        Ok(Some(json))
    }

    fn help(&self) -> &'static str {
        "/dump - Print the full state as JSON"
    }
}
