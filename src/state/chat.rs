use super::AppState;
use crate::types::{Chat, Message};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Aggregate of the chat list, the selection and the selected chat's messages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatState {
    pub chats: Vec<Chat>,
    pub selected_chat_id: Option<String>,
    pub current_messages: Vec<Message>,
    pub is_loading: bool,
}

impl ChatState {
    pub fn selected_chat(&self) -> Option<&Chat> {
        let id = self.selected_chat_id.as_deref()?;
        self.chats.iter().find(|chat| chat.id == id)
    }

    /// False while the selection points at a chat missing from `chats`.
    pub fn selection_is_consistent(&self) -> bool {
        self.selected_chat_id.is_none() || self.selected_chat().is_some()
    }
}

impl AppState {
    /// Selects a chat and installs its messages in one publish.
    pub fn set_current_chat(&self, chat_id: impl Into<String>, messages: Vec<Message>) {
        let chat_id = chat_id.into();
        debug!(chat_id = %chat_id, count = messages.len(), "set current chat");
        self.chat_state.update(|state| ChatState {
            selected_chat_id: Some(chat_id),
            current_messages: messages,
            ..state.clone()
        });
    }

    /// Clears the selection together with its messages.
    pub fn deselect_chat(&self) {
        debug!("deselect chat");
        self.chat_state.update(|state| ChatState {
            selected_chat_id: None,
            current_messages: Vec::new(),
            ..state.clone()
        });
    }

    /// Replaces the chat list. The selection is left alone even if it no
    /// longer matches a chat.
    pub fn update_chats(&self, chats: Vec<Chat>) {
        debug!(count = chats.len(), "update chats");
        self.chat_state.update(|state| ChatState {
            chats,
            ..state.clone()
        });
    }

    pub fn set_loading(&self, is_loading: bool) {
        debug!(is_loading, "set loading");
        self.chat_state.update(|state| ChatState {
            is_loading,
            ..state.clone()
        });
    }

    /// Appends to the current messages, with or without a selected chat.
    pub fn add_message(&self, message: Message) {
        debug!(role = %message.role, "add message");
        self.chat_state.update(|state| {
            let mut next = state.clone();
            next.current_messages.push(message);
            next
        });
    }

    /// Swaps a trailing in-progress placeholder for the finished response.
    /// Appends instead when the last message is not a placeholder.
    pub fn resolve_response(&self, message: Message) {
        self.chat_state.update(|state| {
            let mut next = state.clone();
            match next.current_messages.last_mut() {
                Some(last) if last.role.is_in_progress() => {
                    debug!(role = %message.role, "resolve pending response");
                    *last = message;
                }
                _ => {
                    debug!(role = %message.role, "no pending response, appending");
                    next.current_messages.push(message);
                }
            }
            next
        });
    }

    pub fn clear_messages(&self) {
        debug!("clear messages");
        self.chat_state.update(|state| ChatState {
            current_messages: Vec::new(),
            ..state.clone()
        });
    }

    /// Renames a chat in place. Unknown ids are ignored.
    pub fn rename_chat(&self, chat_id: &str, display_name: impl Into<String>) {
        let display_name = display_name.into();
        debug!(chat_id, display_name = %display_name, "rename chat");
        self.chat_state.update(|state| {
            let mut next = state.clone();
            if let Some(chat) = next.chats.iter_mut().find(|chat| chat.id == chat_id) {
                chat.display_name = display_name;
                chat.last_updated = Utc::now();
            }
            next
        });
    }

    /// Drops a chat from the list. Removing the selected chat also clears the
    /// selection and its messages in the same publish.
    pub fn remove_chat(&self, chat_id: &str) {
        debug!(chat_id, "remove chat");
        self.chat_state.update(|state| {
            let mut next = state.clone();
            next.chats.retain(|chat| chat.id != chat_id);
            if next.selected_chat_id.as_deref() == Some(chat_id) {
                next.selected_chat_id = None;
                next.current_messages.clear();
            }
            next
        });
    }
}
