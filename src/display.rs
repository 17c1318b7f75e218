use crate::state::AppState;
use crate::store::Readable;
use crate::types::{Message, Role};
use console::style;

const PREVIEW_WIDTH: usize = 60;

/// Shortens `text` to one line of at most `max` characters.
fn preview(text: &str, max: usize) -> String {
    let line = text.lines().next().unwrap_or("");
    if line.chars().count() <= max && !text.contains('\n') {
        return line.to_string();
    }
    let cut: String = line.chars().take(max.saturating_sub(1)).collect();
    format!("{}…", cut)
}

fn section(title: &str) -> String {
    let rule = "─".repeat(40usize.saturating_sub(title.len() + 4));
    format!("{}", style(format!("┌─ {} {}", title, rule)).dim().green())
}

fn role_label(role: Role) -> String {
    let label = format!("{:>9}", role.as_str());
    match role {
        Role::User => style(label).bold().cyan().to_string(),
        Role::Assistant => style(label).bold().magenta().to_string(),
        Role::System => style(label).bold().yellow().to_string(),
        Role::Animate => style(label).dim().italic().to_string(),
    }
}

fn message_line(index: usize, message: &Message) -> String {
    let content = if message.role.is_in_progress() && message.content.is_empty() {
        style("(waiting)").dim().to_string()
    } else {
        preview(&message.content, PREVIEW_WIDTH)
    };
    let model = if message.model_name.is_empty() {
        String::new()
    } else {
        format!(" {}", style(format!("[{}]", message.model_name)).dim())
    };
    format!("│ {:>3} {} {}{}", index, role_label(message.role), content, model)
}

/// Multi-section view of every store and derived view.
pub fn render_state(state: &AppState) -> String {
    let mut out = Vec::new();

    out.push(section("providers"));
    state.available_providers().with(|providers| {
        if providers.is_empty() {
            out.push(format!("│ {}", style("none").dim()));
        }
        for provider in providers {
            let status = if provider.api_key_valid {
                style("valid").green()
            } else {
                style("invalid").red()
            };
            out.push(format!("│ {} ({})", provider.provider_name, status));
        }
    });

    out.push(section("models by provider"));
    state.models_by_provider().with(|grouped| {
        if grouped.is_empty() {
            out.push(format!("│ {}", style("none").dim()));
        }
        for (provider, models) in grouped {
            let names: Vec<&str> = models.iter().map(|m| m.model_name.as_str()).collect();
            out.push(format!("│ {}: {}", style(provider).bold(), names.join(", ")));
        }
    });
    let selected = state
        .selected_model()
        .with(|model| model.as_ref().map(|m| m.qualified_name()));
    out.push(format!(
        "│ selected: {}",
        selected.unwrap_or_else(|| style("none").dim().to_string())
    ));

    out.push(section("settings"));
    state.settings().with(|settings| match settings {
        None => out.push(format!("│ {}", style("not loaded").dim())),
        Some(settings) if settings.is_empty() => out.push(format!("│ {}", style("empty").dim())),
        Some(settings) => {
            for (key, value) in settings {
                out.push(format!("│ {} = {}", key, value));
            }
        }
    });

    out.push(section("chats"));
    state.chat_state().with(|chat_state| {
        for chat in &chat_state.chats {
            let marker = if chat_state.selected_chat_id.as_deref() == Some(chat.id.as_str()) {
                style("*").bold().green().to_string()
            } else {
                " ".to_string()
            };
            out.push(format!("│{} {} {}", marker, chat.id, chat.display_name));
        }
        match &chat_state.selected_chat_id {
            Some(id) if !chat_state.selection_is_consistent() => out.push(format!(
                "│ selected: {} {}",
                id,
                style("(not in list)").yellow()
            )),
            Some(id) => out.push(format!("│ selected: {}", id)),
            None => out.push(format!("│ selected: {}", style("none").dim())),
        }
        out.push(format!("│ loading: {}", chat_state.is_loading));

        out.push(section("messages"));
        for (index, message) in chat_state.current_messages.iter().enumerate() {
            out.push(message_line(index, message));
        }
    });
    out.push(format!(
        "│ waiting for response: {}",
        state.is_waiting_for_response().get()
    ));

    out.join("\n")
}

/// One-line summary of the derived views, printed after each command in echo
/// mode.
pub fn render_views(state: &AppState) -> String {
    let providers = state
        .models_by_provider()
        .with(|grouped| grouped.keys().cloned().collect::<Vec<_>>());
    let valid = state
        .valid_providers()
        .with(|providers| providers.iter().map(|p| p.provider_name.clone()).collect::<Vec<_>>());
    format!(
        "{} models_by_provider=[{}] valid_providers=[{}] waiting={}",
        style("views").dim(),
        providers.join(","),
        valid.join(","),
        state.is_waiting_for_response().get()
    )
}

pub fn display_output(output: &str) {
    println!("{}", output);
}

pub fn display_error(message: &str) {
    eprintln!("{} {}", style("❌").bold().red(), style(message).red());
}

pub fn display_banner() {
    println!(
        "{} {}",
        style("byok-state").bold().cyan(),
        style("console. Type /help for commands, Ctrl-D to leave.").dim()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Chat, Model, ProviderData};
    use console::strip_ansi_codes;

    #[test]
    fn test_preview_truncates_long_and_multiline_text() {
        assert_eq!(preview("short", 10), "short");
        assert_eq!(preview("abcdefghijkl", 5), "abcd…");
        assert_eq!(preview("first\nsecond", 20), "first…");
    }

    #[test]
    fn test_render_state_lists_stores_and_views() {
        let state = AppState::new();
        state.set_providers(vec![
            ProviderData::new("openai", true),
            ProviderData::new("anthropic", false),
        ]);
        state.set_models(vec![Model::new("openai", "gpt-4o")]);
        state.update_chats(vec![Chat::new("c1", "First")]);
        state.set_current_chat("c1", vec![Message::user("hello"), Message::placeholder()]);

        let rendered = strip_ansi_codes(&render_state(&state)).to_string();

        assert!(rendered.contains("openai (valid)"));
        assert!(rendered.contains("anthropic (invalid)"));
        assert!(rendered.contains("openai: gpt-4o"));
        assert!(rendered.contains("settings"));
        assert!(rendered.contains("not loaded"));
        assert!(rendered.contains("* c1 First"));
        assert!(rendered.contains("(waiting)"));
        assert!(rendered.contains("waiting for response: true"));
    }

    #[test]
    fn test_render_state_flags_dangling_selection() {
        let state = AppState::new();
        state.set_current_chat("ghost", Vec::new());

        let rendered = strip_ansi_codes(&render_state(&state)).to_string();

        assert!(rendered.contains("selected: ghost (not in list)"));
    }

    #[test]
    fn test_render_views_summary() {
        let state = AppState::new();
        state.set_providers(vec![ProviderData::new("openai", true)]);
        state.set_models(vec![Model::new("openai", "gpt-4o")]);

        let rendered = strip_ansi_codes(&render_views(&state)).to_string();

        assert_eq!(
            rendered,
            "views models_by_provider=[openai] valid_providers=[openai] waiting=false"
        );
    }
}
