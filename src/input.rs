use crate::commands::dispatcher::CommandDispatcher;
use crate::core::error::StateError;

use console::style;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::{Highlighter, MatchingBracketHighlighter};
use rustyline::hint::{Hinter, HistoryHinter};
use rustyline::history::FileHistory;
use rustyline::validate::{self, MatchingBracketValidator, Validator};
use rustyline::{CompletionType, Config, Context, EditMode, Editor, Helper};
use std::borrow::Cow;
use std::path::Path;

/// Completes slash command names.
pub struct ConsoleCompleter {
    dispatcher: CommandDispatcher,
}

impl ConsoleCompleter {
    pub fn new(dispatcher: CommandDispatcher) -> Self {
        Self { dispatcher }
    }

    fn candidates(&self, prefix: &str) -> Vec<Pair> {
        self.dispatcher
            .get_command_names()
            .into_iter()
            .filter(|cmd| cmd.starts_with(prefix))
            .map(|cmd| Pair {
                display: cmd.clone(),
                replacement: cmd,
            })
            .collect()
    }
}

impl Completer for ConsoleCompleter {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let head = &line[..pos];
        match head.strip_prefix('/') {
            // Only the command word completes; payloads are free text.
            Some(command_part) if !command_part.contains(char::is_whitespace) => {
                Ok((1, self.candidates(command_part)))
            }
            _ => Ok((pos, Vec::new())),
        }
    }
}

/// Combines completion, history hints, bracket highlighting and bracket
/// validation so multi-line JSON payloads can be typed.
pub struct ConsoleHelper {
    completer: ConsoleCompleter,
    highlighter: MatchingBracketHighlighter,
    hinter: HistoryHinter,
    validator: MatchingBracketValidator,
}

impl ConsoleHelper {
    pub fn new(dispatcher: CommandDispatcher) -> Self {
        Self {
            completer: ConsoleCompleter::new(dispatcher),
            highlighter: MatchingBracketHighlighter::new(),
            hinter: HistoryHinter {},
            validator: MatchingBracketValidator::new(),
        }
    }
}

impl Helper for ConsoleHelper {}

impl Completer for ConsoleHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        self.completer.complete(line, pos, ctx)
    }
}

impl Hinter for ConsoleHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, ctx: &Context<'_>) -> Option<String> {
        self.hinter.hint(line, pos, ctx)
    }
}

impl Highlighter for ConsoleHelper {
    fn highlight<'l>(&self, line: &'l str, pos: usize) -> Cow<'l, str> {
        self.highlighter.highlight(line, pos)
    }

    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Cow::Owned(style(hint).dim().to_string())
    }

    fn highlight_candidate<'c>(
        &self,
        candidate: &'c str,
        completion: CompletionType,
    ) -> Cow<'c, str> {
        self.highlighter.highlight_candidate(candidate, completion)
    }
}

impl Validator for ConsoleHelper {
    fn validate(
        &self,
        ctx: &mut validate::ValidationContext,
    ) -> rustyline::Result<validate::ValidationResult> {
        self.validator.validate(ctx)
    }

    fn validate_while_typing(&self) -> bool {
        self.validator.validate_while_typing()
    }
}

pub type ConsoleEditor = Editor<ConsoleHelper, FileHistory>;

/// Creates the line editor and loads any history found at `history_path`.
pub fn create_editor(
    dispatcher: CommandDispatcher,
    history_path: &Path,
) -> Result<ConsoleEditor, StateError> {
    let config = Config::builder()
        .history_ignore_space(true)
        .completion_type(CompletionType::List)
        .edit_mode(EditMode::Emacs)
        .build();

    let mut editor = Editor::with_config(config)
        .map_err(|e| StateError::Input(format!("Failed to create line editor: {}", e)))?;
    editor.set_helper(Some(ConsoleHelper::new(dispatcher)));
    let _ = editor.load_history(history_path);

    Ok(editor)
}

/// Reads one line. `Ok(None)` means the user asked to leave (Ctrl-C/Ctrl-D).
pub fn read_input(editor: &mut ConsoleEditor) -> Result<Option<String>, StateError> {
    let prompt = style("state> ").bold().cyan().to_string();
    match editor.readline(&prompt) {
        Ok(line) => {
            if !line.trim().is_empty() {
                editor
                    .add_history_entry(line.as_str())
                    .map_err(|e| StateError::Input(format!("Failed to add history entry: {}", e)))?;
            }
            Ok(Some(line))
        }
        Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(None),
        Err(err) => Err(StateError::Input(format!("Input error: {}", err))),
    }
}

pub fn save_history(editor: &mut ConsoleEditor, history_path: &Path) -> Result<(), StateError> {
    if let Some(parent) = history_path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }

    editor
        .save_history(history_path)
        .map_err(|e| StateError::Input(format!("Failed to save history: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::create_command_registry;

    fn names(pairs: Vec<Pair>) -> Vec<String> {
        pairs.into_iter().map(|p| p.replacement).collect()
    }

    #[test]
    fn test_completes_command_prefix() {
        let completer = ConsoleCompleter::new(create_command_registry());
        assert_eq!(
            names(completer.candidates("se")),
            vec!["select".to_string(), "set".to_string(), "settings".to_string()]
        );
        assert_eq!(names(completer.candidates("dum")), vec!["dump".to_string()]);
        assert!(completer.candidates("zzz").is_empty());
    }
}
