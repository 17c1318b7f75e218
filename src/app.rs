use crate::cli::Args;
use crate::commands::{Session, dispatcher::CommandDispatcher};
use crate::config::Config;
use crate::core::error::StateError;
use crate::display;
use crate::input;
use crate::state::AppState;
use is_terminal::IsTerminal;
use std::fs;
use std::io::{self, Read};
use tracing::{info, warn};

pub struct Application {
    pub args: Args,
    pub config: Config,
    pub command_dispatcher: CommandDispatcher,
    session: Session,
}

impl Application {
    pub fn new(args: Args, config: Config, command_dispatcher: CommandDispatcher) -> Self {
        let session = Session::new(AppState::new(), &config);
        Self {
            args,
            config,
            command_dispatcher,
            session,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.session.state
    }

    pub fn run(&mut self) -> Result<(), StateError> {
        if let Some(path) = self.args.script.clone() {
            let source = fs::read_to_string(&path).map_err(|e| {
                StateError::Input(format!("Failed to read {}: {}", path.display(), e))
            })?;
            info!(script = %path.display(), "replaying script");
            self.run_script(&source)?;
        } else if !io::stdin().is_terminal() {
            let mut source = String::new();
            io::stdin()
                .read_to_string(&mut source)
                .map_err(|e| StateError::Input(format!("Failed to read from stdin: {}", e)))?;
            self.run_script(&source)?;
        } else {
            self.run_interactive()?;
        }

        if self.args.json {
            let json = serde_json::to_string_pretty(&self.session.state.snapshot())?;
            display::display_output(&json);
        }
        Ok(())
    }

    fn echo_views(&self) -> bool {
        self.args.echo || self.config.echo_views
    }

    /// Runs one console line and collects what it prints: the command output,
    /// then the derived views when echo is on.
    pub fn execute(&mut self, line: &str) -> Result<Vec<String>, StateError> {
        let output = self.command_dispatcher.execute_line(line, &mut self.session)?;
        let mut lines: Vec<String> = output.into_iter().collect();
        let is_command = !line.trim().is_empty() && !line.trim_start().starts_with('#');
        if is_command && self.echo_views() {
            lines.push(display::render_views(&self.session.state));
        }
        Ok(lines)
    }

    /// Runs every line of `source`. A failing line is reported and the rest
    /// still run; the first failure is returned at the end.
    pub fn run_script(&mut self, source: &str) -> Result<(), StateError> {
        let mut first_error = None;
        for (number, line) in source.lines().enumerate() {
            if !self.session.should_continue {
                break;
            }
            match self.execute(line) {
                Ok(lines) => lines.iter().for_each(|l| display::display_output(l)),
                Err(e) => {
                    warn!(line = number + 1, error = %e, "script line failed");
                    display::display_error(&format!("line {}: {}", number + 1, e));
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn run_interactive(&mut self) -> Result<(), StateError> {
        let history_path = self.config.history_path();
        let mut editor = input::create_editor(self.command_dispatcher.clone(), &history_path)?;
        display::display_banner();

        while self.session.should_continue {
            let Some(line) = input::read_input(&mut editor)? else {
                break;
            };
            match self.execute(&line) {
                Ok(lines) => lines.iter().for_each(|l| display::display_output(l)),
                Err(e) => display::display_error(&e.to_string()),
            }
        }

        if let Err(e) = input::save_history(&mut editor, &history_path) {
            warn!(error = %e, "could not save console history");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::create_command_registry;
    use crate::store::Readable;
    use clap::Parser;

    fn app() -> Application {
        let args = Args::parse_from(["byok-state"]);
        Application::new(args, Config::default(), create_command_registry())
    }

    #[test]
    fn test_script_runs_every_line() {
        let mut app = app();
        let script = r#"
# providers first, then models
/providers [{"provider_name":"openai","api_key_valid":true}]
/models [{"provider_name":"openai","model_name":"gpt-4o"}]
hello
"#;

        app.run_script(script).unwrap();

        assert_eq!(app.state().models_by_provider().with(|g| g.len()), 1);
        assert_eq!(app.state().chat_state().with(|s| s.current_messages.len()), 1);
    }

    #[test]
    fn test_script_keeps_going_after_a_bad_line() {
        let mut app = app();
        let script = "/nope\nstill added\n";

        let result = app.run_script(script);

        assert!(matches!(result, Err(StateError::UnknownCommand(_))));
        assert_eq!(app.state().chat_state().with(|s| s.current_messages.len()), 1);
    }

    #[test]
    fn test_quit_stops_the_script() {
        let mut app = app();

        app.run_script("first\n/quit\nsecond\n").unwrap();

        assert_eq!(app.state().chat_state().with(|s| s.current_messages.len()), 1);
    }

    #[test]
    fn test_echo_prints_views_after_each_command() {
        let args = Args::parse_from(["byok-state", "--echo"]);
        let mut app = Application::new(args, Config::default(), create_command_registry());

        let lines = app
            .execute(r#"/providers [{"provider_name":"openai","api_key_valid":true}]"#)
            .unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "Loaded 1 providers");
        assert_eq!(
            console::strip_ansi_codes(&lines[1]),
            "views models_by_provider=[] valid_providers=[openai] waiting=false"
        );

        let lines = app.execute("/message animate").unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with("waiting=true"));

        assert!(app.execute("# comment").unwrap().is_empty());
    }

    #[test]
    fn test_no_views_without_echo() {
        let mut app = app();
        assert!(app.execute("hello").unwrap().is_empty());
    }
}
