use byok_state::app::Application;
use byok_state::cli::Args;
use byok_state::commands::create_command_registry;
use byok_state::config::Config;
use byok_state::core::logging::init_tracing;
use byok_state::display;
use clap::Parser;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            display::display_error(&e.to_string());
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config.log_filter, args.verbose);

    let mut app = Application::new(args, config, create_command_registry());
    match app.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "run failed");
            ExitCode::FAILURE
        }
    }
}
