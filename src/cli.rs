use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Script of slash commands to replay (reads stdin when omitted)
    pub script: Option<PathBuf>,

    /// Print the derived views after every command
    #[arg(short, long)]
    pub echo: bool,

    /// Print the final state snapshot as JSON
    #[arg(long)]
    pub json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Use this config file instead of ~/.byok/config.yaml
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}
