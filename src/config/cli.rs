use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "free-games-notifier")]
#[command(about = "Announces newly free games to a Discord channel")]
pub struct Cli {
    /// TOML config file; without it the bot reads its settings from the environment
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, value_enum, default_value_t = LogFormat::Compact, global = true)]
    pub log_format: LogFormat,

    /// Override the poll interval
    #[arg(long, global = true)]
    pub interval_minutes: Option<u64>,

    /// Override the seen-games state file
    #[arg(long, global = true)]
    pub state_path: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run the scheduler and the command listener until Ctrl-C (default)
    Run,
    /// Run one announce cycle now and exit
    Check {
        /// Show what would be announced without posting or saving anything
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Compact,
    Json,
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Run)
    }
}
