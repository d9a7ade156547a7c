use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

use crate::app::App;
use crate::config::{ConfigLoader, ConfigPaths};

pub mod commands;

use self::commands::{DeleteArgs, EditArgs, ListArgs, NewArgs, ShowArgs};

#[derive(Parser, Debug)]
#[command(
    name = "notes-client",
    version,
    about = "Terminal client for a remote notes service"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Override the config file location (takes precedence over NOTES_CLIENT_CONFIG)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Base URL of the notes API (takes precedence over NOTES_API_BASE_URL)
    #[arg(long)]
    pub api_url: Option<String>,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Launch the interactive TUI (default)
    Tui,
    /// Print note summaries, optionally filtered by a search query
    List(ListArgs),
    /// Print a single note
    Show(ShowArgs),
    /// Create a note
    New(NewArgs),
    /// Replace the title and/or content of a note
    Edit(EditArgs),
    /// Delete a note after confirmation
    Delete(DeleteArgs),
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut paths = ConfigPaths::discover()?;
    if let Some(path) = &cli.config {
        paths = paths.with_config_file(path);
    }
    let loader = ConfigLoader::from_paths(paths);
    loader.paths().ensure_directories()?;

    let command = cli.command.unwrap_or(Commands::Tui);
    // the alternate screen owns stdout/stderr while the TUI runs
    let log_file = matches!(command, Commands::Tui).then(|| loader.paths().log_file());
    init_tracing(&cli.log_level, log_file.as_deref())
        .with_context(|| format!("initialising logging at level {}", cli.log_level))?;

    let mut config = loader.load_or_init()?;
    config.apply_overrides(cli.api_url.as_deref())?;
    tracing::info!(base_url = %config.api.base_url, "configuration loaded");

    let config = Arc::new(config);
    match command {
        Commands::Tui => {
            let mut app = App::new(config)?;
            commands::run_tui(&mut app)
        }
        Commands::List(args) => commands::list_notes(&config, args),
        Commands::Show(args) => commands::show_note(&config, args),
        Commands::New(args) => commands::new_note(&config, args),
        Commands::Edit(args) => commands::edit_note(&config, args),
        Commands::Delete(args) => commands::delete_note(&config, args),
    }
}

fn init_tracing(level: &str, log_file: Option<&Path>) -> Result<()> {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_try_init(|| {
        let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
        match log_file {
            Some(path) => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .with_context(|| format!("opening log file {}", path.display()))?;
                fmt()
                    .with_env_filter(env_filter)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .init();
            }
            None => {
                fmt()
                    .with_env_filter(env_filter)
                    .with_writer(std::io::stderr)
                    .init();
            }
        }
        Ok::<(), anyhow::Error>(())
    })
    .map(|_| ())
}
