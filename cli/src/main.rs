mod commands;
mod prompt;
mod session;

use anyhow::Result;
use clap::{Parser, Subcommand};
use hubfetch_core::{CancelToken, Config, Language, Messages};
use std::ffi::OsString;
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hubfetch")]
#[command(author, version, about = "Search the Hugging Face hub and download models", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Message language (tr or en); detected from the locale by default
    #[arg(long, global = true)]
    lang: Option<Language>,

    /// Maximum number of search results
    #[arg(long, global = true)]
    limit: Option<usize>,

    /// Directory that receives model folders
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Show debug logs on stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Search, pick and download models interactively (default)
    Interactive,

    /// Search for models on the hub
    Search {
        /// Search query
        query: String,
    },

    /// Download every file of a model, skipping files already present
    Pull {
        /// Model identifier (e.g., "google-bert/bert-base-uncased")
        model: String,
    },

    /// View or set configuration
    Config {
        /// Config key (e.g., "hub.search_limit", "download.directory")
        key: Option<String>,

        /// Value to set (if omitted, shows current value)
        value: Option<String>,
    },
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .init();
}

/// Parse command-line arguments. Usage errors, `--help` and `--version` are
/// printed here and come back as `None`, so the caller still exits with 0.
fn parse_args<I, T>(args: I) -> Option<Cli>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match Cli::try_parse_from(args) {
        Ok(cli) => Some(cli),
        Err(e) => {
            let _ = e.print();
            None
        }
    }
}

fn exit() -> ! {
    // A stdin read may still be parked on the blocking pool; exit without
    // waiting for it.
    let _ = std::io::stdout().flush();
    std::process::exit(0);
}

/// Cancel `token` on the first Ctrl+C. A second press exits immediately.
fn watch_interrupt(token: CancelToken) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to install Ctrl+C handler");
            return;
        }
        tracing::debug!("Received Ctrl+C");
        token.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::debug!("Received second Ctrl+C, exiting");
            exit();
        }
    });
}

fn load_config(cli: &Cli) -> Config {
    let mut config = Config::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load config, using defaults");
        Config::default()
    });

    if let Some(lang) = cli.lang {
        config.ui.language = Some(lang);
    }
    if let Some(limit) = cli.limit.filter(|l| *l > 0) {
        config.hub.search_limit = limit;
    }
    if let Some(dir) = &cli.output_dir {
        config.download.directory = dir.clone();
    }
    config
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli);
    let messages = Messages::new(config.language())?;
    tracing::debug!(language = %messages.language(), endpoint = %config.hub.endpoint, "Starting");

    let cancel = CancelToken::new();
    watch_interrupt(cancel.clone());

    match cli.command {
        None | Some(Commands::Interactive) => {
            commands::interactive::execute(&config, &messages, cancel).await?;
        }
        Some(Commands::Search { query }) => {
            commands::search::execute(&config, &messages, cancel, &query).await?;
        }
        Some(Commands::Pull { model }) => {
            commands::pull::execute(&config, &messages, cancel, &model).await?;
        }
        Some(Commands::Config { key, value }) => {
            commands::config::execute(key.as_deref(), value.as_deref()).await?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let Some(cli) = parse_args(std::env::args_os()) else {
        exit();
    };
    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        tracing::error!(error = %e, "Command failed");
        eprintln!("Error: {:#}", e);
    }

    exit();
}
