//! Logistics platform command-line client

mod commands;
mod config;
mod logging;
mod output;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use commands::Commands;
use std::path::PathBuf;
use tracing::{Level, debug, info};

#[derive(Parser)]
#[command(name = "logi")]
#[command(about = "Sign in, manage your profile and waybill drafts")]
#[command(version)]
struct Cli {
    /// Set logging level
    #[arg(short = 'l', long, global = true, default_value = "warn")]
    log_level: LogLevel,

    /// Data directory for the session file, config and logs
    #[arg(short = 'd', long, global = true)]
    data_dir: Option<PathBuf>,

    /// Configuration file (TOML, YAML or JSON); defaults to <data-dir>/config.toml if present
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// Request timeout in seconds (0 = no timeout)
    #[arg(short = 't', long, global = true)]
    timeout: Option<u64>,

    /// Disable file logging (only log to stderr)
    #[arg(long, global = true)]
    no_file_log: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let data_dir = config::resolve_data_dir(cli.data_dir);
    logging::init_logging(cli.log_level.into(), &data_dir, cli.no_file_log)?;

    let mut client_config = config::load_client_config(cli.config.as_deref(), &data_dir)?;
    if let Some(timeout) = cli.timeout {
        client_config.timeout_secs = timeout;
    }
    debug!(
        api = %client_config.api_base_url,
        core = %client_config.core_api_base_url,
        "Configuration loaded"
    );

    let clients = config::build_clients(&client_config, &data_dir)?;

    info!("Starting logi");
    if let Err(error) = cli.command.execute(&clients).await {
        output::report_error(&error);
        std::process::exit(1);
    }

    Ok(())
}

#[derive(Clone, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(log_level: LogLevel) -> Self {
        match log_level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}
