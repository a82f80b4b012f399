//! Livedebug - Live debug stream viewer
//!
//! # Usage
//!
//! ```bash
//! # Watch a component through the provider socket
//! livedebug watch prometheus.scrape.default
//! livedebug watch loki.process.default --sample 0.1 --filter error
//!
//! # Try the viewer against a synthetic in-process stream
//! livedebug demo --rate 20
//! ```

mod cmd;

use std::io::IsTerminal;
use std::path::Path;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use livedebug_config::{Config, LogFormat, LogLevel};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Livedebug - Live debug stream viewer
#[derive(Parser, Debug)]
#[command(name = "livedebug")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file (error if specified but not found)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Log level (trace, debug, info, warn, error). Overrides config file.
    #[arg(short, long, global = true)]
    log_level: Option<LogLevel>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stream a component's debug records from the provider socket (Unix only)
    #[cfg(unix)]
    Watch(cmd::watch::WatchArgs),

    /// Stream synthetic records from an in-process hub
    Demo(cmd::demo::DemoArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    let log_level = config.log.effective_level(cli.log_level);
    init_logging(log_level, config.log.format)?;

    match cli.command {
        #[cfg(unix)]
        Command::Watch(args) => cmd::watch::run(args, config).await,
        Command::Demo(args) => cmd::demo::run(args, config).await,
    }
}

/// Load the config file if one was given, defaults otherwise
fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => Ok(Config::default()),
    }
}

/// Initialize the tracing subscriber for logging
///
/// Logs go to stderr; stdout carries the streamed records.
fn init_logging(level: LogLevel, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_new(level.as_str())
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    match format {
        LogFormat::Console => tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_ansi(std::io::stderr().is_terminal()),
            )
            .with(filter)
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .init(),
    }

    Ok(())
}
