//! Watch command - stream a component's debug records from the provider socket

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use livedebug_config::Config;
use livedebug_session::{SessionController, SocketProvider};

use super::clipboard::SystemClipboard;
use super::console;

/// Watch command arguments
#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Component to stream debug records from
    component: String,

    /// Provider socket path (overrides config)
    #[arg(short, long)]
    socket: Option<PathBuf>,

    /// Initial sample rate (0.0 - 1.0 or a percentage, e.g. 0.01 or 1%)
    #[arg(long, value_name = "RATE", value_parser = console::parse_probability)]
    sample: Option<f64>,

    /// Show only records containing TEXT (case-insensitive)
    #[arg(short, long, value_name = "TEXT")]
    filter: Option<String>,

    /// Start stopped; type `resume` to begin streaming
    #[arg(long)]
    paused: bool,
}

/// Run the watch command
pub async fn run(args: WatchArgs, config: Config) -> Result<()> {
    let mut provider_config = config.provider;
    if let Some(socket) = args.socket {
        provider_config.socket_path = socket;
    }

    let mut session_config = config.session;
    if let Some(rate) = args.sample {
        session_config = session_config.with_sample_rate(rate);
    }
    if args.paused {
        session_config = session_config.with_start_enabled(false);
    }

    let provider = SocketProvider::from_config(&provider_config);
    info!(
        socket = %provider.socket_path().display(),
        component = %args.component,
        "watching component (type 'help' for commands)"
    );

    let (handle, task) = SessionController::spawn(
        args.component,
        Arc::new(provider),
        Arc::new(SystemClipboard::new()),
        session_config,
    );

    let result = console::run(&handle, args.filter).await;

    // The controller may already be gone if the console failed on it
    let _ = handle.shutdown();
    task.await.context("session task panicked")?;

    result
}
