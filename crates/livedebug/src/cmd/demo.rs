//! Demo command - run the viewer against a synthetic in-process stream

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Args;
use tracing::info;

use livedebug_config::Config;
use livedebug_session::{SessionController, StreamHub};

use super::clipboard::SystemClipboard;
use super::console;

const LEVELS: &[&str] = &["debug", "info", "info", "info", "warn", "error"];

const MESSAGES: &[&str] = &[
    "scrape finished",
    "batch flushed to remote",
    "retrying after connection refused",
    "target discovered",
    "series dropped by relabel rule",
    "write request timed out",
];

/// Demo command arguments
#[derive(Args, Debug)]
pub struct DemoArgs {
    /// Records generated per second
    #[arg(long, value_name = "N", default_value = "10")]
    rate: u32,

    /// Component id the generator publishes under
    #[arg(long, default_value = "demo.generator")]
    component: String,

    /// Initial sample rate (0.0 - 1.0 or a percentage)
    #[arg(long, value_name = "RATE", value_parser = console::parse_probability)]
    sample: Option<f64>,

    /// Show only records containing TEXT (case-insensitive)
    #[arg(short, long, value_name = "TEXT")]
    filter: Option<String>,
}

/// Run the demo command
pub async fn run(args: DemoArgs, config: Config) -> Result<()> {
    if args.rate == 0 {
        bail!("--rate must be at least 1");
    }

    let mut session_config = config.session;
    if let Some(rate) = args.sample {
        session_config = session_config.with_sample_rate(rate);
    }

    let hub = Arc::new(StreamHub::new());
    let generator = tokio::spawn(generate(
        Arc::clone(&hub),
        args.component.clone(),
        Duration::from_secs(1) / args.rate,
    ));

    info!(
        component = %args.component,
        rate = args.rate,
        "demo stream started (type 'help' for commands)"
    );

    let (handle, task) = SessionController::spawn(
        args.component,
        hub,
        Arc::new(SystemClipboard::new()),
        session_config,
    );

    let result = console::run(&handle, args.filter).await;

    let _ = handle.shutdown();
    task.await.context("session task panicked")?;
    generator.abort();

    result
}

/// Publish a synthetic log line every `period`
async fn generate(hub: Arc<StreamHub>, component: String, period: Duration) {
    let mut interval = tokio::time::interval(period);
    let mut seq: u64 = 0;

    loop {
        interval.tick().await;
        seq += 1;
        hub.publish(&component, &synthetic_record(seq));
    }
}

fn synthetic_record(seq: u64) -> String {
    let level = LEVELS[rand::random_range(0..LEVELS.len())];
    let message = MESSAGES[rand::random_range(0..MESSAGES.len())];
    let latency_ms = rand::random_range(1..250u32);
    format!(
        "seq={} level={} msg=\"{}\" latency_ms={}",
        seq, level, message, latency_ms
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_record_shape() {
        let record = synthetic_record(42);
        assert!(record.starts_with("seq=42 level="));
        assert!(record.contains(" msg=\""));
        assert!(record.contains(" latency_ms="));
    }

    #[tokio::test(start_paused = true)]
    async fn test_generator_publishes_to_subscribers() {
        use livedebug_session::{ClipboardSink, SessionState, StreamProvider};

        struct NoClipboard;

        #[async_trait::async_trait]
        impl ClipboardSink for NoClipboard {
            async fn write(&self, _text: String) -> livedebug_session::Result<()> {
                Ok(())
            }
        }

        let hub = Arc::new(StreamHub::new());
        let generator = tokio::spawn(generate(
            Arc::clone(&hub),
            "demo".to_string(),
            Duration::from_millis(100),
        ));

        let (handle, task) = SessionController::spawn(
            "demo",
            Arc::clone(&hub) as Arc<dyn StreamProvider>,
            Arc::new(NoClipboard),
            livedebug_config::SessionConfig::default(),
        );

        tokio::time::sleep(Duration::from_millis(1050)).await;
        let status = handle.status().await.unwrap();
        assert_eq!(status.state, SessionState::Active);
        assert!(status.total_received >= 5);

        handle.shutdown().unwrap();
        task.await.unwrap();
        generator.abort();
        assert!(!hub.has_subscribers("demo"));
    }
}
