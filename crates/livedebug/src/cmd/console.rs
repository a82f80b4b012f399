//! Line-oriented session console
//!
//! Reads commands from stdin and prints records that pass the current filter
//! to stdout as they arrive. Subscription errors and export results are
//! printed once, when they change.

use anyhow::{Result, anyhow, bail};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use livedebug_session::{ExportOutcome, RecordFilter, SessionHandle, SessionStatus, as_percent};

/// Console commands with descriptions
pub const COMMANDS: &[(&str, &str)] = &[
    ("stop", "Stop streaming"),
    ("resume", "Resume streaming"),
    ("sample <p>", "Set and apply the sampling probability (0.0-1.0 or 25%)"),
    ("drag <p>", "Adjust the sampling probability without applying it"),
    ("commit", "Apply the adjusted sampling probability"),
    ("filter <text>", "Show only records containing text (empty clears)"),
    ("clear", "Drop buffered records"),
    ("copy", "Copy the whole buffer to the clipboard"),
    ("show", "Print buffered records that pass the filter"),
    ("status", "Print session status"),
    ("help", "Show commands"),
    ("quit", "Exit"),
];

/// A parsed console line
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Stop,
    Resume,
    Sample(f64),
    Drag(f64),
    Commit,
    Filter(String),
    Clear,
    Copy,
    Show,
    Status,
    Help,
    Quit,
}

/// Parse one input line; blank lines yield `None`
pub fn parse_command(line: &str) -> Result<Option<ConsoleCommand>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (name, rest) = match line.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (line, ""),
    };

    let command = match name.to_ascii_lowercase().as_str() {
        "stop" | "pause" => ConsoleCommand::Stop,
        "resume" | "start" => ConsoleCommand::Resume,
        "sample" => ConsoleCommand::Sample(parse_probability(rest)?),
        "drag" => ConsoleCommand::Drag(parse_probability(rest)?),
        "commit" => ConsoleCommand::Commit,
        "filter" => ConsoleCommand::Filter(rest.to_string()),
        "clear" => ConsoleCommand::Clear,
        "copy" | "export" => ConsoleCommand::Copy,
        "show" => ConsoleCommand::Show,
        "status" => ConsoleCommand::Status,
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "exit" | "q" => ConsoleCommand::Quit,
        other => bail!("unknown command '{}' (try 'help')", other),
    };

    Ok(Some(command))
}

/// Parse a probability as a fraction (`0.25`) or a percentage (`25%`)
pub fn parse_probability(input: &str) -> Result<f64> {
    let input = input.trim();
    if input.is_empty() {
        bail!("missing sampling probability");
    }

    let (number, scale) = match input.strip_suffix('%') {
        Some(number) => (number.trim(), 100.0),
        None => (input, 1.0),
    };

    let value: f64 = number
        .parse()
        .map_err(|_| anyhow!("invalid sampling probability '{}'", input))?;
    let value = value / scale;

    if !(0.0..=1.0).contains(&value) {
        bail!("sampling probability must be between 0 and 1, got {}", input);
    }
    Ok(value)
}

/// One-line status summary
pub fn format_status(status: &SessionStatus) -> String {
    let mut line = format!(
        "{} {} | sample {}%",
        status.component_id,
        status.state,
        as_percent(status.committed_sample_rate)
    );

    if status.adjusting {
        line.push_str(&format!(
            " (adjusting to {}%)",
            as_percent(status.pending_sample_rate)
        ));
    }
    if status.resume_pending {
        line.push_str(" | resuming");
    } else if status.loading {
        line.push_str(" | streaming");
    }

    line.push_str(&format!(
        " | buffered {} (received {}, evicted {}, dropped {})",
        status.buffered, status.total_received, status.evicted, status.dropped_in_flight
    ));

    if !status.filter.is_empty() {
        line.push_str(&format!(" | filter \"{}\"", status.filter));
    }
    if let Some(error) = &status.error {
        line.push_str(&format!(" | error: {}", error));
    }
    line
}

/// Tracks which notices were already printed
#[derive(Debug)]
struct Notices {
    error: Option<String>,
    export: ExportOutcome,
}

impl Notices {
    fn from_status(status: &SessionStatus) -> Self {
        Self {
            error: status.error.clone(),
            export: status.export.clone(),
        }
    }

    /// Messages for anything that changed since the last call
    fn update(&mut self, status: &SessionStatus) -> Vec<String> {
        let mut out = Vec::new();

        if status.error != self.error {
            if let Some(error) = &status.error {
                out.push(format!("! {} (type 'resume' to retry)", error));
            }
            self.error = status.error.clone();
        }

        if status.export != self.export {
            match &status.export {
                ExportOutcome::Copied { records, bytes } => {
                    out.push(format!("copied {} records ({} bytes)", records, bytes));
                }
                ExportOutcome::Failed(message) => out.push(format!("! {}", message)),
                ExportOutcome::Idle => {}
            }
            self.export = status.export.clone();
        }

        out
    }
}

/// Run the console until `quit`, end of input, or Ctrl+C
pub async fn run(handle: &SessionHandle, initial_filter: Option<String>) -> Result<()> {
    let mut filter = RecordFilter::default();
    if let Some(pattern) = initial_filter {
        filter = RecordFilter::new(&pattern);
        handle.set_filter(pattern)?;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut records = handle.records();
    let mut status = handle.watch_status();
    let mut notices = Notices::from_status(&status.borrow_and_update());

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    debug!("stdin closed");
                    break;
                };
                match parse_command(&line) {
                    Ok(Some(ConsoleCommand::Quit)) => break,
                    Ok(Some(command)) => execute(handle, command, &mut filter).await?,
                    Ok(None) => {}
                    Err(e) => eprintln!("{}", e),
                }
            }
            record = records.recv() => match record {
                Ok(record) => {
                    if filter.matches(&record) {
                        println!("{}", record);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "output fell behind, records not printed");
                }
                Err(RecvError::Closed) => break,
            },
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = status.borrow_and_update().clone();
                for notice in notices.update(&current) {
                    println!("{}", notice);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                debug!("interrupted");
                break;
            }
        }
    }

    Ok(())
}

async fn execute(
    handle: &SessionHandle,
    command: ConsoleCommand,
    filter: &mut RecordFilter,
) -> Result<()> {
    match command {
        ConsoleCommand::Stop => handle.stop()?,
        ConsoleCommand::Resume => handle.resume()?,
        ConsoleCommand::Sample(rate) => {
            handle.set_pending_sample_rate(rate)?;
            handle.commit_sample_rate()?;
        }
        ConsoleCommand::Drag(rate) => handle.set_pending_sample_rate(rate)?,
        ConsoleCommand::Commit => handle.commit_sample_rate()?,
        ConsoleCommand::Filter(pattern) => {
            *filter = RecordFilter::new(&pattern);
            handle.set_filter(pattern)?;
        }
        ConsoleCommand::Clear => handle.clear()?,
        ConsoleCommand::Copy => handle.export()?,
        ConsoleCommand::Show => {
            for record in handle.visible().await? {
                println!("{}", record);
            }
        }
        ConsoleCommand::Status => println!("{}", format_status(&handle.status().await?)),
        ConsoleCommand::Help => {
            for (name, description) in COMMANDS {
                println!("  {:<16} {}", name, description);
            }
        }
        ConsoleCommand::Quit => {}
    }
    Ok(())
}

#[cfg(test)]
#[path = "console_test.rs"]
mod tests;
