//! Subcommands

pub mod clipboard;
pub mod console;
pub mod demo;
#[cfg(unix)]
pub mod watch;
