//! Error types for the session crate

use std::io;
use thiserror::Error;

/// Errors that can occur in a stream session
#[derive(Error, Debug)]
pub enum SessionError {
    /// The provider failed to establish or maintain a subscription
    #[error("subscription failed: {0}")]
    Subscription(String),

    /// Writing the export to the clipboard failed
    #[error("export failed: {0}")]
    Export(String),

    /// Protocol error (malformed frames)
    #[error("protocol error: {0}")]
    Protocol(String),

    /// I/O error (socket operations)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Maximum subscriptions reached
    #[error("maximum subscriptions reached ({max})")]
    MaxSubscriptions { max: usize },

    /// Subscription not found
    #[error("subscription not found: {id}")]
    SubscriptionNotFound { id: u64 },

    /// The session controller is no longer running
    #[error("session controller stopped")]
    ChannelClosed,
}

/// Result type for session operations
pub type Result<T> = std::result::Result<T, SessionError>;
