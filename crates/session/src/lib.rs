//! Livedebug Session - Live debug stream viewer controller
//!
//! This crate holds everything between a stream provider and a screen that
//! shows a component's live debug records:
//!
//! - A single-task controller that owns the session state and turns user
//!   commands and provider callbacks into subscribe/unsubscribe calls
//! - A bounded record buffer with drop-oldest eviction
//! - A debounced sampling control: committing a new probability pauses the
//!   stream and re-subscribes after a settling delay
//! - A case-insensitive filter view and full-buffer clipboard export
//! - Providers: an in-process [`StreamHub`] and a Unix-socket client
//!
//! # Architecture
//!
//! ```text
//! SessionHandle (commands, queries)
//!     │
//!     ▼
//! SessionController ◄──────── records, failures, timers, export results
//!     │        │                         ▲
//!     │        └──→ RecordBuffer ──→ visible(filter) / export
//!     ▼                                  │
//! ProviderDriver (FIFO subscribe/unsubscribe)
//!     │                                  │
//!     ▼                                  │
//! StreamProvider ──→ RecordSink ─────────┘
//! ```

pub mod buffer;
pub mod controller;
mod error;
pub mod export;
pub mod filter;
pub mod lifecycle;
pub mod provider;
pub mod sampling;

#[cfg(test)]
mod test_utils;

pub use buffer::{Record, RecordBuffer};
pub use controller::{SessionController, SessionHandle, SessionStatus};
pub use error::{Result, SessionError};
pub use export::{ClipboardSink, ExportOutcome, export_text};
pub use filter::{RecordFilter, visible};
pub use lifecycle::SessionState;
pub use provider::hub::StreamHub;
#[cfg(unix)]
pub use provider::socket::SocketProvider;
pub use provider::{RecordSink, StreamProvider, SubscribeRequest, SubscriptionHandle};
pub use sampling::{Sampling, as_percent, clamp_probability};
