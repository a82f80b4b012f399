//! Stream provider interface
//!
//! A provider owns the transport: it establishes a subscription for one
//! component at one sampling probability and pushes records into the
//! `RecordSink` it was given until it is unsubscribed. The parameters of a
//! subscription never change; a new probability means a new subscription.
//!
//! Implementations:
//! - [`StreamHub`](hub::StreamHub): in-process fan-out registry
//! - [`SocketProvider`](socket::SocketProvider): Unix socket client (Unix only)

pub mod hub;
#[cfg(unix)]
pub mod protocol;
#[cfg(unix)]
pub mod socket;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::buffer::Record;
use crate::controller::SessionEvent;
use crate::error::Result;
use crate::sampling::clamp_probability;

/// Parameters of one subscription
#[derive(Debug, Clone, PartialEq)]
pub struct SubscribeRequest {
    /// Upstream component to stream from
    pub component_id: String,
    /// Fraction of records the provider should retain (0.0 - 1.0)
    pub sample_rate: f64,
}

impl SubscribeRequest {
    /// Subscribe to every record of a component
    pub fn new(component_id: impl Into<String>) -> Self {
        Self {
            component_id: component_id.into(),
            sample_rate: 1.0,
        }
    }

    /// Set sampling rate (clamped to [0, 1]; NaN keeps the current rate)
    pub fn with_sample_rate(mut self, rate: f64) -> Self {
        if let Some(rate) = clamp_probability(rate) {
            self.sample_rate = rate;
        }
        self
    }
}

/// Opaque provider-issued subscription identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(u64);

impl SubscriptionHandle {
    /// Wrap a provider-specific id
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the id
    #[inline]
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Delivery callback for one subscription
///
/// Every sink is tagged with the generation of the subscription it belongs
/// to, so the session can discard records that arrive after it moved on.
#[derive(Debug, Clone)]
pub struct RecordSink {
    generation: u64,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl RecordSink {
    pub(crate) fn new(generation: u64, events: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self { generation, events }
    }

    /// Generation of the subscription this sink feeds
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Deliver one record
    ///
    /// Returns false if the session is gone and the provider should stop.
    #[inline]
    pub fn deliver(&self, record: impl Into<Record>) -> bool {
        self.events
            .send(SessionEvent::Record {
                generation: self.generation,
                record: record.into(),
            })
            .is_ok()
    }

    /// Report that an established subscription died
    pub fn fail(&self, message: impl Into<String>) {
        let _ = self.events.send(SessionEvent::StreamFailed {
            generation: self.generation,
            message: message.into(),
        });
    }

    /// Check if the receiving session has shut down
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.events.is_closed()
    }
}

/// Source of live records
#[async_trait]
pub trait StreamProvider: Send + Sync + 'static {
    /// Start streaming `request.component_id` into `sink`
    async fn subscribe(
        &self,
        request: &SubscribeRequest,
        sink: RecordSink,
    ) -> Result<SubscriptionHandle>;

    /// Stop a subscription; records may still trickle in briefly afterwards
    async fn unsubscribe(&self, handle: SubscriptionHandle) -> Result<()>;
}
