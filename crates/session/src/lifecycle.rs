//! Subscription lifecycle primitives
//!
//! - [`SessionState`]: whether the session wants a live subscription
//! - `DeferredResume`: the cancellable re-enable scheduled after a sampling
//!   commit
//! - `ProviderDriver`: a task that applies subscribe/unsubscribe operations
//!   to the provider strictly in issue order, so a teardown always completes
//!   before the next setup begins

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::controller::SessionEvent;
use crate::provider::{RecordSink, StreamProvider, SubscribeRequest, SubscriptionHandle};

/// Enabled/disabled state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No subscription; records are not accepted
    Disabled,
    /// Subscribed (or subscribing); records are appended
    Active,
}

impl SessionState {
    /// Check if the session is streaming
    #[inline]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Lowercase name for display
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Active => "active",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scheduled re-enable after the settling delay
///
/// Dropping it cancels the timer. The session also checks the id when the
/// timer fires, so a firing that raced a cancellation is ignored.
#[derive(Debug)]
pub(crate) struct DeferredResume {
    id: u64,
    cancel: CancellationToken,
}

impl DeferredResume {
    /// Schedule `SettleElapsed { id }` after `delay`
    pub(crate) fn schedule(
        id: u64,
        delay: Duration,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    trace!(id, "deferred resume cancelled");
                }
                _ = tokio::time::sleep(delay) => {
                    let _ = events.send(SessionEvent::SettleElapsed { id });
                }
            }
        });

        Self { id, cancel }
    }

    #[inline]
    pub(crate) fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for DeferredResume {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Operation queued for the provider
#[derive(Debug)]
pub(crate) enum ProviderOp {
    /// Establish the subscription for `generation`
    Subscribe {
        generation: u64,
        request: SubscribeRequest,
        sink: RecordSink,
    },
    /// Tear down the subscription for `generation`, if one was established
    Unsubscribe { generation: u64 },
}

/// Serializes provider calls and owns the provider-issued handles
pub(crate) struct ProviderDriver {
    provider: Arc<dyn StreamProvider>,
    events: mpsc::UnboundedSender<SessionEvent>,
    handles: HashMap<u64, SubscriptionHandle>,
}

impl ProviderDriver {
    /// Spawn the driver task
    ///
    /// The task runs until the returned sender is dropped, then tears down
    /// anything still subscribed.
    pub(crate) fn spawn(
        provider: Arc<dyn StreamProvider>,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> (mpsc::UnboundedSender<ProviderOp>, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let driver = Self {
            provider,
            events,
            handles: HashMap::new(),
        };
        let task = tokio::spawn(driver.run(rx));
        (tx, task)
    }

    async fn run(mut self, mut ops: mpsc::UnboundedReceiver<ProviderOp>) {
        while let Some(op) = ops.recv().await {
            match op {
                ProviderOp::Subscribe {
                    generation,
                    request,
                    sink,
                } => self.subscribe(generation, request, sink).await,
                ProviderOp::Unsubscribe { generation } => self.unsubscribe(generation).await,
            }
        }

        let remaining: Vec<u64> = self.handles.keys().copied().collect();
        for generation in remaining {
            self.unsubscribe(generation).await;
        }
        trace!("provider driver stopped");
    }

    async fn subscribe(&mut self, generation: u64, request: SubscribeRequest, sink: RecordSink) {
        let result = match self.provider.subscribe(&request, sink).await {
            Ok(handle) => {
                debug!(generation, handle = handle.id(), "provider subscribed");
                self.handles.insert(generation, handle);
                Ok(())
            }
            Err(e) => Err(e),
        };

        let _ = self
            .events
            .send(SessionEvent::Subscribed { generation, result });
    }

    async fn unsubscribe(&mut self, generation: u64) {
        let Some(handle) = self.handles.remove(&generation) else {
            trace!(generation, "nothing to unsubscribe");
            return;
        };

        // Best effort: the session has already moved on
        match self.provider.unsubscribe(handle).await {
            Ok(()) => debug!(generation, handle = handle.id(), "provider unsubscribed"),
            Err(e) => warn!(generation, error = %e, "unsubscribe failed, ignoring"),
        }
    }
}
