//! In-process stream hub
//!
//! `StreamHub` is a provider for hosts that produce debug records in the same
//! process as the viewer. Producers call [`StreamHub::publish`] with a
//! component id; every live subscription for that component receives the
//! record, subject to its own sampling rate.
//!
//! The hub is a registry, not a server: it keeps no history and does no I/O.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::buffer::Record;
use crate::error::{Result, SessionError};
use crate::provider::{RecordSink, StreamProvider, SubscribeRequest, SubscriptionHandle};

/// Maximum number of concurrent subscriptions across all components
const MAX_SUBSCRIPTIONS: usize = 100;

/// One registered subscription
#[derive(Debug)]
struct HubSubscription {
    id: u64,
    sample_rate: f64,
    sink: RecordSink,
}

impl HubSubscription {
    /// Check if we should deliver based on sampling
    #[inline]
    fn should_sample(&self) -> bool {
        match self.sample_rate {
            rate if rate >= 1.0 => true,
            rate if rate <= 0.0 => false,
            rate => rand::random::<f64>() < rate,
        }
    }
}

/// Per-component fan-out of debug records
#[derive(Debug)]
pub struct StreamHub {
    /// Subscriptions keyed by component id
    streams: RwLock<HashMap<String, Vec<HubSubscription>>>,
    /// Next subscription id
    next_id: AtomicU64,
}

impl StreamHub {
    /// Create an empty hub
    pub fn new() -> Self {
        Self {
            streams: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Publish a record for a component
    ///
    /// Returns the number of subscriptions that received it. Subscriptions
    /// whose session has shut down are pruned.
    pub fn publish(&self, component_id: &str, text: &str) -> usize {
        let mut sent = 0;
        let mut saw_closed = false;

        {
            let streams = self.streams.read();
            let Some(subscriptions) = streams.get(component_id) else {
                return 0;
            };

            let record: Record = Record::from(text);
            for subscription in subscriptions {
                if !subscription.should_sample() {
                    continue;
                }
                if subscription.sink.deliver(Arc::clone(&record)) {
                    sent += 1;
                } else {
                    saw_closed = true;
                }
            }
        }

        if saw_closed {
            self.cleanup_closed();
        }

        if sent > 0 {
            trace!(component_id, sent, "published record");
        }
        sent
    }

    /// Number of live subscriptions for a component
    pub fn subscriber_count(&self, component_id: &str) -> usize {
        self.streams.read().get(component_id).map_or(0, Vec::len)
    }

    /// Check if anyone is listening to a component
    #[inline]
    pub fn has_subscribers(&self, component_id: &str) -> bool {
        self.subscriber_count(component_id) > 0
    }

    /// Number of live subscriptions across all components
    #[cfg(test)]
    pub(crate) fn total_subscribers(&self) -> usize {
        self.streams.read().values().map(Vec::len).sum()
    }

    /// Drop subscriptions whose session has gone away
    pub fn cleanup_closed(&self) -> usize {
        let mut streams = self.streams.write();
        let mut removed = 0;

        for subscriptions in streams.values_mut() {
            let before = subscriptions.len();
            subscriptions.retain(|s| !s.sink.is_closed());
            removed += before - subscriptions.len();
        }
        streams.retain(|_, subscriptions| !subscriptions.is_empty());

        if removed > 0 {
            debug!(removed, "cleaned up closed subscriptions");
        }
        removed
    }
}

impl Default for StreamHub {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StreamProvider for StreamHub {
    async fn subscribe(
        &self,
        request: &SubscribeRequest,
        sink: RecordSink,
    ) -> Result<SubscriptionHandle> {
        let mut streams = self.streams.write();

        let total: usize = streams.values().map(Vec::len).sum();
        if total >= MAX_SUBSCRIPTIONS {
            return Err(SessionError::MaxSubscriptions {
                max: MAX_SUBSCRIPTIONS,
            });
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        streams
            .entry(request.component_id.clone())
            .or_default()
            .push(HubSubscription {
                id,
                sample_rate: request.sample_rate,
                sink,
            });

        debug!(
            id,
            component_id = %request.component_id,
            sample_rate = request.sample_rate,
            "hub subscription added"
        );
        Ok(SubscriptionHandle::new(id))
    }

    async fn unsubscribe(&self, handle: SubscriptionHandle) -> Result<()> {
        let id = handle.id();
        let mut streams = self.streams.write();

        let mut found = false;
        for subscriptions in streams.values_mut() {
            let before = subscriptions.len();
            subscriptions.retain(|s| s.id != id);
            if subscriptions.len() != before {
                found = true;
                break;
            }
        }

        if !found {
            return Err(SessionError::SubscriptionNotFound { id });
        }

        streams.retain(|_, subscriptions| !subscriptions.is_empty());
        debug!(id, "hub subscription removed");
        Ok(())
    }
}

#[cfg(test)]
#[path = "hub_test.rs"]
mod tests;
