//! Scripted provider and clipboard for controller tests

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{Result, SessionError};
use crate::export::ClipboardSink;
use crate::provider::{RecordSink, StreamProvider, SubscribeRequest, SubscriptionHandle};

/// Provider call as observed by the mock
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderCall {
    Subscribe { component_id: String, sample_rate: f64 },
    Unsubscribe { id: u64 },
}

#[derive(Debug, Default)]
struct MockState {
    calls: Vec<ProviderCall>,
    /// Every sink ever handed out, in subscribe order
    sinks: Vec<(u64, RecordSink)>,
    /// Handles not yet unsubscribed
    live: Vec<u64>,
    max_live: usize,
}

/// Provider that records every call and lets tests push records
#[derive(Debug, Default)]
pub struct MockProvider {
    state: Mutex<MockState>,
    next_id: AtomicU64,
    fail_next_subscribe: AtomicBool,
    fail_unsubscribes: AtomicBool,
    /// Simulated provider latency for both operations
    latency: Mutex<Option<Duration>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(self, latency: Duration) -> Self {
        *self.latency.lock() = Some(latency);
        self
    }

    pub fn fail_next_subscribe(&self) {
        self.fail_next_subscribe.store(true, Ordering::SeqCst);
    }

    pub fn fail_unsubscribes(&self) {
        self.fail_unsubscribes.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        self.state.lock().calls.clone()
    }

    pub fn subscribe_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, ProviderCall::Subscribe { .. }))
            .count()
    }

    pub fn unsubscribe_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, ProviderCall::Unsubscribe { .. }))
            .count()
    }

    pub fn live_count(&self) -> usize {
        self.state.lock().live.len()
    }

    pub fn max_live(&self) -> usize {
        self.state.lock().max_live
    }

    /// Sink of the `n`th successful subscription (0-based)
    pub fn sink(&self, n: usize) -> RecordSink {
        self.state.lock().sinks[n].1.clone()
    }

    /// Deliver a record through the most recent live subscription
    pub fn emit(&self, text: &str) -> bool {
        let state = self.state.lock();
        let Some(&id) = state.live.last() else {
            return false;
        };
        state
            .sinks
            .iter()
            .find(|(sink_id, _)| *sink_id == id)
            .map(|(_, sink)| sink.deliver(text))
            .unwrap_or(false)
    }

    async fn delay(&self) {
        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl StreamProvider for MockProvider {
    async fn subscribe(
        &self,
        request: &SubscribeRequest,
        sink: RecordSink,
    ) -> Result<SubscriptionHandle> {
        self.delay().await;

        let mut state = self.state.lock();
        state.calls.push(ProviderCall::Subscribe {
            component_id: request.component_id.clone(),
            sample_rate: request.sample_rate,
        });

        if self.fail_next_subscribe.swap(false, Ordering::SeqCst) {
            return Err(SessionError::Subscription("component not found".into()));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        state.sinks.push((id, sink));
        state.live.push(id);
        state.max_live = state.max_live.max(state.live.len());
        Ok(SubscriptionHandle::new(id))
    }

    async fn unsubscribe(&self, handle: SubscriptionHandle) -> Result<()> {
        self.delay().await;

        let mut state = self.state.lock();
        state.calls.push(ProviderCall::Unsubscribe { id: handle.id() });
        state.live.retain(|id| *id != handle.id());

        if self.fail_unsubscribes.load(Ordering::SeqCst) {
            return Err(SessionError::Subscription("provider unavailable".into()));
        }
        Ok(())
    }
}

/// Clipboard that keeps the last written text
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    contents: Mutex<Option<String>>,
    fail: AtomicBool,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let clipboard = Self::default();
        clipboard.fail.store(true, Ordering::SeqCst);
        clipboard
    }

    pub fn contents(&self) -> Option<String> {
        self.contents.lock().clone()
    }
}

#[async_trait]
impl ClipboardSink for MemoryClipboard {
    async fn write(&self, text: String) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(SessionError::Export("clipboard unavailable".into()));
        }
        *self.contents.lock() = Some(text);
        Ok(())
    }
}
