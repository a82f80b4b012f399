//! Stream session controller
//!
//! One `SessionController` serves one viewer of one component. It runs as a
//! single task that owns all session state and reacts to one event at a
//! time: user commands from a [`SessionHandle`], records and failures from
//! the provider, completion of provider calls, settling timers, and clipboard
//! results. Nothing else mutates the buffer or the lifecycle state.
//!
//! # Sampling restart
//!
//! ```text
//! commit(p') while Active
//!     │
//!     ├──→ Active → Disabled        unsubscribe(generation n)
//!     │
//!     │    settling delay (cancellable; Stop or Resume cancels it)
//!     │
//!     └──→ Disabled → Active        subscribe(component, p') as generation n+1
//! ```
//!
//! Records carry the generation of the subscription that produced them and
//! are only appended while that generation is the live one.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, trace, warn};

use livedebug_config::SessionConfig;

use crate::buffer::{Record, RecordBuffer};
use crate::error::{Result, SessionError};
use crate::export::{ClipboardSink, ExportOutcome, export_text};
use crate::filter::{RecordFilter, visible};
use crate::lifecycle::{DeferredResume, ProviderDriver, ProviderOp, SessionState};
use crate::provider::{RecordSink, StreamProvider, SubscribeRequest};
use crate::sampling::Sampling;

/// Capacity of the appended-record broadcast channel
const RECORD_CHANNEL_CAPACITY: usize = 1024;

/// User commands accepted by the controller
#[derive(Debug)]
pub(crate) enum Command {
    Resume,
    Stop,
    SetPending(f64),
    CommitSampling,
    SetFilter(String),
    Clear,
    Export,
    Snapshot(oneshot::Sender<Vec<Record>>),
    Visible(oneshot::Sender<Vec<Record>>),
    Status(oneshot::Sender<SessionStatus>),
    Shutdown,
}

/// Everything the controller reacts to, in one FIFO queue
///
/// Commands share the queue with records so a command is applied before any
/// record delivered after it was sent.
#[derive(Debug)]
pub(crate) enum SessionEvent {
    /// A command from a `SessionHandle`
    Command(Command),
    /// A record from the subscription of `generation`
    Record { generation: u64, record: Record },
    /// The subscription of `generation` died after being established
    StreamFailed { generation: u64, message: String },
    /// The provider finished subscribing `generation`
    Subscribed { generation: u64, result: Result<()> },
    /// The settling delay of deferred resume `id` elapsed
    SettleElapsed { id: u64 },
    /// A clipboard write finished
    ExportFinished {
        records: usize,
        bytes: usize,
        result: Result<()>,
    },
}

/// Read-only view of the session for the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStatus {
    /// Component being viewed
    pub component_id: Arc<str>,
    /// Lifecycle state
    pub state: SessionState,
    /// A sampling restart is waiting out its settling delay
    pub resume_pending: bool,
    /// Sampling probability in effect
    pub committed_sample_rate: f64,
    /// Sampling probability being adjusted
    pub pending_sample_rate: f64,
    /// The pending probability differs from the committed one
    pub adjusting: bool,
    /// A subscription is being established or is streaming
    pub loading: bool,
    /// Last subscription error, cleared on resume
    pub error: Option<String>,
    /// Active filter pattern
    pub filter: String,
    /// Records currently buffered
    pub buffered: usize,
    /// Records accepted since the session started
    pub total_received: u64,
    /// Records dropped by the buffer bound
    pub evicted: u64,
    /// Records discarded because their subscription was no longer live
    pub dropped_in_flight: u64,
    /// Outcome of the last export
    pub export: ExportOutcome,
}

/// Clonable handle used to drive and observe a session
#[derive(Debug, Clone)]
pub struct SessionHandle {
    events: mpsc::UnboundedSender<SessionEvent>,
    status: watch::Receiver<SessionStatus>,
    records: broadcast::Sender<Record>,
    /// Stops the controller once the last handle is dropped
    _alive: Arc<DropGuard>,
}

impl SessionHandle {
    fn send(&self, command: Command) -> Result<()> {
        self.events
            .send(SessionEvent::Command(command))
            .map_err(|_| SessionError::ChannelClosed)
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.send(make(tx))?;
        rx.await.map_err(|_| SessionError::ChannelClosed)
    }

    /// Start streaming if stopped
    pub fn resume(&self) -> Result<()> {
        self.send(Command::Resume)
    }

    /// Stop streaming if running; cancels a pending sampling restart
    pub fn stop(&self) -> Result<()> {
        self.send(Command::Stop)
    }

    /// Update the in-drag sampling probability
    pub fn set_pending_sample_rate(&self, rate: f64) -> Result<()> {
        self.send(Command::SetPending(rate))
    }

    /// Apply the pending sampling probability
    pub fn commit_sample_rate(&self) -> Result<()> {
        self.send(Command::CommitSampling)
    }

    /// Replace the display filter (empty shows everything)
    pub fn set_filter(&self, pattern: impl Into<String>) -> Result<()> {
        self.send(Command::SetFilter(pattern.into()))
    }

    /// Drop every buffered record
    pub fn clear(&self) -> Result<()> {
        self.send(Command::Clear)
    }

    /// Copy the full buffer to the clipboard
    ///
    /// Completion is reported through [`SessionStatus::export`].
    pub fn export(&self) -> Result<()> {
        self.send(Command::Export)
    }

    /// Copy of the buffer
    pub async fn snapshot(&self) -> Result<Vec<Record>> {
        self.request(Command::Snapshot).await
    }

    /// Buffered records that pass the current filter
    pub async fn visible(&self) -> Result<Vec<Record>> {
        self.request(Command::Visible).await
    }

    /// Status after every previously sent command has been applied
    pub async fn status(&self) -> Result<SessionStatus> {
        self.request(Command::Status).await
    }

    /// Most recently published status
    pub fn current_status(&self) -> SessionStatus {
        self.status.borrow().clone()
    }

    /// Watch status changes
    pub fn watch_status(&self) -> watch::Receiver<SessionStatus> {
        self.status.clone()
    }

    /// Stream of records as they are appended
    pub fn records(&self) -> broadcast::Receiver<Record> {
        self.records.subscribe()
    }

    /// Stop the controller; its subscription is torn down
    pub fn shutdown(&self) -> Result<()> {
        self.send(Command::Shutdown)
    }
}

/// The session state machine
pub struct SessionController {
    component_id: Arc<str>,
    config: SessionConfig,
    state: SessionState,
    sampling: Sampling,
    buffer: RecordBuffer,
    filter: RecordFilter,
    /// Generation of the subscription records are accepted from
    live: Option<u64>,
    /// Last generation handed out
    generation: u64,
    pending_resume: Option<DeferredResume>,
    next_resume_id: u64,
    loading: bool,
    error: Option<String>,
    export: ExportOutcome,
    dropped_in_flight: u64,
    clipboard: Arc<dyn ClipboardSink>,
    provider_ops: mpsc::UnboundedSender<ProviderOp>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    status_tx: watch::Sender<SessionStatus>,
    records_tx: broadcast::Sender<Record>,
}

impl SessionController {
    /// Spawn a controller for `component_id`
    ///
    /// Returns the handle and the controller task. If the config says so,
    /// the session subscribes immediately.
    pub fn spawn(
        component_id: impl Into<String>,
        provider: Arc<dyn StreamProvider>,
        clipboard: Arc<dyn ClipboardSink>,
        config: SessionConfig,
    ) -> (SessionHandle, JoinHandle<()>) {
        let component_id: Arc<str> = Arc::from(component_id.into());
        let handles_dropped = CancellationToken::new();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (records_tx, _) = broadcast::channel(RECORD_CHANNEL_CAPACITY);
        let (provider_ops, driver) = ProviderDriver::spawn(provider, events_tx.clone());

        let sampling = Sampling::new(config.sample_rate);
        let buffer = RecordBuffer::with_capacity(config.buffer_capacity);
        let (status_tx, status_rx) = watch::channel(SessionStatus {
            component_id: Arc::clone(&component_id),
            state: SessionState::Disabled,
            resume_pending: false,
            committed_sample_rate: sampling.committed(),
            pending_sample_rate: sampling.pending(),
            adjusting: sampling.is_adjusting(),
            loading: false,
            error: None,
            filter: String::new(),
            buffered: 0,
            total_received: 0,
            evicted: 0,
            dropped_in_flight: 0,
            export: ExportOutcome::Idle,
        });

        let controller = Self {
            component_id,
            config,
            state: SessionState::Disabled,
            sampling,
            buffer,
            filter: RecordFilter::default(),
            live: None,
            generation: 0,
            pending_resume: None,
            next_resume_id: 0,
            loading: false,
            error: None,
            export: ExportOutcome::Idle,
            dropped_in_flight: 0,
            clipboard,
            provider_ops,
            events_tx,
            status_tx,
            records_tx: records_tx.clone(),
        };

        let handle = SessionHandle {
            events: controller.events_tx.clone(),
            status: status_rx,
            records: records_tx,
            _alive: Arc::new(handles_dropped.clone().drop_guard()),
        };

        let task = tokio::spawn(async move {
            controller.run(events_rx, handles_dropped).await;
            // Dropping the controller closes the op queue; wait for the
            // driver to finish tearing down.
            let _ = driver.await;
        });

        (handle, task)
    }

    async fn run(
        mut self,
        mut events: mpsc::UnboundedReceiver<SessionEvent>,
        handles_dropped: CancellationToken,
    ) {
        info!(
            component_id = %self.component_id,
            sample_rate = self.sampling.committed(),
            buffer_capacity = self.buffer.capacity(),
            "session started"
        );

        if self.config.start_enabled {
            self.activate("start");
        }
        self.publish_status();

        loop {
            tokio::select! {
                biased;

                Some(event) = events.recv() => match event {
                    SessionEvent::Command(Command::Shutdown) => break,
                    SessionEvent::Command(command) => self.handle_command(command),
                    event => self.handle_event(event),
                },
                _ = handles_dropped.cancelled() => {
                    debug!("all session handles dropped");
                    break;
                }
            }
            self.publish_status();
        }

        self.pending_resume = None;
        self.deactivate("shutdown");
        self.publish_status();
        info!(component_id = %self.component_id, "session stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Resume => {
                self.cancel_pending_resume();
                self.activate("resume");
            }
            Command::Stop => {
                self.cancel_pending_resume();
                self.deactivate("stop");
            }
            Command::SetPending(rate) => {
                if self.sampling.set_pending(rate).is_none() {
                    warn!(rate, "ignoring invalid sampling probability");
                }
            }
            Command::CommitSampling => self.commit_sampling(),
            Command::SetFilter(pattern) => {
                debug!(filter = %pattern, "filter changed");
                self.filter = RecordFilter::new(&pattern);
            }
            Command::Clear => {
                let cleared = self.buffer.clear();
                debug!(cleared, "buffer cleared");
            }
            Command::Export => self.export(),
            Command::Snapshot(reply) => {
                let _ = reply.send(self.buffer.snapshot());
            }
            Command::Visible(reply) => {
                let _ = reply.send(visible(self.buffer.iter(), &self.filter));
            }
            Command::Status(reply) => {
                let _ = reply.send(self.status());
            }
            Command::Shutdown => {}
        }
    }

    fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Command(command) => self.handle_command(command),
            SessionEvent::Record { generation, record } => self.append(generation, record),
            SessionEvent::StreamFailed {
                generation,
                message,
            } => {
                if self.live != Some(generation) {
                    debug!(generation, "ignoring failure of retired subscription");
                    return;
                }
                warn!(generation, error = %message, "subscription lost");
                self.fail(SessionError::Subscription(message).to_string());
                self.send_op(ProviderOp::Unsubscribe { generation });
            }
            SessionEvent::Subscribed { generation, result } => match result {
                Ok(()) if self.live == Some(generation) => {
                    debug!(generation, "subscription live");
                }
                Ok(()) => {
                    trace!(generation, "retired subscription came up, teardown queued");
                }
                Err(e) if self.live == Some(generation) => {
                    warn!(generation, error = %e, "subscribe failed");
                    self.fail(e.to_string());
                }
                Err(e) => {
                    debug!(generation, error = %e, "retired subscription failed");
                }
            },
            SessionEvent::SettleElapsed { id } => {
                if self.pending_resume.as_ref().map(DeferredResume::id) != Some(id) {
                    trace!(id, "stale settle timer");
                    return;
                }
                self.pending_resume = None;
                self.activate("sampling");
            }
            SessionEvent::ExportFinished {
                records,
                bytes,
                result,
            } => match result {
                Ok(()) => {
                    info!(records, bytes, "buffer copied to clipboard");
                    self.export = ExportOutcome::Copied { records, bytes };
                }
                Err(e) => {
                    warn!(error = %e, "failed to copy buffer to clipboard");
                    self.export = ExportOutcome::Failed(e.to_string());
                }
            },
        }
    }

    /// Disabled → Active
    fn activate(&mut self, reason: &'static str) {
        if self.state.is_active() {
            debug!(reason, "already active");
            return;
        }

        self.generation += 1;
        let generation = self.generation;
        self.state = SessionState::Active;
        self.live = Some(generation);
        self.loading = true;
        self.error = None;

        let request = SubscribeRequest::new(self.component_id.as_ref())
            .with_sample_rate(self.sampling.committed());
        info!(
            component_id = %self.component_id,
            generation,
            sample_rate = request.sample_rate,
            reason,
            "subscribing"
        );

        let sink = RecordSink::new(generation, self.events_tx.clone());
        self.send_op(ProviderOp::Subscribe {
            generation,
            request,
            sink,
        });
    }

    /// Active → Disabled
    fn deactivate(&mut self, reason: &'static str) {
        if !self.state.is_active() {
            debug!(reason, "already disabled");
            return;
        }

        self.state = SessionState::Disabled;
        self.loading = false;

        if let Some(generation) = self.live.take() {
            info!(component_id = %self.component_id, generation, reason, "unsubscribing");
            self.send_op(ProviderOp::Unsubscribe { generation });
        }
    }

    /// The live subscription failed; stay disabled until the user resumes
    fn fail(&mut self, message: String) {
        self.state = SessionState::Disabled;
        self.live = None;
        self.loading = false;
        self.error = Some(message);
    }

    fn commit_sampling(&mut self) {
        let Some(rate) = self.sampling.commit() else {
            debug!("sampling unchanged");
            return;
        };
        info!(sample_rate = rate, "sampling probability committed");

        if self.state.is_active() {
            self.deactivate("sampling");
            self.schedule_resume();
        } else if self.pending_resume.is_some() {
            // Restart the settling delay; the resume reads the latest rate
            self.schedule_resume();
        } else {
            debug!("session disabled, new rate applies on resume");
        }
    }

    fn schedule_resume(&mut self) {
        self.next_resume_id += 1;
        let id = self.next_resume_id;
        // Replacing the previous resume drops (and cancels) it
        self.pending_resume = Some(DeferredResume::schedule(
            id,
            self.config.settling_delay,
            self.events_tx.clone(),
        ));
        debug!(
            id,
            delay_ms = self.config.settling_delay.as_millis() as u64,
            "resume scheduled"
        );
    }

    fn cancel_pending_resume(&mut self) {
        if let Some(resume) = self.pending_resume.take() {
            debug!(id = resume.id(), "pending resume cancelled");
        }
    }

    fn append(&mut self, generation: u64, record: Record) {
        if !self.state.is_active() || self.live != Some(generation) {
            self.dropped_in_flight += 1;
            trace!(generation, "discarding record from retired subscription");
            return;
        }

        self.buffer.append(Arc::clone(&record));
        // No receivers is fine
        let _ = self.records_tx.send(record);
    }

    fn export(&mut self) {
        let records = self.buffer.len();
        let text = export_text(self.buffer.iter());
        let bytes = text.len();
        let clipboard = Arc::clone(&self.clipboard);
        let events = self.events_tx.clone();

        debug!(records, bytes, "exporting buffer");
        tokio::spawn(async move {
            let result = clipboard.write(text).await;
            let _ = events.send(SessionEvent::ExportFinished {
                records,
                bytes,
                result,
            });
        });
    }

    fn send_op(&self, op: ProviderOp) {
        if self.provider_ops.send(op).is_err() {
            warn!("provider driver stopped, dropping operation");
        }
    }

    fn status(&self) -> SessionStatus {
        SessionStatus {
            component_id: Arc::clone(&self.component_id),
            state: self.state,
            resume_pending: self.pending_resume.is_some(),
            committed_sample_rate: self.sampling.committed(),
            pending_sample_rate: self.sampling.pending(),
            adjusting: self.sampling.is_adjusting(),
            loading: self.loading,
            error: self.error.clone(),
            filter: self.filter.pattern().to_string(),
            buffered: self.buffer.len(),
            total_received: self.buffer.total_appended(),
            evicted: self.buffer.evicted(),
            dropped_in_flight: self.dropped_in_flight,
            export: self.export.clone(),
        }
    }

    fn publish_status(&self) {
        let status = self.status();
        self.status_tx.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
    }
}

#[cfg(test)]
#[path = "controller_test.rs"]
mod tests;
