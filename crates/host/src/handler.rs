// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The protocol engine: handshake, dispatch, outbound senders, ack
//! correlation, and session lifecycle.
//!
//! State is implicit in three one-shot signals (connected, provider-ready,
//! session-completed) plus whether `SessionEnd` has been seen; transitions
//! are driven entirely by inbound envelopes.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use tesh_wire::{
    data_collection_enabled, deserialize_payload, in_proc_data_collection_enabled,
    serialize_payload, AttachmentSet, DiscoveryCompletePayload, DiscoveryCriteria, Message,
    MessageType, TestCase, TestMessageLevel, TestMessagePayload, TestProcessStartInfo,
    TestRunChangedArgs, TestRunCompleteArgs, TestRunCompletePayload, TestRunCriteriaWithSources,
    TestRunCriteriaWithTests,
};

use crate::channel::Channel;
use crate::connection::{ConnectionInfo, Endpoint};
use crate::env;
use crate::error::HostError;
use crate::forwarders::{DiscoveryEventForwarder, RunEventForwarder, TestCaseEventForwarder};
use crate::provider::{
    DiscoveryEventsHandler, OperationProvider, RunEventsHandler, TestCaseEventsHandler,
};
use crate::queue::{JobFuture, JobQueue};
use crate::signal::Signal;

/// Highest protocol version this build can speak.
pub const HIGHEST_SUPPORTED_VERSION: i32 = 2;

/// Version used for envelopes sent before negotiation completes.
const DEFAULT_PROTOCOL_VERSION: i32 = 1;

/// Inbound frames buffered between the reader task and dispatch.
const INBOUND_QUEUE_CAPACITY: usize = 64;

/// Size hint for protocol jobs; the count bound is what matters for them.
const PROTOCOL_JOB_SIZE: u64 = 0;

/// Local diagnostics announced to the orchestrator right after the version
/// handshake, once the channel is known-good.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    /// Where this host writes its diagnostic log, if anywhere
    pub log_file: Option<PathBuf>,
    /// Warning raised during logger initialization, if any
    pub init_warning: Option<String>,
}

impl Diagnostics {
    pub fn from_env() -> Self {
        Self { log_file: env::diag_log_file(), init_warning: None }
    }
}

/// Engine for one orchestrator session. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct RequestHandler {
    inner: Arc<Inner>,
}

struct Inner {
    connection: ConnectionInfo,
    diagnostics: Diagnostics,
    /// Negotiated protocol version; written once by the handshake arm
    version: AtomicI32,
    connected: Signal,
    connect_fault: Mutex<Option<String>>,
    provider_ready: Signal,
    session_completed: Signal,
    /// Set exactly once by `process_requests`, read by dispatch afterwards
    provider: Mutex<Option<Arc<dyn OperationProvider>>>,
    /// Correlation slot for the single outstanding debugger-attach request
    ack: Mutex<Option<oneshot::Sender<Message>>>,
    channel: Mutex<Option<Channel>>,
    queue: JobQueue<JobFuture>,
}

impl RequestHandler {
    /// Build an engine for `connection`. Must be called on a tokio runtime
    /// (the job-queue worker is spawned here).
    pub fn new(connection: ConnectionInfo) -> Self {
        Self::with_diagnostics(connection, Diagnostics::from_env())
    }

    pub fn with_diagnostics(connection: ConnectionInfo, diagnostics: Diagnostics) -> Self {
        let queue = JobQueue::new(
            "test-host-operations",
            |job: JobFuture| job,
            env::queue_max_jobs(),
            env::queue_max_bytes(),
            |message| error!(%message, "queued operation failed"),
        );
        Self {
            inner: Arc::new(Inner {
                connection,
                diagnostics,
                version: AtomicI32::new(DEFAULT_PROTOCOL_VERSION),
                connected: Signal::new(),
                connect_fault: Mutex::new(None),
                provider_ready: Signal::new(),
                session_completed: Signal::new(),
                provider: Mutex::new(None),
                ack: Mutex::new(None),
                channel: Mutex::new(None),
                queue,
            }),
        }
    }

    /// Start the transport in the configured role and spawn the receive path.
    ///
    /// The connected signal fires exactly once whether the connection
    /// succeeds or fails; a failure is recorded and surfaced through
    /// [`RequestHandler::wait_for_connection`].
    pub fn initialize_communication(&self) {
        let this = self.clone();
        tokio::spawn(async move {
            let stream = async {
                let endpoint = Endpoint::start(&this.inner.connection).await?;
                endpoint.connect().await
            }
            .await;

            match stream {
                Ok(stream) => {
                    let (reader, writer) = stream.into_split();
                    let (channel, frames) = Channel::new(reader, writer, INBOUND_QUEUE_CAPACITY);
                    *this.inner.channel.lock() = Some(channel);
                    this.inner.connected.set();
                    this.receive_loop(frames).await;
                }
                Err(e) => {
                    warn!(error = %e, "failed to establish connection");
                    *this.inner.connect_fault.lock() = Some(e.to_string());
                    this.inner.connected.set();
                }
            }
        });
    }

    /// Wait up to `timeout` for the connection attempt to settle.
    ///
    /// `Ok(false)` means the attempt is still pending; a failed attempt comes
    /// back as `Err`.
    pub async fn wait_for_connection(&self, timeout: Duration) -> Result<bool, HostError> {
        if !self.inner.connected.wait_timeout(timeout).await {
            return Ok(false);
        }
        if let Some(fault) = self.inner.connect_fault.lock().clone() {
            return Err(HostError::Connection(fault));
        }
        Ok(true)
    }

    /// Supply the operation provider and block until the session ends.
    ///
    /// All real work happens on the receive path and the job-queue worker;
    /// this call just parks the caller for the session's duration.
    pub async fn process_requests(&self, provider: Arc<dyn OperationProvider>) {
        *self.inner.provider.lock() = Some(provider);
        self.inner.provider_ready.set();
        self.inner.session_completed.wait().await;
    }

    /// Idempotent teardown: stop the transport, drop the ack waiter, stop the
    /// queue worker after any in-flight job.
    pub async fn close(&self) {
        let channel = self.inner.channel.lock().take();
        if let Some(channel) = channel {
            channel.close().await;
            info!("closing the connection");
        }
        self.inner.ack.lock().take();
        self.inner.queue.shutdown();
    }

    /// Negotiated protocol version (1 until the handshake completes).
    pub fn protocol_version(&self) -> i32 {
        self.inner.version.load(Ordering::SeqCst)
    }

    async fn receive_loop(&self, mut frames: mpsc::Receiver<Vec<u8>>) {
        while let Some(frame) = frames.recv().await {
            match tesh_wire::decode(&frame) {
                Ok(message) => {
                    debug!(message_type = message.message_type.as_tag(), "received message");
                    self.handle_message(message).await;
                }
                Err(e) => warn!(error = %e, "failed to decode inbound envelope"),
            }
        }
        debug!("inbound frame stream ended");
    }

    /// Dispatch one inbound envelope. One arm per message type; decode
    /// failures and unknown tags are logged and skipped, never fatal.
    pub(crate) async fn handle_message(&self, message: Message) {
        match message.message_type.clone() {
            MessageType::VersionCheck => self.handle_version_check(&message).await,

            MessageType::DiscoveryInitialize => {
                info!("discovery session initialize");
                let Some(extensions) = decode_or_log::<Vec<String>>(&message) else { return };
                let Some(provider) = self.ready_provider().await else { return };
                let manager = provider.discovery_manager();
                self.submit_job(Box::pin(async move {
                    manager.initialize(extensions).await.map_err(|e| e.to_string())
                }))
                .await;
            }

            MessageType::StartDiscovery => {
                info!("discovery started");
                let Some(criteria) = decode_or_log::<DiscoveryCriteria>(&message) else { return };
                let Some(provider) = self.ready_provider().await else { return };
                let manager = provider.discovery_manager();
                let events: Arc<dyn DiscoveryEventsHandler> =
                    Arc::new(DiscoveryEventForwarder::new(self.clone()));
                self.submit_job(Box::pin(async move {
                    manager.discover_tests(criteria, events).await.map_err(|e| e.to_string())
                }))
                .await;
            }

            MessageType::ExecutionInitialize => {
                info!("execution session initialize");
                let Some(extensions) = decode_or_log::<Vec<String>>(&message) else { return };
                let Some(provider) = self.ready_provider().await else { return };
                let manager = provider.execution_manager();
                self.submit_job(Box::pin(async move {
                    manager.initialize(extensions).await.map_err(|e| e.to_string())
                }))
                .await;
            }

            MessageType::StartTestExecutionWithSources => {
                info!("execution started");
                let Some(criteria) = decode_or_log::<TestRunCriteriaWithSources>(&message) else {
                    return;
                };
                let Some(provider) = self.ready_provider().await else { return };
                let manager = provider.execution_manager();
                let events: Arc<dyn RunEventsHandler> =
                    Arc::new(RunEventForwarder::new(self.clone()));
                let test_case_events = test_case_events_handler(criteria.run_settings.as_deref());
                self.submit_job(Box::pin(async move {
                    manager
                        .run_tests_with_sources(criteria, test_case_events, events)
                        .await
                        .map_err(|e| e.to_string())
                }))
                .await;
            }

            MessageType::StartTestExecutionWithTests => {
                info!("execution started");
                let Some(criteria) = decode_or_log::<TestRunCriteriaWithTests>(&message) else {
                    return;
                };
                let Some(provider) = self.ready_provider().await else { return };
                let manager = provider.execution_manager();
                let events: Arc<dyn RunEventsHandler> =
                    Arc::new(RunEventForwarder::new(self.clone()));
                let test_case_events = test_case_events_handler(criteria.run_settings.as_deref());
                self.submit_job(Box::pin(async move {
                    manager
                        .run_tests_with_tests(criteria, test_case_events, events)
                        .await
                        .map_err(|e| e.to_string())
                }))
                .await;
            }

            MessageType::CancelTestRun => {
                // Bypass the queue so cancellation is not stuck behind backlog
                self.inner.queue.pause();
                let Some(provider) = self.ready_provider().await else { return };
                let events: Arc<dyn RunEventsHandler> =
                    Arc::new(RunEventForwarder::new(self.clone()));
                provider.execution_manager().cancel(events).await;
            }

            MessageType::AbortTestRun => {
                self.inner.queue.pause();
                let Some(provider) = self.ready_provider().await else { return };
                let events: Arc<dyn RunEventsHandler> =
                    Arc::new(RunEventForwarder::new(self.clone()));
                provider.execution_manager().abort(events).await;
            }

            MessageType::LaunchAdapterProcessWithDebuggerAttachedCallback => {
                let waiter = self.inner.ack.lock().take();
                match waiter {
                    Some(tx) => {
                        if tx.send(message).is_err() {
                            debug!("ack waiter abandoned before delivery");
                        }
                    }
                    None => debug!("debugger attach callback with no waiter registered"),
                }
            }

            MessageType::SessionEnd => {
                info!("session end received from orchestrator");
                self.inner.session_completed.set();
                self.close().await;
            }

            // Reserved by the protocol, nothing to do yet
            MessageType::SessionAbort => {}

            MessageType::Unknown(tag) => {
                info!(%tag, "ignoring unrecognized message type");
            }

            // Outbound-only tags arriving inbound are peer bugs; ignore them
            other => {
                warn!(message_type = other.as_tag(), "unexpected inbound message type");
            }
        }
    }

    async fn handle_version_check(&self, message: &Message) {
        let Some(proposed) = decode_or_log::<i32>(message) else { return };
        let negotiated = proposed.min(HIGHEST_SUPPORTED_VERSION);
        self.inner.version.store(negotiated, Ordering::SeqCst);
        info!(proposed, negotiated, "protocol version negotiated");

        if let Err(e) = self.send_payload(MessageType::VersionCheck, &negotiated).await {
            warn!(error = %e, "failed to send version check reply");
            return;
        }

        // Only now is the channel known-good for diagnostics
        let diag = &self.inner.diagnostics;
        let result = if let Some(log_file) = &diag.log_file {
            self.send_log(
                TestMessageLevel::Informational,
                &format!("Logging test-host diagnostics in file: {}", log_file.display()),
            )
            .await
        } else if let Some(init_warning) = &diag.init_warning {
            self.send_log(TestMessageLevel::Warning, init_warning).await
        } else {
            Ok(())
        };
        if let Err(e) = result {
            warn!(error = %e, "failed to send diagnostics log message");
        }
    }

    /// Send a batch of discovered test cases.
    pub async fn send_test_cases(&self, test_cases: Vec<TestCase>) -> Result<(), HostError> {
        self.send_payload(MessageType::TestCasesFound, &test_cases).await
    }

    /// Send incremental run statistics.
    pub async fn send_test_run_stats(&self, args: TestRunChangedArgs) -> Result<(), HostError> {
        self.send_payload(MessageType::TestRunStatsChange, &args).await
    }

    /// Relay a diagnostic message to the orchestrator.
    pub async fn send_log(
        &self,
        level: TestMessageLevel,
        message: &str,
    ) -> Result<(), HostError> {
        let payload = TestMessagePayload { message_level: level, message: message.to_string() };
        self.send_payload(MessageType::TestMessage, &payload).await
    }

    /// Send the final results of a run.
    pub async fn send_execution_complete(
        &self,
        args: TestRunCompleteArgs,
        last_chunk: Option<TestRunChangedArgs>,
        attachments: Vec<AttachmentSet>,
        executor_uris: Vec<String>,
    ) -> Result<(), HostError> {
        let payload = TestRunCompletePayload {
            test_run_complete_args: args,
            last_run_tests: last_chunk,
            run_attachments: attachments,
            executor_uris,
        };
        self.send_payload(MessageType::ExecutionComplete, &payload).await
    }

    /// Send the final results of a discovery. The last chunk is dropped when
    /// the discovery was aborted.
    pub async fn send_discovery_complete(
        &self,
        total_tests: i64,
        last_chunk: Vec<TestCase>,
        aborted: bool,
        metrics: HashMap<String, serde_json::Value>,
    ) -> Result<(), HostError> {
        let payload = DiscoveryCompletePayload {
            total_tests,
            last_discovered_tests: if aborted { None } else { Some(last_chunk) },
            is_aborted: aborted,
            metrics,
        };
        self.send_payload(MessageType::DiscoveryComplete, &payload).await
    }

    /// Out-of-band synchronous exchange: send the launch request, then block
    /// until dispatch delivers the matching callback envelope. At most one
    /// request may be outstanding; a second registration replaces the first.
    ///
    /// No timeout is applied here; callers that need one can wrap this in
    /// `tokio::time::timeout` without changing the protocol.
    pub async fn launch_process_with_debugger_attached(
        &self,
        start_info: TestProcessStartInfo,
    ) -> Result<i32, HostError> {
        let (tx, rx) = oneshot::channel();
        {
            let mut slot = self.inner.ack.lock();
            if slot.is_some() {
                warn!("replacing an outstanding debugger attach waiter");
            }
            *slot = Some(tx);
        }

        self.send_payload(MessageType::LaunchAdapterProcessWithDebuggerAttached, &start_info)
            .await?;

        debug!("waiting for debugger attach ack");
        let ack = rx.await.map_err(|_| HostError::AckDropped)?;
        Ok(deserialize_payload::<i32>(&ack)?)
    }

    async fn send_payload<T: Serialize>(
        &self,
        message_type: MessageType,
        payload: &T,
    ) -> Result<(), HostError> {
        let version = self.protocol_version();
        let data = serialize_payload(message_type, payload, version)?;
        let channel = self.inner.channel.lock().clone().ok_or(HostError::NotConnected)?;
        channel.send(&data).await
    }

    async fn submit_job(&self, job: JobFuture) {
        self.inner.queue.submit(job, PROTOCOL_JOB_SIZE).await;
    }

    /// Wait for the provider, then fetch it. `None` only if the ready signal
    /// fired without a provider, which dispatch treats as a dropped message.
    async fn ready_provider(&self) -> Option<Arc<dyn OperationProvider>> {
        self.inner.provider_ready.wait().await;
        let provider = self.inner.provider.lock().clone();
        if provider.is_none() {
            warn!("provider ready signal fired without a provider");
        }
        provider
    }
}

/// Per-test events are only observed when the run settings enable data
/// collection (out-of-process or in-process).
fn test_case_events_handler(
    run_settings: Option<&str>,
) -> Option<Arc<dyn TestCaseEventsHandler>> {
    let settings = run_settings.unwrap_or_default();
    if data_collection_enabled(settings) || in_proc_data_collection_enabled(settings) {
        Some(Arc::new(TestCaseEventForwarder))
    } else {
        None
    }
}

fn decode_or_log<T: serde::de::DeserializeOwned>(message: &Message) -> Option<T> {
    match deserialize_payload(message) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(
                message_type = message.message_type.as_tag(),
                error = %e,
                "failed to decode payload",
            );
            None
        }
    }
}

#[cfg(test)]
#[path = "handler_tests.rs"]
mod tests;
