// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared harness: a fake orchestrator holding one end of the socket, and a
//! scripted operation provider that records what the engine asks of it.

pub use std::collections::HashMap;
pub use std::sync::Arc;
pub use std::time::Duration;

use async_trait::async_trait;
pub use parking_lot::Mutex;
use tokio::net::{TcpListener, TcpStream};
pub use tokio::sync::Notify;

pub use tesh_host::{
    ConnectionInfo, ConnectionRole, Diagnostics, DiscoveryEventsHandler, DiscoveryManager,
    ExecutionManager, HostError, OperationProvider, ProviderError, RequestHandler,
    RunEventsHandler, TestCaseEventsHandler, HIGHEST_SUPPORTED_VERSION,
};
pub use tesh_wire::{
    decode, deserialize_payload, encode, read_message, serialize_payload, write_message,
    DiscoveryCompletePayload, DiscoveryCriteria, Message, MessageType, TestCase, TestMessageLevel,
    TestMessagePayload, TestOutcome, TestProcessStartInfo, TestRunChangedArgs,
    TestRunCompleteArgs, TestRunCompletePayload, TestRunCriteriaWithSources,
    TestRunCriteriaWithTests, TestRunStats,
};

/// Upper bound for anything a spec waits on.
pub const SPEC_WAIT: Duration = Duration::from_secs(5);

/// Poll `condition` until it holds or [`SPEC_WAIT`] elapses.
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + SPEC_WAIT;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

/// Park the session on its own task so specs can keep driving the socket.
pub fn spawn_session(
    handler: &RequestHandler,
    provider: Arc<dyn OperationProvider>,
) -> tokio::task::JoinHandle<()> {
    let handler = handler.clone();
    tokio::spawn(async move { handler.process_requests(provider).await })
}

/// The orchestrator side of the session: owns the listening socket the
/// engine dials into, speaks raw framed envelopes.
pub struct Orchestrator {
    stream: TcpStream,
}

impl Orchestrator {
    /// Stand up a connected engine/orchestrator pair.
    pub async fn start() -> (RequestHandler, Self) {
        Self::start_with(Diagnostics::default()).await
    }

    pub async fn start_with(diagnostics: Diagnostics) -> (RequestHandler, Self) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handler = RequestHandler::with_diagnostics(
            ConnectionInfo::new(addr.to_string(), ConnectionRole::Client),
            diagnostics,
        );
        handler.initialize_communication();

        let (stream, _) = listener.accept().await.unwrap();
        assert!(handler.wait_for_connection(SPEC_WAIT).await.unwrap());
        (handler, Self { stream })
    }

    /// Run the version handshake at the engine's highest version.
    pub async fn handshake(&mut self) {
        self.send(MessageType::VersionCheck, &HIGHEST_SUPPORTED_VERSION).await;
        let reply = self.recv().await;
        assert_eq!(reply.message_type, MessageType::VersionCheck);
    }

    pub async fn send<T: serde::Serialize>(&mut self, message_type: MessageType, payload: &T) {
        let data = serialize_payload(message_type, payload, 1).unwrap();
        write_message(&mut self.stream, &data).await.unwrap();
    }

    /// Send an envelope with no payload.
    pub async fn send_control(&mut self, message_type: MessageType) {
        let message = Message { message_type, version: 1, payload: None };
        write_message(&mut self.stream, &encode(&message).unwrap()).await.unwrap();
    }

    /// Send raw bytes as one frame, bypassing envelope encoding.
    pub async fn send_raw(&mut self, data: &[u8]) {
        write_message(&mut self.stream, data).await.unwrap();
    }

    pub async fn recv(&mut self) -> Message {
        let frame = tokio::time::timeout(SPEC_WAIT, read_message(&mut self.stream))
            .await
            .unwrap()
            .unwrap();
        decode(&frame).unwrap()
    }

    /// True once the engine has closed its side of the connection.
    pub async fn engine_hung_up(&mut self) -> bool {
        tokio::time::timeout(SPEC_WAIT, read_message(&mut self.stream))
            .await
            .is_ok_and(|r| r.is_err())
    }
}

/// What the scripted provider was asked to do, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    DiscoveryInitialize,
    DiscoverTests,
    ExecutionInitialize,
    RunWithSources,
    RunWithTests,
    Cancel,
    Abort,
}

#[derive(Default)]
struct ScriptState {
    calls: Mutex<Vec<Call>>,
    hold: Mutex<Option<Arc<Notify>>>,
    launch_debugger: Mutex<bool>,
    attached_pids: Mutex<Vec<i32>>,
}

/// Provider whose runs report one passed test; behavior is adjusted per spec.
pub struct ScriptedProvider {
    state: Arc<ScriptState>,
}

impl ScriptedProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { state: Arc::default() })
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.calls.lock().clone()
    }

    /// Block subsequent runs until the returned gate is notified. `cancel`
    /// and `abort` release the gate themselves.
    pub fn hold_runs(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.state.hold.lock() = Some(Arc::clone(&gate));
        gate
    }

    /// Make runs request a debugger-attached launch before reporting results.
    pub fn request_debugger(&self) {
        *self.state.launch_debugger.lock() = true;
    }

    /// Process ids returned by the orchestrator for debugger launches.
    pub fn attached_pids(&self) -> Vec<i32> {
        self.state.attached_pids.lock().clone()
    }
}

impl OperationProvider for ScriptedProvider {
    fn discovery_manager(&self) -> Arc<dyn DiscoveryManager> {
        Arc::new(ScriptedManager { state: Arc::clone(&self.state) })
    }

    fn execution_manager(&self) -> Arc<dyn ExecutionManager> {
        Arc::new(ScriptedManager { state: Arc::clone(&self.state) })
    }
}

struct ScriptedManager {
    state: Arc<ScriptState>,
}

impl ScriptedManager {
    async fn run(&self, call: Call, events: Arc<dyn RunEventsHandler>) {
        self.state.calls.lock().push(call);

        let gate = self.state.hold.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if *self.state.launch_debugger.lock() {
            let pid = events
                .launch_process_with_debugger_attached(TestProcessStartInfo {
                    file_name: "testhost".to_string(),
                    ..TestProcessStartInfo::default()
                })
                .await
                .unwrap();
            self.state.attached_pids.lock().push(pid);
        }

        let stats = TestRunStats {
            executed_tests: 1,
            stats: HashMap::from([(TestOutcome::Passed, 1)]),
        };
        events
            .handle_test_run_stats_change(TestRunChangedArgs {
                test_run_statistics: stats.clone(),
                ..TestRunChangedArgs::default()
            })
            .await;
        events
            .handle_test_run_complete(
                TestRunCompleteArgs {
                    test_run_statistics: stats,
                    ..TestRunCompleteArgs::default()
                },
                None,
                Vec::new(),
                Vec::new(),
            )
            .await;
    }
}

#[async_trait]
impl DiscoveryManager for ScriptedManager {
    async fn initialize(&self, _extensions: Vec<String>) -> Result<(), ProviderError> {
        self.state.calls.lock().push(Call::DiscoveryInitialize);
        Ok(())
    }

    async fn discover_tests(
        &self,
        criteria: DiscoveryCriteria,
        events: Arc<dyn DiscoveryEventsHandler>,
    ) -> Result<(), ProviderError> {
        self.state.calls.lock().push(Call::DiscoverTests);

        let cases: Vec<TestCase> = criteria.sources.iter().map(|s| test_case(s)).collect();
        let total = cases.len() as i64;
        events.handle_discovered_tests(cases).await;
        events.handle_discovery_complete(total, Vec::new(), false, HashMap::new()).await;
        Ok(())
    }
}

#[async_trait]
impl ExecutionManager for ScriptedManager {
    async fn initialize(&self, _extensions: Vec<String>) -> Result<(), ProviderError> {
        self.state.calls.lock().push(Call::ExecutionInitialize);
        Ok(())
    }

    async fn run_tests_with_sources(
        &self,
        _criteria: TestRunCriteriaWithSources,
        _test_case_events: Option<Arc<dyn TestCaseEventsHandler>>,
        events: Arc<dyn RunEventsHandler>,
    ) -> Result<(), ProviderError> {
        self.run(Call::RunWithSources, events).await;
        Ok(())
    }

    async fn run_tests_with_tests(
        &self,
        _criteria: TestRunCriteriaWithTests,
        _test_case_events: Option<Arc<dyn TestCaseEventsHandler>>,
        events: Arc<dyn RunEventsHandler>,
    ) -> Result<(), ProviderError> {
        self.run(Call::RunWithTests, events).await;
        Ok(())
    }

    async fn cancel(&self, _events: Arc<dyn RunEventsHandler>) {
        self.state.calls.lock().push(Call::Cancel);
        if let Some(gate) = self.state.hold.lock().clone() {
            gate.notify_one();
        }
    }

    async fn abort(&self, _events: Arc<dyn RunEventsHandler>) {
        self.state.calls.lock().push(Call::Abort);
        if let Some(gate) = self.state.hold.lock().clone() {
            gate.notify_one();
        }
    }
}

/// One test case per source file, deterministically named.
pub fn test_case(source: &str) -> TestCase {
    TestCase {
        id: format!("{source}::test_one"),
        fully_qualified_name: format!("{source}::test_one"),
        display_name: "test_one".to_string(),
        executor_uri: "executor://scripted/v1".to_string(),
        source: source.to_string(),
    }
}
