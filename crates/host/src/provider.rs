// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operation-provider contracts.
//!
//! The engine never discovers or runs tests itself: it invokes these traits
//! from the job-queue worker (or directly, for cancel/abort) and forwards
//! their progress callbacks back over the wire.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use tesh_wire::{
    AttachmentSet, DiscoveryCriteria, TestCase, TestMessageLevel, TestOutcome,
    TestProcessStartInfo, TestRunChangedArgs, TestRunCompleteArgs, TestRunCriteriaWithSources,
    TestRunCriteriaWithTests,
};

use crate::error::{HostError, ProviderError};

/// Supplies the discovery and execution capabilities for a session.
pub trait OperationProvider: Send + Sync + 'static {
    fn discovery_manager(&self) -> Arc<dyn DiscoveryManager>;
    fn execution_manager(&self) -> Arc<dyn ExecutionManager>;
}

/// Receives discovery progress; implemented by the engine's forwarder.
#[async_trait]
pub trait DiscoveryEventsHandler: Send + Sync {
    /// A batch of discovered test cases.
    async fn handle_discovered_tests(&self, test_cases: Vec<TestCase>);

    /// Discovery finished. `last_chunk` is dropped on the wire when aborted.
    async fn handle_discovery_complete(
        &self,
        total_tests: i64,
        last_chunk: Vec<TestCase>,
        aborted: bool,
        metrics: HashMap<String, serde_json::Value>,
    );

    async fn handle_log_message(&self, level: TestMessageLevel, message: &str);
}

/// Receives run progress; implemented by the engine's forwarder.
#[async_trait]
pub trait RunEventsHandler: Send + Sync {
    async fn handle_test_run_stats_change(&self, args: TestRunChangedArgs);

    async fn handle_test_run_complete(
        &self,
        args: TestRunCompleteArgs,
        last_chunk: Option<TestRunChangedArgs>,
        attachments: Vec<AttachmentSet>,
        executor_uris: Vec<String>,
    );

    async fn handle_log_message(&self, level: TestMessageLevel, message: &str);

    /// Ask the orchestrator to launch a process with its debugger attached;
    /// resolves to the launched process id.
    async fn launch_process_with_debugger_attached(
        &self,
        start_info: TestProcessStartInfo,
    ) -> Result<i32, HostError>;
}

/// Per-test lifecycle events, consumed by data collection. Only handed to the
/// execution manager when the run settings enable a collector.
pub trait TestCaseEventsHandler: Send + Sync {
    fn test_case_start(&self, _test_case: &TestCase) {}
    fn test_case_end(&self, _test_case: &TestCase, _outcome: TestOutcome) {}
}

/// Discovery capability of the operation provider.
#[async_trait]
pub trait DiscoveryManager: Send + Sync {
    async fn initialize(&self, extensions: Vec<String>) -> Result<(), ProviderError>;

    async fn discover_tests(
        &self,
        criteria: DiscoveryCriteria,
        events: Arc<dyn DiscoveryEventsHandler>,
    ) -> Result<(), ProviderError>;
}

/// Execution capability of the operation provider.
#[async_trait]
pub trait ExecutionManager: Send + Sync {
    async fn initialize(&self, extensions: Vec<String>) -> Result<(), ProviderError>;

    async fn run_tests_with_sources(
        &self,
        criteria: TestRunCriteriaWithSources,
        test_case_events: Option<Arc<dyn TestCaseEventsHandler>>,
        events: Arc<dyn RunEventsHandler>,
    ) -> Result<(), ProviderError>;

    async fn run_tests_with_tests(
        &self,
        criteria: TestRunCriteriaWithTests,
        test_case_events: Option<Arc<dyn TestCaseEventsHandler>>,
        events: Arc<dyn RunEventsHandler>,
    ) -> Result<(), ProviderError>;

    /// Cooperative cancel: the provider decides how promptly the in-flight
    /// run stops.
    async fn cancel(&self, events: Arc<dyn RunEventsHandler>);

    /// Cooperative abort: like cancel but discards partial results.
    async fn abort(&self, events: Arc<dyn RunEventsHandler>);
}
