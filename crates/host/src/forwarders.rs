// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Forwarders: provider progress callbacks -> outbound protocol envelopes.
//!
//! Each dispatch arm that starts an operation builds a forwarder bound to the
//! engine; the provider reports progress through it from the job-queue worker
//! while the receive path keeps draining inbound frames.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::{debug, warn};

use tesh_wire::{
    AttachmentSet, TestCase, TestMessageLevel, TestOutcome, TestProcessStartInfo,
    TestRunChangedArgs, TestRunCompleteArgs,
};

use crate::error::HostError;
use crate::handler::RequestHandler;
use crate::provider::{DiscoveryEventsHandler, RunEventsHandler, TestCaseEventsHandler};

/// Forwards discovery progress to the orchestrator.
pub struct DiscoveryEventForwarder {
    handler: RequestHandler,
}

impl DiscoveryEventForwarder {
    pub fn new(handler: RequestHandler) -> Self {
        Self { handler }
    }
}

#[async_trait]
impl DiscoveryEventsHandler for DiscoveryEventForwarder {
    async fn handle_discovered_tests(&self, test_cases: Vec<TestCase>) {
        if let Err(e) = self.handler.send_test_cases(test_cases).await {
            warn!(error = %e, "failed to send discovered tests");
        }
    }

    async fn handle_discovery_complete(
        &self,
        total_tests: i64,
        last_chunk: Vec<TestCase>,
        aborted: bool,
        metrics: HashMap<String, serde_json::Value>,
    ) {
        if let Err(e) = self
            .handler
            .send_discovery_complete(total_tests, last_chunk, aborted, metrics)
            .await
        {
            warn!(error = %e, "failed to send discovery complete");
        }
    }

    async fn handle_log_message(&self, level: TestMessageLevel, message: &str) {
        if let Err(e) = self.handler.send_log(level, message).await {
            warn!(error = %e, "failed to send log message");
        }
    }
}

/// Forwards run progress to the orchestrator.
pub struct RunEventForwarder {
    handler: RequestHandler,
}

impl RunEventForwarder {
    pub fn new(handler: RequestHandler) -> Self {
        Self { handler }
    }
}

#[async_trait]
impl RunEventsHandler for RunEventForwarder {
    async fn handle_test_run_stats_change(&self, args: TestRunChangedArgs) {
        if let Err(e) = self.handler.send_test_run_stats(args).await {
            warn!(error = %e, "failed to send run statistics");
        }
    }

    async fn handle_test_run_complete(
        &self,
        args: TestRunCompleteArgs,
        last_chunk: Option<TestRunChangedArgs>,
        attachments: Vec<AttachmentSet>,
        executor_uris: Vec<String>,
    ) {
        if let Err(e) = self
            .handler
            .send_execution_complete(args, last_chunk, attachments, executor_uris)
            .await
        {
            warn!(error = %e, "failed to send execution complete");
        }
    }

    async fn handle_log_message(&self, level: TestMessageLevel, message: &str) {
        if let Err(e) = self.handler.send_log(level, message).await {
            warn!(error = %e, "failed to send log message");
        }
    }

    async fn launch_process_with_debugger_attached(
        &self,
        start_info: TestProcessStartInfo,
    ) -> Result<i32, HostError> {
        self.handler.launch_process_with_debugger_attached(start_info).await
    }
}

/// Sink for per-test events when data collection is enabled.
///
/// Data-collection plumbing lives outside the engine; this records the events
/// at debug level so collectors wired in later see a stable call surface.
#[derive(Default)]
pub struct TestCaseEventForwarder;

impl TestCaseEventsHandler for TestCaseEventForwarder {
    fn test_case_start(&self, test_case: &TestCase) {
        debug!(test = %test_case.fully_qualified_name, "test case started");
    }

    fn test_case_end(&self, test_case: &TestCase, outcome: TestOutcome) {
        debug!(test = %test_case.fully_qualified_name, ?outcome, "test case ended");
    }
}
