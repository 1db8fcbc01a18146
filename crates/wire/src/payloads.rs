// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed payloads for each message tag.
//!
//! Field names serialize PascalCase to match the orchestrator's wire format.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Severity of a diagnostic message relayed to the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestMessageLevel {
    Informational,
    Warning,
    Error,
}

/// A single discovered test case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TestCase {
    pub id: String,
    pub fully_qualified_name: String,
    pub display_name: String,
    pub executor_uri: String,
    pub source: String,
}

/// Outcome of an executed test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TestOutcome {
    None,
    Passed,
    Failed,
    Skipped,
    NotFound,
}

/// Result of a single executed test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TestResult {
    pub test_case: TestCase,
    pub outcome: TestOutcome,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Aggregate counters for a run, keyed by outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TestRunStats {
    pub executed_tests: u64,
    #[serde(default)]
    pub stats: HashMap<TestOutcome, u64>,
}

/// Incremental run progress: new results since the last batch plus totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TestRunChangedArgs {
    #[serde(default)]
    pub new_test_results: Vec<TestResult>,
    #[serde(default)]
    pub test_run_statistics: TestRunStats,
    #[serde(default)]
    pub active_tests: Vec<TestCase>,
}

/// A named group of files attached to run results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AttachmentSet {
    pub uri: String,
    pub display_name: String,
    #[serde(default)]
    pub attachments: Vec<String>,
}

/// Final state of a completed (or canceled/aborted) run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TestRunCompleteArgs {
    #[serde(default)]
    pub test_run_statistics: TestRunStats,
    #[serde(default)]
    pub is_canceled: bool,
    #[serde(default)]
    pub is_aborted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub elapsed_time_ms: u64,
}

/// Payload for `ExecutionComplete`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TestRunCompletePayload {
    pub test_run_complete_args: TestRunCompleteArgs,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run_tests: Option<TestRunChangedArgs>,
    #[serde(default)]
    pub run_attachments: Vec<AttachmentSet>,
    #[serde(default)]
    pub executor_uris: Vec<String>,
}

/// Payload for `DiscoveryComplete`. `last_discovered_tests` is omitted when
/// the discovery was aborted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DiscoveryCompletePayload {
    pub total_tests: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_discovered_tests: Option<Vec<TestCase>>,
    pub is_aborted: bool,
    #[serde(default)]
    pub metrics: HashMap<String, serde_json::Value>,
}

/// Payload for `TestMessage`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TestMessagePayload {
    pub message_level: TestMessageLevel,
    pub message: String,
}

/// What to discover and how.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DiscoveryCriteria {
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_settings: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_case_filter: Option<String>,
    /// Batch size for `TestCasesFound` progress events
    #[serde(default)]
    pub frequency_of_discovered_tests_event: u64,
}

/// Host-side execution knobs carried with run criteria.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TestExecutionContext {
    /// Batch size for `TestRunStatsChange` progress events
    #[serde(default)]
    pub frequency_of_run_stats_change_event: u64,
    #[serde(default)]
    pub is_debug: bool,
}

/// Payload for `StartTestExecutionWithSources`: run everything in the
/// adapter -> sources map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TestRunCriteriaWithSources {
    #[serde(default)]
    pub adapter_source_map: HashMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_settings: Option<String>,
    #[serde(default)]
    pub test_execution_context: TestExecutionContext,
}

/// Payload for `StartTestExecutionWithTests`: run an explicit test list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TestRunCriteriaWithTests {
    #[serde(default)]
    pub tests: Vec<TestCase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_settings: Option<String>,
    #[serde(default)]
    pub test_execution_context: TestExecutionContext,
}

/// Payload for `LaunchAdapterProcessWithDebuggerAttached`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TestProcessStartInfo {
    pub file_name: String,
    #[serde(default)]
    pub arguments: String,
    #[serde(default)]
    pub working_directory: String,
    #[serde(default)]
    pub environment_variables: HashMap<String, String>,
}
