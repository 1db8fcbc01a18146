// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Message envelope and the closed set of protocol message tags.

use serde::{Deserialize, Serialize};

/// Protocol message kinds, serialized to the dotted wire tags the
/// orchestrator speaks (e.g. `"TestDiscovery.Start"`).
///
/// Tags outside the known set decode into [`MessageType::Unknown`] so a
/// session survives protocol extensions it does not understand.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum MessageType {
    /// Version handshake, both directions
    VersionCheck,
    /// Initialize the discovery manager with extension paths
    DiscoveryInitialize,
    /// Start test discovery with criteria
    StartDiscovery,
    /// Batch of discovered test cases (outbound)
    TestCasesFound,
    /// Discovery finished (outbound)
    DiscoveryComplete,
    /// Initialize the execution manager with extension paths
    ExecutionInitialize,
    /// Start a test run keyed by source map
    StartTestExecutionWithSources,
    /// Start a test run with an explicit test list
    StartTestExecutionWithTests,
    /// Cancel the current test run
    CancelTestRun,
    /// Abort the current test run
    AbortTestRun,
    /// Incremental run statistics (outbound)
    TestRunStatsChange,
    /// Run finished (outbound)
    ExecutionComplete,
    /// Diagnostic log message (outbound)
    TestMessage,
    /// Request the orchestrator to launch a process under the debugger
    LaunchAdapterProcessWithDebuggerAttached,
    /// Ack for the debugger launch request, carries the pid
    LaunchAdapterProcessWithDebuggerAttachedCallback,
    /// End of session, tear down the connection
    SessionEnd,
    /// Reserved
    SessionAbort,
    /// Any tag this build does not recognize
    Unknown(String),
}

impl MessageType {
    /// Wire tag for this message type.
    pub fn as_tag(&self) -> &str {
        match self {
            Self::VersionCheck => "ProtocolVersion",
            Self::DiscoveryInitialize => "TestDiscovery.Initialize",
            Self::StartDiscovery => "TestDiscovery.Start",
            Self::TestCasesFound => "TestDiscovery.TestFound",
            Self::DiscoveryComplete => "TestDiscovery.Completed",
            Self::ExecutionInitialize => "TestExecution.Initialize",
            Self::StartTestExecutionWithSources => "TestExecution.StartWithSources",
            Self::StartTestExecutionWithTests => "TestExecution.StartWithTests",
            Self::CancelTestRun => "TestExecution.Cancel",
            Self::AbortTestRun => "TestExecution.Abort",
            Self::TestRunStatsChange => "TestExecution.StatsChange",
            Self::ExecutionComplete => "TestExecution.Completed",
            Self::TestMessage => "TestSession.Message",
            Self::LaunchAdapterProcessWithDebuggerAttached => {
                "TestExecution.LaunchAdapterProcessWithDebuggerAttached"
            }
            Self::LaunchAdapterProcessWithDebuggerAttachedCallback => {
                "TestExecution.LaunchAdapterProcessWithDebuggerAttachedCallback"
            }
            Self::SessionEnd => "TestSession.Terminate",
            Self::SessionAbort => "TestSession.Abort",
            Self::Unknown(tag) => tag,
        }
    }
}

impl From<MessageType> for String {
    fn from(value: MessageType) -> Self {
        value.as_tag().to_string()
    }
}

impl From<String> for MessageType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "ProtocolVersion" => Self::VersionCheck,
            "TestDiscovery.Initialize" => Self::DiscoveryInitialize,
            "TestDiscovery.Start" => Self::StartDiscovery,
            "TestDiscovery.TestFound" => Self::TestCasesFound,
            "TestDiscovery.Completed" => Self::DiscoveryComplete,
            "TestExecution.Initialize" => Self::ExecutionInitialize,
            "TestExecution.StartWithSources" => Self::StartTestExecutionWithSources,
            "TestExecution.StartWithTests" => Self::StartTestExecutionWithTests,
            "TestExecution.Cancel" => Self::CancelTestRun,
            "TestExecution.Abort" => Self::AbortTestRun,
            "TestExecution.StatsChange" => Self::TestRunStatsChange,
            "TestExecution.Completed" => Self::ExecutionComplete,
            "TestSession.Message" => Self::TestMessage,
            "TestExecution.LaunchAdapterProcessWithDebuggerAttached" => {
                Self::LaunchAdapterProcessWithDebuggerAttached
            }
            "TestExecution.LaunchAdapterProcessWithDebuggerAttachedCallback" => {
                Self::LaunchAdapterProcessWithDebuggerAttachedCallback
            }
            "TestSession.Terminate" => Self::SessionEnd,
            "TestSession.Abort" => Self::SessionAbort,
            _ => Self::Unknown(tag),
        }
    }
}

/// Protocol envelope: a tagged message with a version and an opaque payload.
///
/// The payload's shape is fixed by the tag; it stays a raw JSON value here so
/// dispatch can decode it against the right type (or ignore it).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Message tag, determines the payload shape
    #[serde(rename = "MessageType")]
    pub message_type: MessageType,
    /// Negotiated protocol version this envelope was encoded under
    #[serde(rename = "Version", default)]
    pub version: i32,
    /// Encoded payload, absent for parameterless messages
    #[serde(rename = "Payload", default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
