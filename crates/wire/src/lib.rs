// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire protocol for orchestrator <-> test-host communication.
//!
//! Wire format: 4-byte length prefix (big-endian) + JSON envelope

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod frame;
mod message;
mod payloads;
mod settings;

pub use frame::{
    decode, deserialize_payload, encode, read_message, serialize_payload, write_message,
    ProtocolError, MAX_MESSAGE_SIZE,
};
pub use message::{Message, MessageType};
pub use payloads::{
    AttachmentSet, DiscoveryCompletePayload, DiscoveryCriteria, TestCase, TestExecutionContext,
    TestMessageLevel, TestMessagePayload, TestOutcome, TestProcessStartInfo, TestResult,
    TestRunChangedArgs, TestRunCompleteArgs, TestRunCompletePayload, TestRunCriteriaWithSources,
    TestRunCriteriaWithTests, TestRunStats,
};
pub use settings::{data_collection_enabled, in_proc_data_collection_enabled};
