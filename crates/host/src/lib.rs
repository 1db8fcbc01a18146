// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test-host protocol engine.
//!
//! Owns the connection to the orchestrator, negotiates the protocol version,
//! dispatches inbound messages, and decouples long-running discovery and
//! execution operations from the receive path through an ordered job queue.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod channel;
mod connection;
pub mod env;
mod error;
mod forwarders;
mod handler;
mod provider;
mod queue;
mod signal;

pub use channel::Channel;
pub use connection::{ConnectionInfo, ConnectionRole, Endpoint};
pub use error::{HostError, ProviderError};
pub use forwarders::{DiscoveryEventForwarder, RunEventForwarder, TestCaseEventForwarder};
pub use handler::{Diagnostics, RequestHandler, HIGHEST_SUPPORTED_VERSION};
pub use provider::{
    DiscoveryEventsHandler, DiscoveryManager, ExecutionManager, OperationProvider,
    RunEventsHandler, TestCaseEventsHandler,
};
pub use queue::JobQueue;
pub use signal::Signal;
