// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the protocol engine.

use thiserror::Error;

use tesh_wire::ProtocolError;

/// Errors surfaced by the protocol engine.
///
/// Only connection faults escalate to the caller; everything else is handled
/// locally so the engine stays alive for the full session.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("channel closed")]
    ChannelClosed,

    #[error("not connected")]
    NotConnected,

    #[error("ack waiter dropped before the callback arrived")]
    AckDropped,

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error reported by an operation provider while running a queued job.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ProviderError(pub String);

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
