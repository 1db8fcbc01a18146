// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Role-keyed transport endpoint.
//!
//! The connection role is fixed at construction: `Host` owns the listening
//! socket and accepts exactly one peer; `Client` connects out. Either way the
//! result is a single bidirectional stream for the session.

use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream};
use tracing::debug;

use crate::error::HostError;

/// Which side owns the listening socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionRole {
    /// Bind a listener and accept the peer
    Host,
    /// Connect out to the peer's listener
    Client,
}

/// Where and how to establish the session connection. Immutable once built.
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub address: String,
    pub role: ConnectionRole,
}

impl ConnectionInfo {
    pub fn new(address: impl Into<String>, role: ConnectionRole) -> Self {
        Self { address: address.into(), role }
    }
}

/// A started endpoint, not yet connected to the peer.
///
/// Splitting start from connect lets a `Host` endpoint report its bound
/// address (relevant when the configured port is 0) before the peer dials in.
pub enum Endpoint {
    Listening(TcpListener),
    Dialing(String),
}

impl Endpoint {
    /// Start the endpoint in the configured role. For `Host` this binds the
    /// listener; for `Client` it only records the target address.
    pub async fn start(info: &ConnectionInfo) -> Result<Self, HostError> {
        match info.role {
            ConnectionRole::Host => {
                let listener = TcpListener::bind(&info.address)
                    .await
                    .map_err(|e| HostError::Connection(e.to_string()))?;
                debug!(address = %info.address, "listening for orchestrator");
                Ok(Self::Listening(listener))
            }
            ConnectionRole::Client => Ok(Self::Dialing(info.address.clone())),
        }
    }

    /// Locally bound address, for `Host` endpoints.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match self {
            Self::Listening(listener) => listener.local_addr().ok(),
            Self::Dialing(_) => None,
        }
    }

    /// Block until the peer connection is established.
    pub async fn connect(self) -> Result<TcpStream, HostError> {
        match self {
            Self::Listening(listener) => {
                let (stream, peer) = listener
                    .accept()
                    .await
                    .map_err(|e| HostError::Connection(e.to_string()))?;
                debug!(%peer, "orchestrator connected");
                Ok(stream)
            }
            Self::Dialing(address) => {
                let stream = TcpStream::connect(&address)
                    .await
                    .map_err(|e| HostError::Connection(e.to_string()))?;
                debug!(%address, "connected to orchestrator");
                Ok(stream)
            }
        }
    }
}

#[cfg(test)]
#[path = "connection_tests.rs"]
mod tests;
