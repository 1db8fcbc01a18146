// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the host crate.

use std::path::PathBuf;

/// Maximum queued jobs before submitters block (default 500).
pub fn queue_max_jobs() -> usize {
    std::env::var("TESH_QUEUE_MAX_JOBS")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(500)
}

/// Maximum cumulative queued job size in bytes before submitters block
/// (default 25,000,000).
pub fn queue_max_bytes() -> u64 {
    std::env::var("TESH_QUEUE_MAX_BYTES")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(25_000_000)
}

/// Diagnostics log file announced to the orchestrator after the handshake.
pub fn diag_log_file() -> Option<PathBuf> {
    std::env::var("TESH_DIAG_LOG").ok().filter(|s| !s.is_empty()).map(PathBuf::from)
}
