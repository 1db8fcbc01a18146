// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ordered, bounded, pausable single-worker job queue.
//!
//! Jobs run strictly in submission order on one worker task, so queued
//! operations never execute concurrently with each other and never block the
//! submitter's path beyond backpressure. `pause` gates dequeuing without
//! touching queued contents; the in-flight job always completes.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{watch, Notify};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Future type produced by the queue's process function for each job.
pub type JobFuture = Pin<Box<dyn Future<Output = Result<(), String>> + Send>>;

/// Generic bounded FIFO executor with a dequeue gate.
pub struct JobQueue<T> {
    state: Arc<QueueState<T>>,
    paused_tx: watch::Sender<bool>,
    cancel: CancellationToken,
}

struct QueueState<T> {
    name: String,
    inner: Mutex<QueueInner<T>>,
    max_jobs: usize,
    max_bytes: u64,
    /// Wakes blocked submitters, one permit per dequeued job
    space: Notify,
    /// Wakes the idle worker
    work: Notify,
}

struct QueueInner<T> {
    jobs: VecDeque<(T, u64)>,
    queued_bytes: u64,
}

impl<T: Send + 'static> JobQueue<T> {
    /// Create the queue and spawn its worker. Must be called on a runtime.
    ///
    /// `process` turns a dequeued job into the future the worker drives;
    /// errors it reports go to `report_error` and never stop the worker.
    pub fn new<F, E>(
        name: impl Into<String>,
        process: F,
        max_jobs: usize,
        max_bytes: u64,
        report_error: E,
    ) -> Self
    where
        F: Fn(T) -> JobFuture + Send + Sync + 'static,
        E: Fn(String) + Send + Sync + 'static,
    {
        let state = Arc::new(QueueState {
            name: name.into(),
            inner: Mutex::new(QueueInner { jobs: VecDeque::new(), queued_bytes: 0 }),
            max_jobs,
            max_bytes,
            space: Notify::new(),
            work: Notify::new(),
        });
        let (paused_tx, paused_rx) = watch::channel(false);
        let cancel = CancellationToken::new();

        tokio::spawn(run_worker(
            Arc::clone(&state),
            paused_rx,
            cancel.clone(),
            process,
            report_error,
        ));

        Self { state, paused_tx, cancel }
    }

    /// Append a job. Blocks while either the job-count or cumulative-size
    /// bound is exceeded; accepted jobs are never dropped or reordered.
    pub async fn submit(&self, job: T, size: u64) {
        let mut job = Some(job);
        loop {
            {
                let mut inner = self.state.inner.lock();
                let fits = inner.jobs.len() < self.state.max_jobs
                    && inner.queued_bytes.saturating_add(size) <= self.state.max_bytes;
                // An oversized job is still accepted once the queue drains,
                // otherwise it could never be submitted at all
                if fits || inner.jobs.is_empty() {
                    if let Some(job) = job.take() {
                        inner.jobs.push_back((job, size));
                        inner.queued_bytes += size;
                    }
                    self.state.work.notify_one();
                    return;
                }
            }
            self.state.space.notified().await;
        }
    }

    /// Stop dequeuing without discarding queued jobs. The in-flight job
    /// finishes.
    pub fn pause(&self) {
        debug!(queue = %self.state.name, "pausing dequeue");
        self.paused_tx.send_replace(true);
    }

    /// Resume dequeuing in original order.
    pub fn resume(&self) {
        debug!(queue = %self.state.name, "resuming dequeue");
        self.paused_tx.send_replace(false);
    }

    /// Number of jobs currently queued (not counting the in-flight one).
    pub fn len(&self) -> usize {
        self.state.inner.lock().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stop the worker after any in-flight job completes. Queued jobs are
    /// abandoned. Safe to call repeatedly.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

async fn run_worker<T, F, E>(
    state: Arc<QueueState<T>>,
    mut paused: watch::Receiver<bool>,
    cancel: CancellationToken,
    process: F,
    report_error: E,
) where
    T: Send + 'static,
    F: Fn(T) -> JobFuture + Send + Sync + 'static,
    E: Fn(String) + Send + Sync + 'static,
{
    loop {
        // Dequeue gate: hold here while paused, leaving the queue untouched
        while *paused.borrow() {
            tokio::select! {
                _ = cancel.cancelled() => return,
                changed = paused.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
            }
        }

        let next = {
            let mut inner = state.inner.lock();
            // Re-check the gate under the lock so a pause landing after the
            // gate wait still stops this dequeue
            if *paused.borrow() {
                continue;
            }
            match inner.jobs.pop_front() {
                Some((job, size)) => {
                    inner.queued_bytes = inner.queued_bytes.saturating_sub(size);
                    Some(job)
                }
                None => None,
            }
        };

        match next {
            Some(job) => {
                state.space.notify_one();
                // Not cancellable mid-job: an in-flight job always completes
                if let Err(message) = process(job).await {
                    report_error(message);
                }
            }
            None => {
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = state.work.notified() => {}
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
