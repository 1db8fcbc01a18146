// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Framed duplex channel over a connected stream.
//!
//! A spawned reader task pushes each inbound frame into a bounded queue; the
//! engine drains that queue on its receive path. Outbound `send` calls are
//! serialized behind an async mutex so concurrent senders never interleave
//! frames on the wire.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use tesh_wire::{read_message, write_message, ProtocolError};

use crate::error::HostError;

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Send half of the channel plus teardown state. Clones share the stream.
#[derive(Clone)]
pub struct Channel {
    inner: Arc<ChannelInner>,
}

struct ChannelInner {
    writer: Mutex<Option<BoxedWriter>>,
    cancel: CancellationToken,
}

impl Channel {
    /// Wrap a split stream. Returns the channel and the inbound frame queue.
    ///
    /// The reader task runs until the peer closes, a read fails, or the
    /// channel is closed locally.
    pub fn new<R, W>(reader: R, writer: W, inbound_capacity: usize) -> (Self, mpsc::Receiver<Vec<u8>>)
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let (frame_tx, frame_rx) = mpsc::channel(inbound_capacity);
        let cancel = CancellationToken::new();

        let read_cancel = cancel.clone();
        tokio::spawn(async move {
            let mut reader = reader;
            loop {
                let frame = tokio::select! {
                    _ = read_cancel.cancelled() => break,
                    frame = read_message(&mut reader) => frame,
                };
                match frame {
                    Ok(data) => {
                        if frame_tx.send(data).await.is_err() {
                            break;
                        }
                    }
                    Err(ProtocolError::ConnectionClosed) => {
                        debug!("peer closed the connection");
                        break;
                    }
                    Err(e) => {
                        warn!(error = %e, "inbound read failed");
                        break;
                    }
                }
            }
        });

        let channel = Self {
            inner: Arc::new(ChannelInner {
                writer: Mutex::new(Some(Box::new(writer))),
                cancel,
            }),
        };
        (channel, frame_rx)
    }

    /// Write one framed message. Safe under concurrent callers.
    pub async fn send(&self, data: &[u8]) -> Result<(), HostError> {
        if self.inner.cancel.is_cancelled() {
            return Err(HostError::ChannelClosed);
        }
        let mut guard = self.inner.writer.lock().await;
        match guard.as_mut() {
            Some(writer) => Ok(write_message(writer, data).await?),
            None => Err(HostError::ChannelClosed),
        }
    }

    /// Stop the reader task and drop the write half. Safe to call repeatedly.
    pub async fn close(&self) {
        self.inner.cancel.cancel();
        self.inner.writer.lock().await.take();
    }
}

#[cfg(test)]
#[path = "channel_tests.rs"]
mod tests;
