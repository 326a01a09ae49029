//! Streaming relay: forwards upstream chunks to the caller as they arrive.
//!
//! A pump task pulls from the upstream [`ChunkStream`] and pushes raw text
//! into a bounded channel; the response body drains the other end. Nothing
//! is buffered beyond the channel capacity, chunk order is preserved, and
//! the pump stops as soon as the caller goes away.

use std::time::Duration;

use bytes::Bytes;
use futures::stream::Stream;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::{debug, error, info};

use crate::config::UpstreamConfig;
use crate::upstream::client::ChunkStream;

/// Terminal error on the outbound body. Surfaces to the caller as an
/// aborted (truncated) response, never as text in the body.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("upstream failed after {delivered} chunks")]
    Truncated { delivered: usize },
}

/// Relay tuning.
#[derive(Debug, Clone, Copy)]
pub struct RelayOptions {
    /// Chunks held between the upstream reader and the caller.
    pub buffer: usize,
    /// Pause after each delivered chunk.
    pub throttle: Option<Duration>,
}

impl Default for RelayOptions {
    fn default() -> Self {
        Self {
            buffer: 16,
            throttle: None,
        }
    }
}

impl From<&UpstreamConfig> for RelayOptions {
    fn from(config: &UpstreamConfig) -> Self {
        Self {
            buffer: config.stream_buffer,
            throttle: config.stream_throttle(),
        }
    }
}

/// Convert an upstream chunk stream into an outbound byte stream.
pub fn relay(
    chunks: ChunkStream,
    options: RelayOptions,
    request_id: String,
) -> impl Stream<Item = Result<Bytes, RelayError>> + Send {
    let (tx, rx) = mpsc::channel(options.buffer.max(1));
    tokio::spawn(pump(chunks, tx, options.throttle, request_id));
    ReceiverStream::new(rx)
}

async fn pump(
    mut chunks: ChunkStream,
    tx: mpsc::Sender<Result<Bytes, RelayError>>,
    throttle: Option<Duration>,
    request_id: String,
) {
    let mut delivered = 0usize;

    loop {
        let next = tokio::select! {
            next = chunks.next() => next,
            _ = tx.closed() => {
                info!(request_id, delivered, "Caller disconnected, dropping upstream stream");
                return;
            }
        };

        match next {
            Some(Ok(chunk)) => {
                if tx.send(Ok(Bytes::from(chunk.text))).await.is_err() {
                    info!(request_id, delivered, "Caller disconnected, dropping upstream stream");
                    return;
                }
                delivered += 1;

                if let Some(pause) = throttle {
                    tokio::time::sleep(pause).await;
                }
            }
            Some(Err(e)) => {
                error!(request_id, delivered, error = %e, "Upstream failed mid-stream, truncating response");
                let _ = tx.send(Err(RelayError::Truncated { delivered })).await;
                return;
            }
            None => {
                debug!(request_id, delivered, "Relay complete");
                return;
            }
        }
    }
}
