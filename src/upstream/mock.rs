//! Deterministic completion client.
//!
//! Returns a fixed completion, or a fixed chunk list when streaming, and can
//! be told to fail. Counts calls so tests can assert the provider was never
//! reached.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::upstream::client::{
    ChunkStream, CompletionChunk, CompletionClient, CompletionResult, PromptRequest, UpstreamError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Failure {
    None,
    Immediately,
    AfterChunks(usize),
}

#[derive(Debug)]
pub struct MockCompletionClient {
    response: String,
    chunks: Vec<String>,
    failure: Failure,
    calls: AtomicUsize,
}

impl MockCompletionClient {
    /// Single-shot calls return `response`; streaming splits it on whitespace boundaries.
    pub fn new(response: impl Into<String>) -> Self {
        let response = response.into();
        let chunks = response
            .split_inclusive(' ')
            .map(str::to_string)
            .collect();
        Self {
            response,
            chunks,
            failure: Failure::None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Stream exactly these chunks.
    pub fn with_chunks<I, S>(mut self, chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.chunks = chunks.into_iter().map(Into::into).collect();
        self
    }

    /// Every call fails before producing anything.
    pub fn failing(mut self) -> Self {
        self.failure = Failure::Immediately;
        self
    }

    /// Streaming delivers `n` chunks, then fails.
    pub fn fail_stream_after(mut self, n: usize) -> Self {
        self.failure = Failure::AfterChunks(n);
        self
    }

    /// Number of upstream calls made so far, both modes.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn simulated_error() -> UpstreamError {
        UpstreamError::Status {
            status: 503,
            body: "mock provider unavailable".to_string(),
        }
    }
}

#[async_trait]
impl CompletionClient for MockCompletionClient {
    async fn complete(&self, _request: &PromptRequest) -> Result<CompletionResult, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failure == Failure::Immediately {
            return Err(Self::simulated_error());
        }
        Ok(CompletionResult {
            text: self.response.clone(),
        })
    }

    async fn complete_stream(&self, _request: &PromptRequest) -> Result<ChunkStream, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let mut items: Vec<Result<CompletionChunk, UpstreamError>> = self
            .chunks
            .iter()
            .map(|text| Ok(CompletionChunk::new(text.clone())))
            .collect();

        match self.failure {
            Failure::None => {}
            Failure::Immediately => return Err(Self::simulated_error()),
            Failure::AfterChunks(n) => {
                items.truncate(n);
                items.push(Err(UpstreamError::Stream("mock connection reset".to_string())));
            }
        }

        Ok(Box::pin(futures::stream::iter(items)))
    }

    fn model(&self) -> &str {
        "mock"
    }
}
