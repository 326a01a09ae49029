//! Completion client contract.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures::Stream;
use serde::Deserialize;
use thiserror::Error;

/// A prompt to complete. One per call, never stored.
#[derive(Debug, Clone, Deserialize)]
pub struct PromptRequest {
    pub prompt: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: i64,
}

pub const DEFAULT_MAX_TOKENS: i64 = 100;

fn default_max_tokens() -> i64 {
    DEFAULT_MAX_TOKENS
}

impl PromptRequest {
    pub fn new(prompt: impl Into<String>, max_tokens: i64) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens,
        }
    }

    /// `prompt` must be non-empty and `max_tokens` positive.
    pub fn validate(&self) -> Result<(), String> {
        if self.prompt.trim().is_empty() {
            return Err("prompt must not be empty".to_string());
        }
        if self.max_tokens < 1 {
            return Err("max_tokens must be a positive integer".to_string());
        }
        Ok(())
    }
}

/// Full text produced by a single-shot completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionResult {
    pub text: String,
}

/// One incremental fragment of generated text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionChunk {
    pub text: String,
}

impl CompletionChunk {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Finite, ordered chunk sequence. An `Err` item is terminal.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<CompletionChunk, UpstreamError>> + Send>>;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("stream error: {0}")]
    Stream(String),

    #[error("no response within {0:?}")]
    Timeout(Duration),
}

impl From<serde_json::Error> for UpstreamError {
    fn from(e: serde_json::Error) -> Self {
        UpstreamError::InvalidResponse(e.to_string())
    }
}

/// Adapter over a completion provider. Both modes use the client's fixed model.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Request the whole completion at once.
    async fn complete(&self, request: &PromptRequest) -> Result<CompletionResult, UpstreamError>;

    /// Start a new upstream request and return its chunks lazily.
    ///
    /// Errors returned here happen before any chunk is produced; failures
    /// after that arrive as the stream's last item.
    async fn complete_stream(&self, request: &PromptRequest) -> Result<ChunkStream, UpstreamError>;

    /// Model identifier sent upstream.
    fn model(&self) -> &str;
}
