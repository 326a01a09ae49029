//! OpenAI-compatible chat-completions client.
//!
//! Sends the prompt as a single user message. Streaming responses arrive as
//! server-sent events; each `choices[0].delta.content` becomes one chunk and
//! the `[DONE]` sentinel ends the sequence. An error event, or a body that
//! ends before `[DONE]`, ends it with an error instead.

use std::time::Duration;

use async_stream::try_stream;
use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::{Stream, StreamExt};
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::UpstreamConfig;
use crate::upstream::client::{
    ChunkStream, CompletionChunk, CompletionClient, CompletionResult, PromptRequest, UpstreamError,
};

const DONE_SENTINEL: &str = "[DONE]";

pub struct OpenAiClient {
    client: Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl OpenAiClient {
    /// Build a client. The handle is read-only afterwards and shared by all requests.
    pub fn new(config: &UpstreamConfig, api_key: SecretString) -> Result<Self, UpstreamError> {
        // Every read is bounded, so a stalled stream fails without capping its
        // total length. Single-shot calls also get a whole-request timeout.
        let client = Client::builder()
            .connect_timeout(config.timeout())
            .read_timeout(config.timeout())
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            timeout: config.timeout(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn build_request<'a>(&'a self, request: &'a PromptRequest, stream: bool) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: &request.prompt,
            }],
            max_tokens: request.max_tokens,
            stream,
        }
    }

    async fn send(
        &self,
        body: &ChatRequest<'_>,
        timeout: Option<Duration>,
    ) -> Result<Response, UpstreamError> {
        let mut builder = self
            .client
            .post(self.endpoint())
            .bearer_auth(self.api_key.expose_secret())
            .json(body);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            warn!(status, "Provider rejected completion request");
            return Err(UpstreamError::Status { status, body });
        }

        Ok(response)
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, request: &PromptRequest) -> Result<CompletionResult, UpstreamError> {
        let body = self.build_request(request, false);
        let response = self.send(&body, Some(self.timeout)).await?;

        let raw = response.text().await?;
        let parsed: ChatResponse = serde_json::from_str(&raw)?;
        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| UpstreamError::InvalidResponse("no message content".to_string()))?;

        debug!(model = %self.model, chars = text.len(), "Completion received");
        Ok(CompletionResult { text })
    }

    async fn complete_stream(&self, request: &PromptRequest) -> Result<ChunkStream, UpstreamError> {
        let body = self.build_request(request, true);
        let response = tokio::time::timeout(self.timeout, self.send(&body, None))
            .await
            .map_err(|_| UpstreamError::Timeout(self.timeout))??;
        Ok(Box::pin(sse_chunks(response)))
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Decode a streaming chat-completions body into text chunks.
fn sse_chunks(response: Response) -> impl Stream<Item = Result<CompletionChunk, UpstreamError>> + Send {
    try_stream! {
        let mut events = response.bytes_stream().eventsource();
        let mut finished = false;

        while let Some(event) = events.next().await {
            let event = event.map_err(|e| UpstreamError::Stream(e.to_string()))?;
            if event.data == DONE_SENTINEL {
                finished = true;
                break;
            }

            let chunk: ChatChunk = serde_json::from_str(&event.data)?;
            if let Some(error) = chunk.error {
                let message = format!("provider error event: {}", error.describe());
                Err::<(), _>(UpstreamError::Stream(message))?;
            }
            for choice in chunk.choices {
                if let Some(text) = choice.delta.content.filter(|t| !t.is_empty()) {
                    yield CompletionChunk::new(text);
                }
            }
        }

        if !finished {
            let message = format!("stream ended without {DONE_SENTINEL}");
            Err::<(), _>(UpstreamError::Stream(message))?;
        }
    }
}

// API request/response types
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: i64,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    error: Option<ProviderErrorEvent>,
}

/// `{"error": {...}}` sent in place of a chunk.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ProviderErrorEvent {
    Detailed { message: String },
    Other(serde_json::Value),
}

impl ProviderErrorEvent {
    fn describe(&self) -> String {
        match self {
            ProviderErrorEvent::Detailed { message } => message.clone(),
            ProviderErrorEvent::Other(value) => value.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    content: Option<String>,
}
