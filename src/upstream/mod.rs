//! Upstream completion provider.
//!
//! - [`client`]: Adapter contract, prompt/chunk types and errors
//! - [`openai`]: OpenAI-compatible chat-completions implementation
//! - [`mock`]: Deterministic double for tests and local runs

pub mod client;
pub mod mock;
pub mod openai;
