//! prompt-relay: authenticated bridge to an LLM completion API.
//!
//! Callers log in with any username/password to get a short-lived bearer
//! token, then submit prompts that are forwarded to an OpenAI-compatible
//! provider. Completions come back either whole, as JSON, or chunk by chunk
//! as a streamed body.

pub mod auth;
pub mod config;
pub mod error;
pub mod server;
pub mod upstream;
