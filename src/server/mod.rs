//! HTTP surface.
//!
//! - [`api`]: Routes, handlers and request/response types
//! - [`extract`]: JSON body extractor with field validation
//! - [`streaming`]: Chunk-by-chunk relay of upstream completions

pub mod api;
pub mod extract;
pub mod streaming;
