//! Mock login and bearer-token authorization.
//!
//! - [`credentials`]: Credential verification (currently accepts any pair)
//! - [`token`]: Signed, time-bound access tokens
//! - [`gate`]: Extractor that guards protected routes

pub mod credentials;
pub mod gate;
pub mod token;
