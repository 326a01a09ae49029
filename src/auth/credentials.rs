//! Credential verification.
//!
//! Login goes through [`CredentialVerifier`] so a real credential store can
//! replace [`AcceptAnyCredentials`] without touching token issuance or the
//! auth gate.

use async_trait::async_trait;
use serde::Deserialize;

/// Username/password pair submitted to `/login`. Never persisted.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Both fields must be non-empty.
    pub fn validate(&self) -> Result<(), String> {
        if self.username.is_empty() {
            return Err("username must not be empty".to_string());
        }
        if self.password.is_empty() {
            return Err("password must not be empty".to_string());
        }
        Ok(())
    }
}

/// Decides whether a credential pair identifies a user.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// Returns the token subject on success, `None` when the pair is rejected.
    async fn verify(&self, credentials: &Credentials) -> Option<String>;
}

/// Mock verifier: any well-formed pair is accepted and the username becomes the subject.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAnyCredentials;

#[async_trait]
impl CredentialVerifier for AcceptAnyCredentials {
    async fn verify(&self, credentials: &Credentials) -> Option<String> {
        Some(credentials.username.clone())
    }
}
