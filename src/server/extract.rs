//! JSON body extraction.
//!
//! Every way a body can be wrong (bad syntax, wrong types, missing fields,
//! missing content type, empty values) ends up as a 422.

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::Json;
use serde::de::DeserializeOwned;

use crate::auth::credentials::Credentials;
use crate::error::ApiError;
use crate::upstream::client::PromptRequest;

/// Field-level checks run after deserialization.
pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

impl Validate for Credentials {
    fn validate(&self) -> Result<(), String> {
        Credentials::validate(self)
    }
}

impl Validate for PromptRequest {
    fn validate(&self) -> Result<(), String> {
        PromptRequest::validate(self)
    }
}

/// Like [`Json`], but rejects with [`ApiError::Validation`].
#[derive(Debug, Clone)]
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection: JsonRejection| ApiError::Validation(rejection.body_text()))?;

        value.validate().map_err(ApiError::Validation)?;
        Ok(ValidJson(value))
    }
}
