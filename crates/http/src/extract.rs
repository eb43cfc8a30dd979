//! Extractors that reject malformed input with the standard error envelope
//! instead of axum's plain-text rejections.

use axum::{
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::error::AppError;

/// Shape checks that run after a payload deserialized successfully
pub trait Validate {
    /// Returns one detail entry per offending field
    fn validate(&self) -> Result<(), Vec<serde_json::Value>>;
}

/// Record a detail entry if `value` is empty or whitespace only
pub fn require_text(field: &str, value: &str, details: &mut Vec<serde_json::Value>) {
    if value.trim().is_empty() {
        details.push(json!({"field": field, "error": "must not be blank"}));
    }
}

/// JSON body that deserialized and passed [`Validate`]
#[derive(Debug)]
pub struct ValidJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| {
                AppError::validation(
                    vec![json!({"field": "body", "error": rejection.body_text()})],
                    "invalid request body",
                )
            })?;

        value
            .validate()
            .map_err(|details| AppError::validation(details, "request body failed validation"))?;

        Ok(Self(value))
    }
}

/// Path parameters whose rejection renders as a validation error
#[derive(Debug)]
pub struct ValidPath<T>(pub T);

impl<T, S> FromRequestParts<S> for ValidPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| {
                AppError::validation(
                    vec![json!({"field": "path", "error": rejection.body_text()})],
                    "invalid path parameter",
                )
            })?;

        Ok(Self(value))
    }
}
