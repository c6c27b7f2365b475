//! HTTP-facing error type and JSON extractor

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::models::lifecycle::LifecycleError;
use crate::models::{ApiResponse, GroupBuyError, NegotiationError};
use crate::services::catalog::OfferRejection;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Rule(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn rule(message: impl Into<String>) -> Self {
        Self::Rule(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            Self::Rule(_) => (StatusCode::BAD_REQUEST, "RULE_VIOLATION"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
        }

        let body = ApiResponse::<()>::failure(self.to_string(), code);
        (status, Json(body)).into_response()
    }
}

impl From<NegotiationError> for AppError {
    fn from(err: NegotiationError) -> Self {
        Self::Rule(err.to_string())
    }
}

impl From<GroupBuyError> for AppError {
    fn from(err: GroupBuyError) -> Self {
        match err {
            GroupBuyError::HasParticipants => Self::Forbidden(err.to_string()),
            other => Self::Rule(other.to_string()),
        }
    }
}

impl From<LifecycleError> for AppError {
    fn from(err: LifecycleError) -> Self {
        Self::Rule(err.to_string())
    }
}

impl From<OfferRejection> for AppError {
    fn from(err: OfferRejection) -> Self {
        match err {
            OfferRejection::ProductNotFound(_) => Self::NotFound(err.to_string()),
            other => Self::Validation(other.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Validation(format!("Validation error: {err}"))
    }
}

/// `Json` whose rejections come back as 400 validation errors in the
/// standard response body.
pub struct AppJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for AppJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

fn json_rejection(rejection: JsonRejection) -> AppError {
    AppError::Validation(rejection.body_text())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_to_client_statuses() {
        let rule: AppError = NegotiationError::OfferLimit(crate::models::Party::Seller).into();
        assert_eq!(rule.status_and_code().0, StatusCode::BAD_REQUEST);
        assert_eq!(rule.to_string(), "Seller offer limit reached");

        let frozen: AppError = GroupBuyError::HasParticipants.into();
        assert_eq!(frozen.status_and_code().0, StatusCode::FORBIDDEN);

        let missing: AppError = OfferRejection::ProductNotFound(uuid::Uuid::nil()).into();
        assert_eq!(missing.status_and_code().0, StatusCode::NOT_FOUND);
    }

    #[test]
    fn storage_failures_surface_their_message() {
        let err: AppError = StoreError::Finished.into();
        assert_eq!(err.status_and_code().0, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_string().contains("transaction already finished"));
    }
}
