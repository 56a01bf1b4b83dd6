//! Error types for the ledger, the document processor and the HTTP facade.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Errors produced by ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("invalid record: `{field}` must not be empty")]
    InvalidRecord { field: &'static str },

    #[error("block index {index} out of range 1..={len}")]
    IndexOutOfRange { index: u64, len: usize },
}

/// Errors produced by document processing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    #[error("owner element not found in document")]
    OwnerFieldMissing,

    #[error("malformed document: {0}")]
    MalformedDocument(String),

    #[error("invalid document key")]
    InvalidKey,

    #[error("encryption failed")]
    EncryptionFailed,

    #[error("decryption failed")]
    DecryptionFailed,

    #[error("invalid hex payload: {0}")]
    InvalidHex(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidVar { var: &'static str, reason: String },
}

/// Failures surfaced by HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("invalid request body: {message}")]
    Body { status: StatusCode, message: String },
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Body {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        let status = if err.is_data() {
            StatusCode::UNPROCESSABLE_ENTITY
        } else {
            StatusCode::BAD_REQUEST
        };
        ApiError::Body {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Ledger(LedgerError::InvalidRecord { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Ledger(LedgerError::IndexOutOfRange { .. }) => StatusCode::NOT_FOUND,
            ApiError::Document(DocumentError::OwnerFieldMissing) => StatusCode::NOT_FOUND,
            ApiError::Document(_) => StatusCode::BAD_REQUEST,
            ApiError::Body { status, .. } => *status,
        };
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        let r = ApiError::from(LedgerError::InvalidRecord { field: "sender" }).into_response();
        assert_eq!(r.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let r = ApiError::from(LedgerError::IndexOutOfRange { index: 9, len: 1 }).into_response();
        assert_eq!(r.status(), StatusCode::NOT_FOUND);

        let r = ApiError::from(DocumentError::OwnerFieldMissing).into_response();
        assert_eq!(r.status(), StatusCode::NOT_FOUND);

        let r = ApiError::from(DocumentError::DecryptionFailed).into_response();
        assert_eq!(r.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn body_errors_keep_their_status() {
        let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let r = ApiError::from(err).into_response();
        assert_eq!(r.status(), StatusCode::BAD_REQUEST);

        let err = serde_json::from_str::<u64>(r#""five""#).unwrap_err();
        let r = ApiError::from(err).into_response();
        assert_eq!(r.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn messages() {
        assert_eq!(
            LedgerError::IndexOutOfRange { index: 0, len: 3 }.to_string(),
            "block index 0 out of range 1..=3"
        );
        assert_eq!(
            DocumentError::OwnerFieldMissing.to_string(),
            "owner element not found in document"
        );
    }
}
