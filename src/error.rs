//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Defects in the static resource model, caught at startup.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("duplicate path segment: {0}")]
    DuplicatePathSegment(String),
    #[error("link '{link}' on '{resource}' references unknown resource '{related}'")]
    UnknownLinkTarget {
        resource: String,
        link: String,
        related: String,
    },
    #[error("filterable field '{field}' is not declared on '{resource}'")]
    UnknownFilterField { resource: String, field: String },
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("{field}: {message}")]
    Validation { field: String, message: String },
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    pub fn validation(field: &str, message: &str) -> Self {
        AppError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::Model(_) => (StatusCode::INTERNAL_SERVER_ERROR, "model_error"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Validation { .. } => (StatusCode::BAD_REQUEST, "validation_error"),
            AppError::Db(e) => {
                if let sqlx::Error::RowNotFound = e {
                    (StatusCode::NOT_FOUND, "not_found")
                } else {
                    (StatusCode::INTERNAL_SERVER_ERROR, "database_error")
                }
            }
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
        };
        // Per-field detail so clients can surface the message next to the input.
        let details = match &self {
            AppError::Validation { field, message } => {
                let mut fields = serde_json::Map::new();
                fields.insert(
                    field.clone(),
                    serde_json::Value::Array(vec![serde_json::Value::String(message.clone())]),
                );
                Some(serde_json::Value::Object(fields))
            }
            _ => None,
        };
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
                details,
            },
        };
        (status, Json(body)).into_response()
    }
}
