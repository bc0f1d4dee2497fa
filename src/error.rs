// SPDX-License-Identifier: MIT
// Copyright 2026 Clarity Contributors

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Forbidden because the caller's tier does not include the feature.
    #[error("Upgrade required: {0}")]
    UpgradeRequired(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Email provider error: {0}")]
    Email(String),

    #[error("Payment provider error: {0}")]
    Payment(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// True for failures of a downstream dependency (store, email, payments).
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            AppError::Database(_) | AppError::Email(_) | AppError::Payment(_) | AppError::Internal(_)
        )
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Forbidden(_) | AppError::UpgradeRequired(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::Database(_)
            | AppError::Email(_)
            | AppError::Payment(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    upgrade_required: bool,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error, details, upgrade_required) = match &self {
            AppError::Unauthorized => ("unauthorized", None, false),
            AppError::BadRequest(msg) => ("bad_request", Some(msg.clone()), false),
            AppError::Forbidden(msg) => ("forbidden", Some(msg.clone()), false),
            AppError::UpgradeRequired(msg) => ("upgrade_required", Some(msg.clone()), true),
            AppError::NotFound(msg) => ("not_found", Some(msg.clone()), false),
            AppError::MethodNotAllowed => ("method_not_allowed", None, false),
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                ("database_error", None, false)
            }
            AppError::Email(msg) => {
                tracing::error!(error = %msg, "Email provider error");
                ("upstream_error", None, false)
            }
            AppError::Payment(msg) => {
                tracing::error!(error = %msg, "Payment provider error");
                ("upstream_error", None, false)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                ("internal_error", None, false)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
            upgrade_required,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
