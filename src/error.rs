// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type shared by the store, the services and the
/// background passes.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Compare-and-swap lost against a concurrent writer.
    #[error("Concurrent update conflict: {0}")]
    Conflict(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Notification delivery failed: {0}")]
    DeliveryFailure(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Transient errors that a caller may retry before surfacing failure.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Conflict(_) | AppError::StoreUnavailable(_))
    }
}

/// Precondition failures raised by the pure collection mutators.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MutationError {
    #[error("user {0} is already a member")]
    AlreadyMember(String),

    #[error("user {0} is not a member")]
    NotMember(String),

    #[error("no request found for {0}")]
    RequestNotFound(String),

    #[error("poll {0} not found")]
    PollNotFound(String),

    #[error("option {option} not found in poll {poll_id}")]
    OptionNotFound { poll_id: String, option: String },

    #[error("user {user_id} has not voted for {option}")]
    NotVoted { user_id: String, option: String },

    #[error("invalid poll priority: {0}")]
    InvalidPriority(String),

    #[error("only the poll creator can delete poll {0}")]
    NotPollCreator(String),

    #[error("task {0} not found")]
    TaskNotFound(String),

    #[error("link {0} not found")]
    LinkNotFound(String),

    #[error("email {0} is already used")]
    DuplicateEmail(String),

    #[error("chosen dates cannot be empty")]
    EmptyChosenDates,
}

impl From<MutationError> for AppError {
    fn from(err: MutationError) -> Self {
        let message = err.to_string();
        match err {
            MutationError::RequestNotFound(_)
            | MutationError::PollNotFound(_)
            | MutationError::TaskNotFound(_)
            | MutationError::LinkNotFound(_) => AppError::NotFound(message),
            MutationError::NotPollCreator(_) => AppError::Forbidden(message),
            MutationError::AlreadyMember(_)
            | MutationError::NotMember(_)
            | MutationError::OptionNotFound { .. }
            | MutationError::NotVoted { .. }
            | MutationError::InvalidPriority(_)
            | MutationError::DuplicateEmail(_)
            | MutationError::EmptyChosenDates => AppError::InvalidState(message),
        }
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", Some(msg.clone())),
            AppError::InvalidState(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "invalid_state",
                Some(msg.clone()),
            ),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::DeliveryFailure(msg) => {
                tracing::warn!(error = %msg, "Notification delivery error");
                (StatusCode::BAD_GATEWAY, "delivery_failure", None)
            }
            AppError::StoreUnavailable(msg) => {
                tracing::error!(error = %msg, "Store error");
                (StatusCode::SERVICE_UNAVAILABLE, "store_unavailable", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for services and store operations
pub type Result<T> = std::result::Result<T, AppError>;
