// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::http::StatusCode;
use axum::response::IntoResponse;
use trip_planner::db::{DocumentKey, DocumentStore, FirestoreDb};
use trip_planner::error::{AppError, MutationError};

#[test]
fn test_status_codes() {
    let cases = [
        (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
        (AppError::Conflict("x".into()), StatusCode::CONFLICT),
        (
            AppError::InvalidState("x".into()),
            StatusCode::UNPROCESSABLE_ENTITY,
        ),
        (AppError::Forbidden("x".into()), StatusCode::FORBIDDEN),
        (AppError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
        (AppError::DeliveryFailure("x".into()), StatusCode::BAD_GATEWAY),
        (
            AppError::StoreUnavailable("x".into()),
            StatusCode::SERVICE_UNAVAILABLE,
        ),
    ];

    for (err, status) in cases {
        assert_eq!(err.into_response().status(), status);
    }
}

#[test]
fn test_mutation_errors_map_to_caller_categories() {
    assert!(matches!(
        AppError::from(MutationError::PollNotFound("p".into())),
        AppError::NotFound(_)
    ));
    assert!(matches!(
        AppError::from(MutationError::NotPollCreator("p".into())),
        AppError::Forbidden(_)
    ));
    assert!(matches!(
        AppError::from(MutationError::OptionNotFound {
            poll_id: "p".into(),
            option: "Wed".into()
        }),
        AppError::InvalidState(_)
    ));
    assert!(matches!(
        AppError::from(MutationError::DuplicateEmail("a@example.com".into())),
        AppError::InvalidState(_)
    ));
}

#[test]
fn test_retryable_errors() {
    assert!(AppError::Conflict("x".into()).is_retryable());
    assert!(AppError::StoreUnavailable("x".into()).is_retryable());
    assert!(!AppError::InvalidState("x".into()).is_retryable());
    assert!(!AppError::NotFound("x".into()).is_retryable());
}

#[tokio::test]
async fn test_offline_store_is_unavailable() {
    let db = FirestoreDb::new_mock();

    let err = db
        .load(&DocumentKey::new("events", "e1"))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::StoreUnavailable(_)));
}
