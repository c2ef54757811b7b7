use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use trove_infra::{CatalogError, ReconcileError};

pub fn reconcile_error_to_response(err: ReconcileError) -> axum::response::Response {
    match err {
        ReconcileError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        ReconcileError::InvariantViolation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg)
        }
        e @ ReconcileError::DanglingReference { .. } => {
            json_error(StatusCode::CONFLICT, "dangling_reference", e.to_string())
        }
        e @ ReconcileError::Contention { .. } => json_error(StatusCode::CONFLICT, "conflict", e.to_string()),
        ReconcileError::Store(e) => json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", e.to_string()),
    }
}

pub fn catalog_error_to_response(err: CatalogError) -> axum::response::Response {
    match err {
        CatalogError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        e @ CatalogError::NotFound(_) => json_error(StatusCode::NOT_FOUND, "not_found", e.to_string()),
        CatalogError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        CatalogError::Store(e) => json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", e.to_string()),
    }
}

/// Malformed or missing JSON bodies are caller errors.
pub fn json_rejection_to_response(rejection: JsonRejection) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "validation_error", rejection.body_text())
}

pub fn query_rejection_to_response(rejection: QueryRejection) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "validation_error", rejection.body_text())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
