//! Owned inventory: grant items to a user and list what they own.

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Extension, Query,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use trove_core::UserId;

use crate::app::{dto, errors};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new().route("/items", get(list_items).post(grant_items))
}

pub async fn list_items(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<dto::ListItemsQuery>, QueryRejection>,
) -> axum::response::Response {
    let Query(query) = match query {
        Ok(v) => v,
        Err(rejection) => return errors::query_rejection_to_response(rejection),
    };
    let raw = query.user_id.unwrap_or_default();
    if raw.trim().is_empty() {
        return errors::json_error(StatusCode::BAD_REQUEST, "validation_error", "userId is required");
    }
    let user_id: UserId = match raw.parse() {
        Ok(v) => v,
        Err(e) => return errors::json_error(StatusCode::BAD_REQUEST, "validation_error", format!("{e}")),
    };

    match services.reconciler().list_user_items(user_id).await {
        Ok(views) => {
            let body: Vec<serde_json::Value> = views.iter().map(dto::item_view_to_json).collect();
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => errors::reconcile_error_to_response(e),
    }
}

pub async fn grant_items(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::GrantItemsRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(v) => v,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };
    let cmd = match body.into_command() {
        Ok(cmd) => cmd,
        Err(e) => return errors::json_error(StatusCode::BAD_REQUEST, "validation_error", format!("{e}")),
    };

    match services.reconciler().grant_item(cmd).await {
        Ok(record) => (StatusCode::OK, Json(dto::inventory_record_to_json(&record))).into_response(),
        Err(e) => errors::reconcile_error_to_response(e),
    }
}
