//! Catalog administration endpoints.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use trove_core::CatalogItemId;

use crate::app::{dto, errors};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/items", get(list_items).post(create_item))
        .route("/items/:id", get(get_item).put(update_item))
}

fn parse_id(id: &str) -> Result<CatalogItemId, axum::response::Response> {
    id.parse()
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid catalog item id"))
}

pub async fn list_items(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.catalog().list().await {
        Ok(items) => {
            let body: Vec<serde_json::Value> = items.iter().map(dto::catalog_item_to_json).collect();
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn get_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.catalog().get(id).await {
        Ok(item) => (StatusCode::OK, Json(dto::catalog_item_to_json(&item))).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn create_item(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::CreateCatalogItemRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(v) => v,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };

    match services.catalog().create(body.into()).await {
        Ok(item) => (StatusCode::CREATED, Json(dto::catalog_item_to_json(&item))).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn update_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<dto::UpdateCatalogItemRequest>, JsonRejection>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Json(body) = match body {
        Ok(v) => v,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };

    match services.catalog().update(id, body.into()).await {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}
