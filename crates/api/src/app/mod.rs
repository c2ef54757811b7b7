//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store selection and service construction
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;
use std::time::Duration;

use axum::{
    error_handling::HandleErrorLayer,
    http::StatusCode,
    response::Response,
    routing::get,
    BoxError, Extension, Router,
};
use tower::ServiceBuilder;

use trove_infra::AppConfig;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::{AppServices, ServicesError};

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(config: &AppConfig) -> Result<Router, ServicesError> {
    let services = Arc::new(services::build_services(config).await?);
    Ok(router(services, config.request_timeout))
}

/// Router over already-constructed services.
pub fn router(services: Arc<AppServices>, request_timeout: Duration) -> Router {
    Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::router())
        .layer(Extension(services))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_middleware_error))
                .timeout(request_timeout),
        )
}

async fn handle_middleware_error(err: BoxError) -> Response {
    if err.is::<tower::timeout::error::Elapsed>() {
        errors::json_error(StatusCode::REQUEST_TIMEOUT, "timeout", "request deadline exceeded")
    } else {
        errors::json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", err.to_string())
    }
}
