use axum::Router;

pub mod catalog;
pub mod items;
pub mod system;

/// Router for every resource endpoint.
pub fn router() -> Router {
    Router::new()
        .merge(items::router())
        .nest("/catalog", catalog::router())
}
