pub mod admin;
pub mod auth;
pub mod comments;
pub mod posts;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::state::AppState;

/// Full HTTP surface: every router merged, envelope-shaped fallbacks,
/// permissive CORS and request tracing.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(auth::router())
        .merge(posts::router())
        .merge(comments::router())
        .merge(admin::router())
        .fallback(route_not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn route_not_found() -> AppError {
    AppError::NotFound("Route")
}

async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}
