//! HTTP API server
//!
//! Every resource lives in its own module and exposes `router()`. This module
//! composes them: unversioned routes at the root, versioned ones nested under
//! the configured prefix (`/api/v1` by default).

use axum::{
    http::{HeaderValue, Uri},
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod error;
pub mod extract;
pub mod healthcheck;
pub mod logs;
pub mod state;
pub mod users;

pub use error::ApiError;
pub use state::AppState;

/// Routes served under the v1 prefix
pub fn v1_router() -> Router<AppState> {
    Router::new().merge(logs::router()).merge(users::router())
}

/// Build the API router using the provided application state
pub fn create_router(state: AppState) -> Router {
    let prefix = state.settings.api.v1_prefix.clone();
    let cors = cors_layer(&state.settings.api.cors_origins);

    Router::new()
        .merge(healthcheck::router())
        .nest(&prefix, v1_router())
        .fallback(fallback)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

async fn fallback(uri: Uri) -> ApiError {
    tracing::debug!(%uri, "No route matched");
    ApiError::not_found("not found")
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() || origins.iter().any(|origin| origin.trim() == "*") {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}
