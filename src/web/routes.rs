use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use super::handlers;
use super::state::AppState;

// Service routes
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(handlers::status::root))
        .route("/health", get(handlers::status::health))
        .route("/generate-sql", post(handlers::api::generate_sql))
        .route("/schema", get(handlers::api::get_schema))
        .route("/schema/reload", post(handlers::api::reload_schema))
}

/// Builds the CORS policy. A `*` entry allows any origin, without credentials.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request());

    if origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(AllowOrigin::any());
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring invalid CORS origin '{}': {}", origin, e);
                None
            }
        })
        .collect();

    layer
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
}

pub fn app(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.web.allowed_origins());

    api_routes()
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
