//! API Routes
//!
//! Configures the Axum router with all admin endpoints.

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_handler, health_handler, inspect_handler, invalidate_handler,
    invalidate_pattern_handler, set_handler, stats_handler, AppState,
};

/// Creates the admin router.
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .route("/entries", put(set_handler).delete(clear_handler))
        .route(
            "/entries/:key",
            get(inspect_handler).delete(invalidate_handler),
        )
        .route("/invalidate", post(invalidate_pattern_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
