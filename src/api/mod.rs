//! API module
//!
//! HTTP endpoints, extractors and middleware.

pub mod extract;
pub mod middleware;
pub mod routes;

use axum::{routing::get, Router};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::context::AppContext;

pub use routes::create_router;

/// Build the application router
pub fn build_router(ctx: AppContext) -> Router {
    // Note: Axum layers are applied in reverse order (last added = first executed)
    // Order: request-id -> trace -> logging -> auth -> handler
    let protected_routes = create_router().route_layer(axum::middleware::from_fn_with_state(
        ctx.clone(),
        middleware::auth_middleware,
    ));

    Router::new()
        // Health check (no auth)
        .route("/health", get(health_check))
        .merge(protected_routes)
        .layer(axum::middleware::from_fn(middleware::logging_middleware))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(ctx)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
