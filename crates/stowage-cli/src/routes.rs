//! HTTP route definitions

use crate::{handlers, middleware, proxy, AppState};
use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{any, get},
    Router,
};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main router
pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS configuration (action API only; the proxy sets its own headers)
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers(Any);

    let api = Router::new()
        .route(
            &state.config.api_path,
            get(handlers::action_handler).post(handlers::action_handler),
        )
        .layer(cors)
        .layer(CompressionLayer::new());

    let proxy_route = format!("{}/{{*path}}", state.config.proxy_prefix());
    let proxy = Router::new().route(&proxy_route, any(proxy::proxy_handler));

    Router::new()
        .route("/health", get(handlers::health_check))
        .merge(api)
        .merge(proxy)
        // Apply middleware
        .layer(axum_middleware::from_fn(middleware::logging_middleware))
        .layer(axum_middleware::from_fn(middleware::request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(state.config.max_body_size))
        .with_state(state)
}
