use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use super::{handlers, jobs, middleware::metrics_middleware};
use crate::state::AppState;

/// Room for multipart boundaries and part headers on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn create_router(state: Arc<AppState>) -> Router {
    let body_limit = state
        .config()
        .staging
        .max_upload_bytes
        .saturating_add(MULTIPART_OVERHEAD_BYTES);
    let serve_dir = state.config().result.serve_dir.clone();

    // API routes
    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/jobs",
            post(jobs::submit_job).layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state);

    let mut router = Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics));

    // Published artifacts, when the unit writes them somewhere we can serve
    if let Some(dir) = serve_dir {
        router = router.nest_service("/results", ServeDir::new(dir));
    }

    router
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
