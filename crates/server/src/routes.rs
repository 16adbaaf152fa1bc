//! Route configuration.

use crate::handlers;
use crate::metrics::metrics_handler;
use crate::state::AppState;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/v1/health", get(handlers::health_check))
        .route(
            "/v1/files/{category}/{file_name}",
            get(handlers::download_file)
                .put(handlers::upload_file)
                // Uploads are streamed to disk, never buffered.
                .layer(DefaultBodyLimit::disable()),
        )
        .route(
            "/v1/files/{category}/{file_name}/merge",
            post(handlers::merge_file),
        )
        .route(
            "/v1/files/{category}/{file_name}/size",
            get(handlers::file_size),
        )
        .route(
            "/v1/files/{category}/{file_name}/info",
            get(handlers::file_info),
        );

    let mut router = Router::new().merge(api_routes);

    if state.config.server.metrics_enabled {
        let metrics_routes = Router::new().route("/metrics", get(metrics_handler));
        router = router.merge(metrics_routes);
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
