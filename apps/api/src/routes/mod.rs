pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::jobs::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Generation pipeline
        .route(
            "/api/v1/regenerate-content",
            post(handlers::handle_regenerate),
        )
        // Processing triggers: the proxy route and the direct route answer
        // identically so the client-side transport resolver can reach
        // whichever one its environment can route to.
        .route(
            "/api/v1/proxy-process-job",
            post(handlers::handle_process_post).get(handlers::handle_process_get),
        )
        .route(
            "/api/v1/personalize-content/process",
            post(handlers::handle_process_post).get(handlers::handle_process_get),
        )
        .route(
            "/api/v1/courses/:id/enrollment",
            get(handlers::handle_enrollment_status),
        )
        .with_state(state)
}
