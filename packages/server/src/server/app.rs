//! Application setup and server configuration.

use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method,
    },
    routing::{get, post},
    Extension, Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::kernel::AppDeps;
use crate::server::routes::{health, runs, schedules, targets};

/// Shared application state, injected into every handler via `Extension`.
pub type AppState = AppDeps;

/// Builds the Axum application router: the full HTTP Query API plus health.
pub fn build_app(deps: AppDeps, allowed_origins: Vec<String>) -> Router {
    let cors = if allowed_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([AUTHORIZATION, CONTENT_TYPE])
    } else {
        let origins: Vec<_> = allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([AUTHORIZATION, CONTENT_TYPE])
    };

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/targets", post(targets::create_target_handler))
        .route(
            "/targets/{id}",
            get(targets::get_target_handler)
                .put(targets::update_target_handler)
                .delete(targets::delete_target_handler),
        )
        .route("/schedules", post(schedules::create_schedule_handler))
        .route(
            "/schedules/{id}",
            get(schedules::get_schedule_handler)
                .put(schedules::update_schedule_handler)
                .delete(schedules::delete_schedule_handler),
        )
        .route("/schedules/{id}/pause", post(schedules::pause_schedule_handler))
        .route("/schedules/{id}/resume", post(schedules::resume_schedule_handler))
        .route("/runs", get(runs::list_runs_handler))
        .route("/runs/{id}", get(runs::get_run_handler))
        .layer(Extension(deps))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
