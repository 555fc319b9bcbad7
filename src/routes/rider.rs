//! Rider route definitions

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::handlers;
use crate::state::AppState;

pub fn rider_routes() -> Router<AppState> {
    Router::new()
        .route("/api/rider/assignments", get(handlers::get_assignments))
        .route(
            "/api/rider/assignments/:id/status",
            put(handlers::update_assignment_status),
        )
        .route(
            "/api/rider/assignments/:id/notes",
            post(handlers::add_assignment_notes),
        )
        .route("/api/rider/availability", put(handlers::update_availability))
        .route("/api/rider/metrics", get(handlers::rider_metrics))
}
