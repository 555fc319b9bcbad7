//! Admin route definitions

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::handlers;
use crate::state::AppState;

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/loans", get(handlers::list_all_loans))
        .route("/api/admin/loans/:id", put(handlers::update_loan_status))
        .route("/api/admin/loans/:id/assign", post(handlers::assign_rider))
        .route(
            "/api/admin/riders",
            get(handlers::list_riders).post(handlers::create_rider),
        )
        .route("/api/admin/metrics", get(handlers::admin_metrics))
}
