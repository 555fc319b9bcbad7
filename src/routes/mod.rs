//! Route definitions for the LoanFlow API

mod admin;
mod loans;
mod notifications;
mod rider;

use axum::{routing::get, Json, Router};

pub use admin::admin_routes;
pub use loans::loan_routes;
pub use notifications::notification_routes;
pub use rider::rider_routes;

use crate::state::AppState;

/// Health check response
#[derive(serde::Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn root() -> &'static str {
    "LoanFlow API Server"
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Compose the full API router over the given state
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .merge(loan_routes())
        .merge(admin_routes())
        .merge(rider_routes())
        .merge(notification_routes())
        .with_state(state)
}
