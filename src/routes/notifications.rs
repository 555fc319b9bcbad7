//! Notification route definitions

use axum::{routing::get, routing::put, Router};

use crate::handlers;
use crate::state::AppState;

pub fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/api/notifications", get(handlers::list_notifications))
        .route(
            "/api/notifications/read-all",
            put(handlers::mark_all_notifications_read),
        )
        .route(
            "/api/notifications/:id/read",
            put(handlers::mark_notification_read),
        )
}
