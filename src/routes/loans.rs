//! Borrower loan route definitions

use axum::{routing::get, routing::post, Router};

use crate::handlers;
use crate::state::AppState;

pub fn loan_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/loans",
            post(handlers::create_loan).get(handlers::list_loans),
        )
        .route("/api/loans/:id", get(handlers::get_loan))
        .route("/api/loans/:id/history", get(handlers::get_loan_history))
        .route("/api/loans/:id/documents", post(handlers::add_loan_document))
}
