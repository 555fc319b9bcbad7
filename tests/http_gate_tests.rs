//! HTTP access-control tests
//!
//! Drives the composed router with `tower::ServiceExt::oneshot` to check
//! that missing credentials and insufficient roles surface as distinct
//! status codes at the API boundary.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use tower::ServiceExt;
use uuid::Uuid;

use loanflow_server::auth::jwt::{issue_access_token, TokenVerifier};
use loanflow_server::config::WorkflowOptions;
use loanflow_server::identity::{IdentityError, IdentityProvider};
use loanflow_server::loan_service::LoanService;
use loanflow_server::notification_service::NotificationService;
use loanflow_server::notifier::Notifier;
use loanflow_server::rider_service::RiderService;
use loanflow_server::routes;
use loanflow_server::state::AppState;
use loanflow_server::store::memory::MemoryStore;
use loanflow_server::store::Store;

const TEST_SECRET: &str = "gate-test-secret";

struct NoIdentity;

#[async_trait::async_trait]
impl IdentityProvider for NoIdentity {
    async fn provision_account(
        &self,
        _email: &str,
        _password: &str,
    ) -> Result<Uuid, IdentityError> {
        Ok(Uuid::new_v4())
    }

    async fn delete_account(&self, _user_id: Uuid) -> Result<(), IdentityError> {
        Ok(())
    }
}

fn test_router() -> axum::Router {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let notifier = Notifier::new(store.clone());
    let verifier = Arc::new(TokenVerifier::new(TEST_SECRET));

    let state = AppState::new(
        LoanService::new(store.clone(), notifier.clone()),
        RiderService::new(
            store.clone(),
            notifier,
            Arc::new(NoIdentity),
            WorkflowOptions::default(),
        ),
        NotificationService::new(store),
        verifier,
    );

    routes::app_router(state)
}

fn bearer(roles: &[&str]) -> String {
    let token = issue_access_token(
        Uuid::new_v4(),
        "actor@example.com",
        roles,
        TEST_SECRET,
        900,
    )
    .unwrap();
    format!("Bearer {}", token)
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = test_router();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/admin/loans")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_garbage_token_is_unauthorized() {
    let app = test_router();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/notifications")
                .header(header::AUTHORIZATION, "Bearer not.a.token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_wrong_secret_token_is_unauthorized() {
    let app = test_router();
    let forged = issue_access_token(
        Uuid::new_v4(),
        "actor@example.com",
        &["admin"],
        "some-other-secret",
        900,
    )
    .unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/admin/loans")
                .header(header::AUTHORIZATION, format!("Bearer {}", forged))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_borrower_token_on_admin_route_is_forbidden() {
    let app = test_router();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/admin/loans")
                .header(header::AUTHORIZATION, bearer(&["borrower"]))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_token_on_admin_route_succeeds() {
    let app = test_router();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/admin/loans")
                .header(header::AUTHORIZATION, bearer(&["admin"]))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_rider_route_requires_rider_role() {
    let app = test_router();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/rider/metrics")
                .header(header::AUTHORIZATION, bearer(&["borrower"]))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_health_is_open() {
    let app = test_router();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
