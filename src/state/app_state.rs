//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;

use crate::auth::jwt::TokenVerifier;
use crate::loan_service::LoanService;
use crate::notification_service::NotificationService;
use crate::rider_service::RiderService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub loan_service: LoanService,
    pub rider_service: RiderService,
    pub notification_service: NotificationService,
    pub verifier: Arc<TokenVerifier>,
}

impl AppState {
    pub fn new(
        loan_service: LoanService,
        rider_service: RiderService,
        notification_service: NotificationService,
        verifier: Arc<TokenVerifier>,
    ) -> Self {
        Self {
            loan_service,
            rider_service,
            notification_service,
            verifier,
        }
    }
}

impl FromRef<AppState> for LoanService {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.loan_service.clone()
    }
}

impl FromRef<AppState> for RiderService {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.rider_service.clone()
    }
}

impl FromRef<AppState> for NotificationService {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.notification_service.clone()
    }
}

impl FromRef<AppState> for Arc<TokenVerifier> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.verifier.clone()
    }
}
