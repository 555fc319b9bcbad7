//! Persistence layer for the origination workflow
//!
//! All state lives behind the [`Store`] trait so the client is an explicit
//! constructor argument of every service rather than ambient global state.
//! [`postgres::PgStore`] is the production implementation;
//! [`memory::MemoryStore`] backs the test suite and local development.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::Role;
use crate::error::ApiError;
use crate::models::{
    AssignmentStatus, Loan, LoanDocument, LoanStatus, LoanStatusHistory, Notification, Rider,
    RiderAssignment, User,
};

/// Persistence errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("row not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Conflict(db.to_string())
            }
            other => StoreError::Backend(other.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ApiError::NotFound("Resource not found".to_string()),
            StoreError::Conflict(msg) => ApiError::Conflict(msg),
            StoreError::Backend(msg) => ApiError::DatabaseError(msg),
        }
    }
}

/// Result alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// The workflow's persistence client.
///
/// Every operation is a single logical transaction against the backing
/// store; reads are snapshot reads with whatever isolation the store
/// provides by default.
#[async_trait]
pub trait Store: Send + Sync {
    // ----- users -----

    async fn insert_user(&self, user: &User) -> StoreResult<()>;

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn get_users_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<User>>;

    /// Removes the profile and any role grants (compensating action for
    /// failed provisioning)
    async fn delete_user(&self, id: Uuid) -> StoreResult<()>;

    async fn grant_role(&self, user_id: Uuid, role: Role) -> StoreResult<()>;

    // ----- loans -----

    async fn insert_loan(&self, loan: &Loan) -> StoreResult<()>;

    async fn get_loan(&self, id: Uuid) -> StoreResult<Option<Loan>>;

    /// Full-row update; fails with `NotFound` if the loan no longer exists
    async fn update_loan(&self, loan: &Loan) -> StoreResult<Loan>;

    /// Borrower's loans, newest application first
    async fn list_loans_for_borrower(
        &self,
        borrower_id: Uuid,
        status: Option<LoanStatus>,
    ) -> StoreResult<Vec<Loan>>;

    /// All loans, newest application first
    async fn list_loans(&self, status: Option<LoanStatus>) -> StoreResult<Vec<Loan>>;

    async fn insert_status_history(&self, entry: &LoanStatusHistory) -> StoreResult<()>;

    /// History entries, newest first
    async fn list_status_history(&self, loan_id: Uuid) -> StoreResult<Vec<LoanStatusHistory>>;

    async fn insert_document(&self, document: &LoanDocument) -> StoreResult<()>;

    async fn list_documents(&self, loan_id: Uuid) -> StoreResult<Vec<LoanDocument>>;

    // ----- riders -----

    async fn insert_rider(&self, rider: &Rider) -> StoreResult<()>;

    async fn get_rider(&self, id: Uuid) -> StoreResult<Option<Rider>>;

    async fn find_rider_by_user(&self, user_id: Uuid) -> StoreResult<Option<Rider>>;

    async fn update_rider(&self, rider: &Rider) -> StoreResult<Rider>;

    /// All riders, newest first
    async fn list_riders(&self) -> StoreResult<Vec<Rider>>;

    // ----- assignments -----

    async fn insert_assignment(&self, assignment: &RiderAssignment) -> StoreResult<()>;

    async fn get_assignment(&self, id: Uuid) -> StoreResult<Option<RiderAssignment>>;

    async fn update_assignment(
        &self,
        assignment: &RiderAssignment,
    ) -> StoreResult<RiderAssignment>;

    /// Rider's assignments, newest first
    async fn list_assignments_for_rider(
        &self,
        rider_id: Uuid,
    ) -> StoreResult<Vec<RiderAssignment>>;

    /// Count of assignments in `assigned` or `in_progress` for the rider,
    /// computed at query time
    async fn count_active_assignments_for_rider(&self, rider_id: Uuid) -> StoreResult<i64>;

    /// The loan's active (`assigned` or `in_progress`) assignment, if any
    async fn find_active_assignment_for_loan(
        &self,
        loan_id: Uuid,
    ) -> StoreResult<Option<RiderAssignment>>;

    // ----- notifications -----

    async fn insert_notification(&self, notification: &Notification) -> StoreResult<()>;

    /// User's notifications, newest first
    async fn list_notifications_for_user(&self, user_id: Uuid)
        -> StoreResult<Vec<Notification>>;

    /// Mark one notification read; `None` when the id does not resolve to a
    /// notification owned by `user_id`
    async fn mark_notification_read(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<Notification>>;

    /// Mark all of the user's unread notifications read; returns the count
    async fn mark_all_notifications_read(&self, user_id: Uuid) -> StoreResult<u64>;
}

/// Whether an assignment still occupies rider capacity
pub(crate) fn is_active_assignment(status: AssignmentStatus) -> bool {
    matches!(
        status,
        AssignmentStatus::Assigned | AssignmentStatus::InProgress
    )
}
