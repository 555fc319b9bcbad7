//! Loan origination workflow tests
//!
//! Exercises the lifecycle engine, rider assignment manager and
//! notification side effects end to end over the in-memory store.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use loanflow_server::auth::{AuthContext, Role, RoleSet};
use loanflow_server::calculator;
use loanflow_server::config::WorkflowOptions;
use loanflow_server::identity::{IdentityError, IdentityProvider};
use loanflow_server::loan_service::LoanService;
use loanflow_server::models::{
    AssignmentStatus, CreateLoanRequest, CreateRiderRequest, Loan, LoanProductType, LoanStatus,
    RiderStatus, User,
};
use loanflow_server::notification_service::NotificationService;
use loanflow_server::notifier::Notifier;
use loanflow_server::rider_service::RiderService;
use loanflow_server::store::memory::MemoryStore;
use loanflow_server::store::Store;

/// Identity double: fresh ids, records deletions
struct TestIdentity {
    fixed_id: Option<Uuid>,
    fail_provision: bool,
    provisioned: Mutex<Vec<Uuid>>,
    deleted: Mutex<Vec<Uuid>>,
}

impl TestIdentity {
    fn new() -> Self {
        Self {
            fixed_id: None,
            fail_provision: false,
            provisioned: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
        }
    }

    fn failing() -> Self {
        Self {
            fail_provision: true,
            ..Self::new()
        }
    }

    fn with_fixed_id(id: Uuid) -> Self {
        Self {
            fixed_id: Some(id),
            ..Self::new()
        }
    }
}

#[async_trait]
impl IdentityProvider for TestIdentity {
    async fn provision_account(
        &self,
        _email: &str,
        _password: &str,
    ) -> Result<Uuid, IdentityError> {
        if self.fail_provision {
            return Err(IdentityError::Rejected("identity provider down".to_string()));
        }
        let id = self.fixed_id.unwrap_or_else(Uuid::new_v4);
        self.provisioned.lock().unwrap().push(id);
        Ok(id)
    }

    async fn delete_account(&self, user_id: Uuid) -> Result<(), IdentityError> {
        self.deleted.lock().unwrap().push(user_id);
        Ok(())
    }
}

struct TestApp {
    store: Arc<MemoryStore>,
    identity: Arc<TestIdentity>,
    loans: LoanService,
    riders: RiderService,
    notifications: NotificationService,
}

fn build_app(options: WorkflowOptions, identity: TestIdentity) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let dyn_store: Arc<dyn Store> = store.clone();
    let notifier = Notifier::new(dyn_store.clone());
    let identity = Arc::new(identity);

    TestApp {
        store,
        identity: identity.clone(),
        loans: LoanService::new(dyn_store.clone(), notifier.clone()),
        riders: RiderService::new(dyn_store.clone(), notifier.clone(), identity, options),
        notifications: NotificationService::new(dyn_store),
    }
}

fn test_app() -> TestApp {
    build_app(WorkflowOptions::default(), TestIdentity::new())
}

fn actor(roles: &[Role]) -> AuthContext {
    AuthContext {
        user_id: Uuid::new_v4(),
        email: format!("{}@example.com", Uuid::new_v4()),
        roles: RoleSet::of(roles),
    }
}

/// Insert a profile row so admin listings can enrich with display info
async fn seed_profile(app: &TestApp, ctx: &AuthContext, name: &str) {
    let now = Utc::now();
    app.store
        .insert_user(&User {
            id: ctx.user_id,
            email: ctx.email.clone(),
            full_name: name.to_string(),
            phone: None,
            created_at: now,
            updated_at: now,
        })
        .await
        .unwrap();
}

fn personal_loan_request() -> CreateLoanRequest {
    CreateLoanRequest {
        product_type: LoanProductType::Personal,
        amount: 5_000.0,
        term_months: 12,
        interest_rate: 10.0,
        purpose: Some("working capital".to_string()),
    }
}

async fn create_pending_loan(app: &TestApp, borrower: &AuthContext) -> Loan {
    app.loans
        .create(borrower, personal_loan_request())
        .await
        .unwrap()
}

/// Provision a rider and return (rider context, rider id)
async fn provision_rider(app: &TestApp, admin: &AuthContext) -> (AuthContext, Uuid) {
    let response = app
        .riders
        .create_rider(
            admin,
            CreateRiderRequest {
                email: format!("{}@riders.example.com", Uuid::new_v4()),
                full_name: "Test Rider".to_string(),
                phone: None,
                zone: Some("north".to_string()),
                max_assignments: None,
            },
        )
        .await
        .unwrap();

    let ctx = AuthContext {
        user_id: response.rider.user_id,
        email: response.email,
        roles: RoleSet::of(&[Role::Rider]),
    };
    (ctx, response.rider.id)
}

// ============================================================================
// Loan creation
// ============================================================================

#[tokio::test]
async fn test_create_loan_starts_pending_with_computed_repayment() {
    let app = test_app();
    let borrower = actor(&[Role::Borrower]);

    let loan = create_pending_loan(&app, &borrower).await;

    assert_eq!(loan.status, LoanStatus::Pending);
    assert_eq!(loan.borrower_id, borrower.user_id);
    assert!(loan.rider_id.is_none());

    // Repayment figures come from the amortization formula, nothing else
    let quote = calculator::calculate(5_000.0, 10.0, 12).unwrap();
    assert_eq!(loan.monthly_payment, quote.monthly_payment);
    assert_eq!(loan.total_repayment, quote.total_payment);

    // Submission notification
    let feed = app.notifications.list(&borrower).await.unwrap();
    assert_eq!(feed.notifications.len(), 1);
    assert_eq!(feed.unread_count, 1);
    assert_eq!(feed.notifications[0].title, "Loan Application Submitted");
}

#[tokio::test]
async fn test_create_loan_outside_product_bounds_persists_nothing() {
    let app = test_app();
    let borrower = actor(&[Role::Borrower]);

    let too_small = CreateLoanRequest {
        amount: 500.0,
        ..personal_loan_request()
    };
    let err = app.loans.create(&borrower, too_small).await.unwrap_err();
    assert_eq!(err.error_code(), "VALIDATION_ERROR");

    let too_long = CreateLoanRequest {
        term_months: 120,
        ..personal_loan_request()
    };
    let err = app.loans.create(&borrower, too_long).await.unwrap_err();
    assert_eq!(err.error_code(), "VALIDATION_ERROR");

    // Nothing persisted, nothing notified
    assert!(app.store.list_loans(None).await.unwrap().is_empty());
    let feed = app.notifications.list(&borrower).await.unwrap();
    assert!(feed.notifications.is_empty());
}

#[tokio::test]
async fn test_create_loan_rejects_invalid_numbers() {
    let app = test_app();
    let borrower = actor(&[Role::Borrower]);

    let negative_rate = CreateLoanRequest {
        interest_rate: -1.0,
        ..personal_loan_request()
    };
    let err = app.loans.create(&borrower, negative_rate).await.unwrap_err();
    assert_eq!(err.error_code(), "VALIDATION_ERROR");

    let zero_amount = CreateLoanRequest {
        amount: 0.0,
        ..personal_loan_request()
    };
    let err = app.loans.create(&borrower, zero_amount).await.unwrap_err();
    assert_eq!(err.error_code(), "VALIDATION_ERROR");
}

// ============================================================================
// Status transitions and notifications
// ============================================================================

#[tokio::test]
async fn test_each_status_transition_notifies_with_exact_message() {
    let cases = [
        (
            LoanStatus::Reviewing,
            "Your loan application is now under review",
        ),
        (
            LoanStatus::Approved,
            "Congratulations! Your loan has been approved",
        ),
        (
            LoanStatus::Rejected,
            "Your loan application has been reviewed",
        ),
        (LoanStatus::Disbursed, "Your loan has been disbursed"),
        (LoanStatus::Active, "Your loan is now active"),
        (LoanStatus::Closed, "Your loan has been closed"),
    ];

    for (status, expected_message) in cases {
        let app = test_app();
        let borrower = actor(&[Role::Borrower]);
        let admin = actor(&[Role::Admin]);
        let loan = create_pending_loan(&app, &borrower).await;

        let updated = app
            .loans
            .update_status(&admin, loan.id, status, None)
            .await
            .unwrap();
        assert_eq!(updated.status, status);
        assert_eq!(updated.reviewed_by, Some(admin.user_id));
        assert!(updated.reviewed_at.is_some());

        let feed = app.notifications.list(&borrower).await.unwrap();
        // Exactly one status notification on top of the submission one
        assert_eq!(feed.notifications.len(), 2);
        assert_eq!(feed.notifications[0].message, expected_message);
    }
}

#[tokio::test]
async fn test_milestone_timestamps_survive_later_transitions() {
    let app = test_app();
    let borrower = actor(&[Role::Borrower]);
    let admin = actor(&[Role::Admin]);
    let loan = create_pending_loan(&app, &borrower).await;

    let approved = app
        .loans
        .update_status(&admin, loan.id, LoanStatus::Approved, None)
        .await
        .unwrap();
    let approved_at = approved.approved_at.expect("approved_at set");

    let disbursed = app
        .loans
        .update_status(&admin, loan.id, LoanStatus::Disbursed, None)
        .await
        .unwrap();
    assert_eq!(disbursed.approved_at, Some(approved_at));
    let disbursed_at = disbursed.disbursed_at.expect("disbursed_at set");

    let active = app
        .loans
        .update_status(&admin, loan.id, LoanStatus::Active, None)
        .await
        .unwrap();
    assert_eq!(active.approved_at, Some(approved_at));
    assert_eq!(active.disbursed_at, Some(disbursed_at));
}

#[tokio::test]
async fn test_repeated_transition_keeps_timestamp_and_refires_notification() {
    let app = test_app();
    let borrower = actor(&[Role::Borrower]);
    let admin = actor(&[Role::Admin]);
    let loan = create_pending_loan(&app, &borrower).await;

    let first = app
        .loans
        .update_status(&admin, loan.id, LoanStatus::Approved, None)
        .await
        .unwrap();
    let approved_at = first.approved_at.unwrap();

    let second = app
        .loans
        .update_status(&admin, loan.id, LoanStatus::Approved, None)
        .await
        .unwrap();

    // Idempotent on the timestamp, but the notification fires again
    assert_eq!(second.approved_at, Some(approved_at));
    let feed = app.notifications.list(&borrower).await.unwrap();
    let approvals = feed
        .notifications
        .iter()
        .filter(|n| n.message == "Congratulations! Your loan has been approved")
        .count();
    assert_eq!(approvals, 2);
}

#[tokio::test]
async fn test_terminal_states_accept_no_further_transitions() {
    let app = test_app();
    let borrower = actor(&[Role::Borrower]);
    let admin = actor(&[Role::Admin]);
    let loan = create_pending_loan(&app, &borrower).await;

    app.loans
        .update_status(&admin, loan.id, LoanStatus::Rejected, None)
        .await
        .unwrap();

    let err = app
        .loans
        .update_status(&admin, loan.id, LoanStatus::Approved, None)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "VALIDATION_ERROR");

    let unchanged = app.store.get_loan(loan.id).await.unwrap().unwrap();
    assert_eq!(unchanged.status, LoanStatus::Rejected);
}

#[tokio::test]
async fn test_update_status_on_unknown_loan_is_not_found() {
    let app = test_app();
    let admin = actor(&[Role::Admin]);

    let err = app
        .loans
        .update_status(&admin, Uuid::new_v4(), LoanStatus::Approved, None)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "NOT_FOUND");
}

#[tokio::test]
async fn test_status_history_is_appended_per_transition() {
    let app = test_app();
    let borrower = actor(&[Role::Borrower]);
    let admin = actor(&[Role::Admin]);
    let loan = create_pending_loan(&app, &borrower).await;

    app.loans
        .update_status(&admin, loan.id, LoanStatus::Reviewing, Some("checking docs".into()))
        .await
        .unwrap();
    app.loans
        .update_status(&admin, loan.id, LoanStatus::Approved, None)
        .await
        .unwrap();

    let history = app.loans.status_history(&borrower, loan.id).await.unwrap();
    // Creation entry plus two transitions, newest first
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].new_status, LoanStatus::Approved);
    assert_eq!(history[0].old_status, Some(LoanStatus::Reviewing));
    assert_eq!(history[1].new_status, LoanStatus::Reviewing);
    assert_eq!(history[1].notes.as_deref(), Some("checking docs"));
    assert_eq!(history[2].new_status, LoanStatus::Pending);
    assert_eq!(history[2].old_status, None);
}

// ============================================================================
// Access control
// ============================================================================

#[tokio::test]
async fn test_non_admin_cannot_update_status_or_assign() {
    let app = test_app();
    let borrower = actor(&[Role::Borrower]);
    let loan = create_pending_loan(&app, &borrower).await;

    let err = app
        .loans
        .update_status(&borrower, loan.id, LoanStatus::Approved, None)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "FORBIDDEN");

    let rider = actor(&[Role::Rider]);
    let err = app
        .riders
        .assign_rider(&rider, loan.id, Uuid::new_v4())
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "FORBIDDEN");
}

#[tokio::test]
async fn test_borrower_cannot_list_all_loans() {
    let app = test_app();
    let borrower = actor(&[Role::Borrower]);

    let err = app.loans.list_all(&borrower, None).await.unwrap_err();
    assert_eq!(err.error_code(), "FORBIDDEN");
}

#[tokio::test]
async fn test_foreign_loan_reads_as_not_found() {
    let app = test_app();
    let owner = actor(&[Role::Borrower]);
    let other = actor(&[Role::Borrower]);
    let loan = create_pending_loan(&app, &owner).await;

    let err = app.loans.get_by_id(&other, loan.id).await.unwrap_err();
    assert_eq!(err.error_code(), "NOT_FOUND");

    // The owner and any admin still see it
    assert!(app.loans.get_by_id(&owner, loan.id).await.is_ok());
    let admin = actor(&[Role::Admin]);
    assert!(app.loans.get_by_id(&admin, loan.id).await.is_ok());
}

#[tokio::test]
async fn test_borrower_listing_is_scoped_and_filterable() {
    let app = test_app();
    let alice = actor(&[Role::Borrower]);
    let bob = actor(&[Role::Borrower]);
    let admin = actor(&[Role::Admin]);

    let a1 = create_pending_loan(&app, &alice).await;
    create_pending_loan(&app, &bob).await;
    app.loans
        .update_status(&admin, a1.id, LoanStatus::Approved, None)
        .await
        .unwrap();
    create_pending_loan(&app, &alice).await;

    let all_mine = app.loans.list_for_borrower(&alice, None).await.unwrap();
    assert_eq!(all_mine.len(), 2);
    assert!(all_mine.iter().all(|l| l.borrower_id == alice.user_id));

    let approved = app
        .loans
        .list_for_borrower(&alice, Some(LoanStatus::Approved))
        .await
        .unwrap();
    assert_eq!(approved.len(), 1);
    assert_eq!(approved[0].id, a1.id);
}

// ============================================================================
// Rider assignment
// ============================================================================

#[tokio::test]
async fn test_assign_rider_creates_record_and_notifies_both_parties() {
    let app = test_app();
    let borrower = actor(&[Role::Borrower]);
    let admin = actor(&[Role::Admin]);
    let loan = create_pending_loan(&app, &borrower).await;
    let (rider_ctx, rider_id) = provision_rider(&app, &admin).await;

    let updated = app
        .riders
        .assign_rider(&admin, loan.id, rider_id)
        .await
        .unwrap();
    assert_eq!(updated.rider_id, Some(rider_id));

    let assignments = app.store.list_assignments_for_rider(rider_id).await.unwrap();
    assert_eq!(assignments.len(), 1);
    assert_eq!(assignments[0].status, AssignmentStatus::Assigned);
    assert_eq!(assignments[0].assigned_by, Some(admin.user_id));

    let rider_feed = app.notifications.list(&rider_ctx).await.unwrap();
    assert_eq!(rider_feed.notifications.len(), 1);
    assert_eq!(rider_feed.notifications[0].title, "New Loan Assignment");

    let borrower_feed = app.notifications.list(&borrower).await.unwrap();
    assert_eq!(borrower_feed.notifications[0].title, "Rider Assigned");

    let rider = app.store.get_rider(rider_id).await.unwrap().unwrap();
    assert_eq!(rider.current_assignments, 1);
}

#[tokio::test]
async fn test_reassignment_keeps_both_records_without_enforcement() {
    let app = test_app();
    let borrower = actor(&[Role::Borrower]);
    let admin = actor(&[Role::Admin]);
    let loan = create_pending_loan(&app, &borrower).await;
    let (_, first_rider) = provision_rider(&app, &admin).await;
    let (_, second_rider) = provision_rider(&app, &admin).await;

    app.riders
        .assign_rider(&admin, loan.id, first_rider)
        .await
        .unwrap();
    let updated = app
        .riders
        .assign_rider(&admin, loan.id, second_rider)
        .await
        .unwrap();

    // The loan's single rider_id reflects the last write; both assignment
    // rows remain
    assert_eq!(updated.rider_id, Some(second_rider));
    assert_eq!(
        app.store
            .list_assignments_for_rider(first_rider)
            .await
            .unwrap()
            .len(),
        1
    );
    assert_eq!(
        app.store
            .list_assignments_for_rider(second_rider)
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn test_single_active_assignment_enforcement_conflicts() {
    let options = WorkflowOptions {
        enforce_single_active_assignment: true,
        ..WorkflowOptions::default()
    };
    let app = build_app(options, TestIdentity::new());
    let borrower = actor(&[Role::Borrower]);
    let admin = actor(&[Role::Admin]);
    let loan = create_pending_loan(&app, &borrower).await;
    let (_, first_rider) = provision_rider(&app, &admin).await;
    let (_, second_rider) = provision_rider(&app, &admin).await;

    app.riders
        .assign_rider(&admin, loan.id, first_rider)
        .await
        .unwrap();
    let err = app
        .riders
        .assign_rider(&admin, loan.id, second_rider)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "CONFLICT");
}

#[tokio::test]
async fn test_rider_capacity_enforcement_conflicts() {
    let options = WorkflowOptions {
        enforce_rider_capacity: true,
        ..WorkflowOptions::default()
    };
    let app = build_app(options, TestIdentity::new());
    let borrower = actor(&[Role::Borrower]);
    let admin = actor(&[Role::Admin]);

    let response = app
        .riders
        .create_rider(
            &admin,
            CreateRiderRequest {
                email: "capacity@riders.example.com".to_string(),
                full_name: "Busy Rider".to_string(),
                phone: None,
                zone: None,
                max_assignments: Some(1),
            },
        )
        .await
        .unwrap();

    let first = create_pending_loan(&app, &borrower).await;
    let second = create_pending_loan(&app, &borrower).await;

    app.riders
        .assign_rider(&admin, first.id, response.rider.id)
        .await
        .unwrap();
    let err = app
        .riders
        .assign_rider(&admin, second.id, response.rider.id)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "CONFLICT");
}

#[tokio::test]
async fn test_capacity_is_not_enforced_by_default() {
    let app = test_app();
    let borrower = actor(&[Role::Borrower]);
    let admin = actor(&[Role::Admin]);

    let response = app
        .riders
        .create_rider(
            &admin,
            CreateRiderRequest {
                email: "overloaded@riders.example.com".to_string(),
                full_name: "Overloaded Rider".to_string(),
                phone: None,
                zone: None,
                max_assignments: Some(1),
            },
        )
        .await
        .unwrap();

    let first = create_pending_loan(&app, &borrower).await;
    let second = create_pending_loan(&app, &borrower).await;

    app.riders
        .assign_rider(&admin, first.id, response.rider.id)
        .await
        .unwrap();
    // Past max_assignments, still accepted
    app.riders
        .assign_rider(&admin, second.id, response.rider.id)
        .await
        .unwrap();

    let rider = app.store.get_rider(response.rider.id).await.unwrap().unwrap();
    assert_eq!(rider.current_assignments, 2);
    assert_eq!(rider.max_assignments, 1);
}

// ============================================================================
// Assignment progression
// ============================================================================

#[tokio::test]
async fn test_assignment_completion_stamps_and_counts() {
    let app = test_app();
    let borrower = actor(&[Role::Borrower]);
    let admin = actor(&[Role::Admin]);
    let loan = create_pending_loan(&app, &borrower).await;
    let (rider_ctx, rider_id) = provision_rider(&app, &admin).await;

    app.riders
        .assign_rider(&admin, loan.id, rider_id)
        .await
        .unwrap();
    let assignment = app.store.list_assignments_for_rider(rider_id).await.unwrap()[0].clone();

    let in_progress = app
        .riders
        .update_assignment_status(
            &rider_ctx,
            assignment.id,
            AssignmentStatus::InProgress,
            Some("visiting applicant".to_string()),
        )
        .await
        .unwrap();
    assert_eq!(in_progress.status, AssignmentStatus::InProgress);
    assert!(in_progress.completed_at.is_none());

    let completed = app
        .riders
        .update_assignment_status(&rider_ctx, assignment.id, AssignmentStatus::Completed, None)
        .await
        .unwrap();
    assert!(completed.completed_at.is_some());

    let rider = app.store.get_rider(rider_id).await.unwrap().unwrap();
    assert_eq!(rider.current_assignments, 0);
    assert_eq!(rider.total_completed, 1);
}

#[tokio::test]
async fn test_assignment_progression_is_monotonic_and_final() {
    let app = test_app();
    let borrower = actor(&[Role::Borrower]);
    let admin = actor(&[Role::Admin]);
    let loan = create_pending_loan(&app, &borrower).await;
    let (rider_ctx, rider_id) = provision_rider(&app, &admin).await;

    app.riders
        .assign_rider(&admin, loan.id, rider_id)
        .await
        .unwrap();
    let assignment = app.store.list_assignments_for_rider(rider_id).await.unwrap()[0].clone();

    app.riders
        .update_assignment_status(&rider_ctx, assignment.id, AssignmentStatus::InProgress, None)
        .await
        .unwrap();

    // No going back
    let err = app
        .riders
        .update_assignment_status(&rider_ctx, assignment.id, AssignmentStatus::Assigned, None)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "VALIDATION_ERROR");

    app.riders
        .update_assignment_status(&rider_ctx, assignment.id, AssignmentStatus::Completed, None)
        .await
        .unwrap();

    // Immutable once completed
    let err = app
        .riders
        .update_assignment_status(&rider_ctx, assignment.id, AssignmentStatus::Cancelled, None)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_assignment_is_bound_to_its_rider() {
    let app = test_app();
    let borrower = actor(&[Role::Borrower]);
    let admin = actor(&[Role::Admin]);
    let loan = create_pending_loan(&app, &borrower).await;
    let (_, rider_id) = provision_rider(&app, &admin).await;
    let (other_rider_ctx, _) = provision_rider(&app, &admin).await;

    app.riders
        .assign_rider(&admin, loan.id, rider_id)
        .await
        .unwrap();
    let assignment = app.store.list_assignments_for_rider(rider_id).await.unwrap()[0].clone();

    let err = app
        .riders
        .update_assignment_status(
            &other_rider_ctx,
            assignment.id,
            AssignmentStatus::InProgress,
            None,
        )
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "FORBIDDEN");
}

#[tokio::test]
async fn test_assignment_notes_are_append_only_with_timestamps() {
    let app = test_app();
    let borrower = actor(&[Role::Borrower]);
    let admin = actor(&[Role::Admin]);
    let loan = create_pending_loan(&app, &borrower).await;
    let (rider_ctx, rider_id) = provision_rider(&app, &admin).await;

    app.riders
        .assign_rider(&admin, loan.id, rider_id)
        .await
        .unwrap();
    let assignment = app.store.list_assignments_for_rider(rider_id).await.unwrap()[0].clone();

    let after_first = app
        .riders
        .add_assignment_notes(&rider_ctx, assignment.id, "A")
        .await
        .unwrap();
    let first_notes = after_first.notes.clone().unwrap();
    assert!(first_notes.starts_with('['));
    assert!(first_notes.ends_with("] A"));

    let after_second = app
        .riders
        .add_assignment_notes(&rider_ctx, assignment.id, "B")
        .await
        .unwrap();
    let second_notes = after_second.notes.unwrap();

    // The first entry survives byte for byte, the second is appended after
    // a blank line with its own timestamp prefix
    assert!(second_notes.starts_with(&first_notes));
    let tail = &second_notes[first_notes.len()..];
    assert!(tail.starts_with("\n\n["));
    assert!(tail.ends_with("] B"));
    assert!(second_notes.find("] A").unwrap() < second_notes.find("] B").unwrap());
}

// ============================================================================
// Rider self-service
// ============================================================================

#[tokio::test]
async fn test_availability_toggle_and_metrics() {
    let app = test_app();
    let borrower = actor(&[Role::Borrower]);
    let admin = actor(&[Role::Admin]);
    let (rider_ctx, rider_id) = provision_rider(&app, &admin).await;

    let rider = app
        .riders
        .update_availability(&rider_ctx, RiderStatus::OnLeave)
        .await
        .unwrap();
    assert_eq!(rider.status, RiderStatus::OnLeave);

    let first = create_pending_loan(&app, &borrower).await;
    let second = create_pending_loan(&app, &borrower).await;
    app.riders
        .assign_rider(&admin, first.id, rider_id)
        .await
        .unwrap();
    app.riders
        .assign_rider(&admin, second.id, rider_id)
        .await
        .unwrap();

    let assignment = app.store.list_assignments_for_rider(rider_id).await.unwrap()[0].clone();
    app.riders
        .update_assignment_status(&rider_ctx, assignment.id, AssignmentStatus::Completed, None)
        .await
        .unwrap();

    let metrics = app.riders.get_metrics(&rider_ctx).await.unwrap();
    assert_eq!(metrics.current_assignments, 1);
    assert_eq!(metrics.total_completed, 1);
    assert_eq!(metrics.pending_assignments, 1);
}

#[tokio::test]
async fn test_metrics_without_rider_profile_is_not_found() {
    let app = test_app();
    let rider_without_profile = actor(&[Role::Rider]);

    let err = app
        .riders
        .get_metrics(&rider_without_profile)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "NOT_FOUND");
}

// ============================================================================
// Rider provisioning saga
// ============================================================================

#[tokio::test]
async fn test_provisioning_failure_leaves_no_records() {
    let app = build_app(WorkflowOptions::default(), TestIdentity::failing());
    let admin = actor(&[Role::Admin]);

    let err = app
        .riders
        .create_rider(
            &admin,
            CreateRiderRequest {
                email: "new@riders.example.com".to_string(),
                full_name: "Never Created".to_string(),
                phone: None,
                zone: None,
                max_assignments: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "INTERNAL_ERROR");

    assert!(app.store.list_riders().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_profile_insert_failure_compensates_identity_account() {
    let occupied_id = Uuid::new_v4();
    let app = build_app(
        WorkflowOptions::default(),
        TestIdentity::with_fixed_id(occupied_id),
    );
    let admin = actor(&[Role::Admin]);

    // The profile slot is already taken, so the insert after provisioning
    // fails and the saga must delete the identity account it just created.
    let now = Utc::now();
    app.store
        .insert_user(&User {
            id: occupied_id,
            email: "taken@example.com".to_string(),
            full_name: "Existing".to_string(),
            phone: None,
            created_at: now,
            updated_at: now,
        })
        .await
        .unwrap();

    let err = app
        .riders
        .create_rider(
            &admin,
            CreateRiderRequest {
                email: "clash@riders.example.com".to_string(),
                full_name: "Clashing Rider".to_string(),
                phone: None,
                zone: None,
                max_assignments: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "INTERNAL_ERROR");

    assert_eq!(app.identity.deleted.lock().unwrap().as_slice(), &[occupied_id]);
    assert!(app.store.list_riders().await.unwrap().is_empty());
}

// ============================================================================
// Notifications inbox
// ============================================================================

#[tokio::test]
async fn test_notification_read_flags() {
    let app = test_app();
    let borrower = actor(&[Role::Borrower]);
    let admin = actor(&[Role::Admin]);
    let loan = create_pending_loan(&app, &borrower).await;
    app.loans
        .update_status(&admin, loan.id, LoanStatus::Reviewing, None)
        .await
        .unwrap();

    let feed = app.notifications.list(&borrower).await.unwrap();
    assert_eq!(feed.unread_count, 2);

    let first_id = feed.notifications[0].id;
    let read = app.notifications.mark_read(&borrower, first_id).await.unwrap();
    assert!(read.read);

    let feed = app.notifications.list(&borrower).await.unwrap();
    assert_eq!(feed.unread_count, 1);

    // Foreign ids look like missing ids
    let stranger = actor(&[Role::Borrower]);
    let err = app
        .notifications
        .mark_read(&stranger, feed.notifications[1].id)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "NOT_FOUND");

    let updated = app.notifications.mark_all_read(&borrower).await.unwrap();
    assert_eq!(updated, 1);
    let feed = app.notifications.list(&borrower).await.unwrap();
    assert_eq!(feed.unread_count, 0);
}

// ============================================================================
// Admin views
// ============================================================================

#[tokio::test]
async fn test_admin_listing_enriches_with_borrower_info() {
    let app = test_app();
    let borrower = actor(&[Role::Borrower]);
    let admin = actor(&[Role::Admin]);
    seed_profile(&app, &borrower, "Ada Lovelace").await;

    create_pending_loan(&app, &borrower).await;
    let loan = create_pending_loan(&app, &borrower).await;
    app.loans
        .update_status(&admin, loan.id, LoanStatus::Approved, None)
        .await
        .unwrap();

    let all = app.loans.list_all(&admin, None).await.unwrap();
    assert_eq!(all.len(), 2);
    assert!(all
        .iter()
        .all(|v| v.borrower.as_ref().unwrap().full_name == "Ada Lovelace"));

    let approved = app
        .loans
        .list_all(&admin, Some(LoanStatus::Approved))
        .await
        .unwrap();
    assert_eq!(approved.len(), 1);
    assert_eq!(approved[0].loan.id, loan.id);
}

#[tokio::test]
async fn test_admin_metrics_counts_portfolio() {
    let app = test_app();
    let borrower = actor(&[Role::Borrower]);
    let admin = actor(&[Role::Admin]);

    let a = create_pending_loan(&app, &borrower).await;
    create_pending_loan(&app, &borrower).await;
    app.loans
        .update_status(&admin, a.id, LoanStatus::Disbursed, None)
        .await
        .unwrap();
    provision_rider(&app, &admin).await;

    let metrics = app.loans.admin_metrics(&admin).await.unwrap();
    assert_eq!(metrics.total_loans, 2);
    assert_eq!(metrics.pending_loans, 1);
    assert_eq!(metrics.approved_loans, 0);
    assert_eq!(metrics.total_disbursed, 5_000.0);
    assert_eq!(metrics.active_riders, 1);
}

// ============================================================================
// End to end
// ============================================================================

#[tokio::test]
async fn test_full_origination_scenario() {
    let app = test_app();
    let borrower = actor(&[Role::Borrower]);
    let admin = actor(&[Role::Admin]);

    // Borrower applies
    let loan = create_pending_loan(&app, &borrower).await;
    assert_eq!(loan.status, LoanStatus::Pending);

    // Admin approves
    let approved = app
        .loans
        .update_status(&admin, loan.id, LoanStatus::Approved, None)
        .await
        .unwrap();
    assert_eq!(approved.status, LoanStatus::Approved);
    assert!(approved.approved_at.is_some());
    let feed = app.notifications.list(&borrower).await.unwrap();
    assert_eq!(feed.notifications.len(), 2);

    // Admin assigns a rider
    let (rider_ctx, rider_id) = provision_rider(&app, &admin).await;
    let assigned = app
        .riders
        .assign_rider(&admin, loan.id, rider_id)
        .await
        .unwrap();
    assert_eq!(assigned.rider_id, Some(rider_id));

    let assignments = app.riders.get_assignments(&rider_ctx).await.unwrap();
    assert_eq!(assignments.len(), 1);
    assert_eq!(assignments[0].assignment.status, AssignmentStatus::Assigned);
    assert_eq!(
        assignments[0].loan.as_ref().map(|l| l.id),
        Some(loan.id)
    );

    assert_eq!(
        app.notifications.list(&rider_ctx).await.unwrap().notifications.len(),
        1
    );
    assert_eq!(
        app.notifications.list(&borrower).await.unwrap().notifications.len(),
        3
    );

    // Rider completes the verification
    let completed = app
        .riders
        .update_assignment_status(
            &rider_ctx,
            assignments[0].assignment.id,
            AssignmentStatus::Completed,
            Some("applicant verified".to_string()),
        )
        .await
        .unwrap();
    assert!(completed.completed_at.is_some());

    // The detail view stitches it all together for the borrower
    let detail = app.loans.get_by_id(&borrower, loan.id).await.unwrap();
    assert_eq!(detail.loan.status, LoanStatus::Approved);
    assert_eq!(detail.rider.as_ref().map(|r| r.id), Some(rider_id));
    assert_eq!(detail.status_history.len(), 2);
}
