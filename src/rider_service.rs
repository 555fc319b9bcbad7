//! Rider service layer - assignment workflow and rider provisioning
//!
//! Tracks rider capacity and zone, creates assignment records when an admin
//! hands a loan to a rider, and maintains the per-rider counters as the
//! trigger-equivalent for assignment completion. Capacity and
//! single-active-assignment checks are opt-in ([`WorkflowOptions`]); with
//! both off, assigning a second rider to a loan succeeds and only the
//! loan's `rider_id` reflects the last write.

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::auth::{require_role, AuthContext, Role, RoleSet};
use crate::config::WorkflowOptions;
use crate::error::{ApiError, ApiResult};
use crate::identity::{generate_temporary_password, IdentityProvider};
use crate::models::{
    AssignmentStatus, AssignmentView, BorrowerSummary, CreateRiderRequest, CreateRiderResponse,
    Loan, NotificationType, Rider, RiderAssignment, RiderMetrics, RiderStatus, RiderView, User,
};
use crate::notifier::Notifier;
use crate::store::Store;

/// Default assignment cap for newly provisioned riders
const DEFAULT_MAX_ASSIGNMENTS: i32 = 5;

/// Initial rating for newly provisioned riders
const DEFAULT_RATING: f64 = 5.0;

/// Rider service for assignment management and provisioning
#[derive(Clone)]
pub struct RiderService {
    store: Arc<dyn Store>,
    notifier: Notifier,
    identity: Arc<dyn IdentityProvider>,
    options: WorkflowOptions,
}

impl RiderService {
    /// Create a new rider service instance
    pub fn new(
        store: Arc<dyn Store>,
        notifier: Notifier,
        identity: Arc<dyn IdentityProvider>,
        options: WorkflowOptions,
    ) -> Self {
        Self {
            store,
            notifier,
            identity,
            options,
        }
    }

    /// Provision a rider: identity-provider account, user profile, role
    /// grant and rider profile, with compensating deletes if a later step
    /// fails. Returns the generated one-time credentials.
    pub async fn create_rider(
        &self,
        ctx: &AuthContext,
        request: CreateRiderRequest,
    ) -> ApiResult<CreateRiderResponse> {
        require_role(ctx, RoleSet::of(&[Role::Admin]))?;
        request.validate()?;

        let temporary_password = generate_temporary_password();
        let user_id = self
            .identity
            .provision_account(&request.email, &temporary_password)
            .await
            .map_err(|e| ApiError::InternalError(format!("Failed to create rider account: {}", e)))?;

        let now = Utc::now();
        let user = User {
            id: user_id,
            email: request.email.clone(),
            full_name: request.full_name,
            phone: request.phone,
            created_at: now,
            updated_at: now,
        };

        if let Err(err) = self.store.insert_user(&user).await {
            self.rollback_provisioning(user_id, false).await;
            return Err(ApiError::InternalError(format!(
                "Failed to create user profile: {}",
                err
            )));
        }

        if let Err(err) = self.store.grant_role(user_id, Role::Rider).await {
            self.rollback_provisioning(user_id, true).await;
            return Err(ApiError::InternalError(format!(
                "Failed to grant rider role: {}",
                err
            )));
        }

        let rider = Rider {
            id: Uuid::new_v4(),
            user_id,
            zone: request.zone,
            status: RiderStatus::Active,
            max_assignments: request.max_assignments.unwrap_or(DEFAULT_MAX_ASSIGNMENTS),
            current_assignments: 0,
            total_completed: 0,
            rating: DEFAULT_RATING,
            created_at: now,
            updated_at: now,
        };

        if let Err(err) = self.store.insert_rider(&rider).await {
            self.rollback_provisioning(user_id, true).await;
            return Err(ApiError::InternalError(format!(
                "Failed to create rider profile: {}",
                err
            )));
        }

        tracing::info!(rider_id = %rider.id, user_id = %user_id, "Rider provisioned");

        Ok(CreateRiderResponse {
            rider,
            email: request.email,
            temporary_password,
        })
    }

    /// All riders with user display info, newest first (admin only)
    pub async fn list_riders(&self, ctx: &AuthContext) -> ApiResult<Vec<RiderView>> {
        require_role(ctx, RoleSet::of(&[Role::Admin]))?;

        let riders = self.store.list_riders().await?;
        let mut views = Vec::with_capacity(riders.len());
        for rider in riders {
            let user = self.store.get_user(rider.user_id).await?.map(|u| {
                BorrowerSummary {
                    id: u.id,
                    full_name: u.full_name,
                    phone: u.phone,
                    email: u.email,
                }
            });
            views.push(RiderView { rider, user });
        }

        Ok(views)
    }

    /// Assign a rider to a loan (admin only).
    ///
    /// Writes the loan's `rider_id`, creates one assignment record per
    /// call, bumps the rider's active counter, and notifies both the rider
    /// and the borrower.
    pub async fn assign_rider(
        &self,
        ctx: &AuthContext,
        loan_id: Uuid,
        rider_id: Uuid,
    ) -> ApiResult<Loan> {
        require_role(ctx, RoleSet::of(&[Role::Admin]))?;

        let mut loan = self
            .store
            .get_loan(loan_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Loan not found".to_string()))?;

        let mut rider = self
            .store
            .get_rider(rider_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Rider not found".to_string()))?;

        if self.options.enforce_single_active_assignment {
            if let Some(active) = self.store.find_active_assignment_for_loan(loan_id).await? {
                return Err(ApiError::Conflict(format!(
                    "Loan already has an active assignment ({})",
                    active.id
                )));
            }
        }

        if self.options.enforce_rider_capacity
            && rider.current_assignments >= rider.max_assignments
        {
            return Err(ApiError::Conflict(format!(
                "Rider is at capacity ({} of {} assignments)",
                rider.current_assignments, rider.max_assignments
            )));
        }

        let now = Utc::now();
        loan.rider_id = Some(rider.id);
        loan.updated_at = now;
        let loan = self.store.update_loan(&loan).await?;

        let assignment = RiderAssignment {
            id: Uuid::new_v4(),
            rider_id: rider.id,
            loan_id: loan.id,
            status: AssignmentStatus::Assigned,
            assigned_at: now,
            assigned_by: Some(ctx.user_id),
            completed_at: None,
            notes: None,
        };
        self.store.insert_assignment(&assignment).await?;

        rider.current_assignments += 1;
        rider.updated_at = now;
        let rider = self.store.update_rider(&rider).await?;

        tracing::info!(
            loan_id = %loan.id,
            rider_id = %rider.id,
            assignment_id = %assignment.id,
            "Rider assigned to loan"
        );

        self.notifier
            .notify(
                rider.user_id,
                NotificationType::Assignment,
                "New Loan Assignment",
                &format!(
                    "A {} loan application has been assigned to you for verification.",
                    loan.product_type.as_str()
                ),
                Some(loan.id),
            )
            .await;

        self.notifier
            .notify(
                loan.borrower_id,
                NotificationType::Assignment,
                "Rider Assigned",
                "A field agent has been assigned to verify your loan application.",
                Some(loan.id),
            )
            .await;

        Ok(loan)
    }

    /// The acting rider's assignments with loan and borrower info, newest
    /// first
    pub async fn get_assignments(&self, ctx: &AuthContext) -> ApiResult<Vec<AssignmentView>> {
        let rider = self.own_rider(ctx).await?;

        let assignments = self.store.list_assignments_for_rider(rider.id).await?;
        let mut views = Vec::with_capacity(assignments.len());
        for assignment in assignments {
            let loan = self.store.get_loan(assignment.loan_id).await?;
            let borrower = match &loan {
                Some(loan) => self.store.get_user(loan.borrower_id).await?.map(|u| {
                    BorrowerSummary {
                        id: u.id,
                        full_name: u.full_name,
                        phone: u.phone,
                        email: u.email,
                    }
                }),
                None => None,
            };
            views.push(AssignmentView {
                assignment,
                loan,
                borrower,
            });
        }

        Ok(views)
    }

    /// Advance one of the acting rider's assignments.
    ///
    /// Progression is monotonic and finalized assignments are immutable.
    /// Completion stamps `completed_at` and feeds the rider counters.
    pub async fn update_assignment_status(
        &self,
        ctx: &AuthContext,
        assignment_id: Uuid,
        new_status: AssignmentStatus,
        notes: Option<String>,
    ) -> ApiResult<RiderAssignment> {
        let rider = self.own_rider(ctx).await?;
        let mut assignment = self.owned_assignment(&rider, assignment_id).await?;

        if !assignment.status.allows(new_status) {
            return Err(ApiError::ValidationError(format!(
                "Assignment cannot move from {} to {}",
                assignment.status.as_str(),
                new_status.as_str()
            )));
        }

        let now = Utc::now();
        assignment.status = new_status;
        if let Some(notes) = notes {
            assignment.notes = Some(notes);
        }
        if new_status == AssignmentStatus::Completed {
            assignment.completed_at = Some(now);
        }
        let assignment = self.store.update_assignment(&assignment).await?;

        // Trigger-equivalent counter maintenance on completion/cancellation
        if new_status.is_final() {
            let mut rider = rider;
            rider.current_assignments = (rider.current_assignments - 1).max(0);
            if new_status == AssignmentStatus::Completed {
                rider.total_completed += 1;
            }
            rider.updated_at = now;
            self.store.update_rider(&rider).await?;
        }

        tracing::info!(
            assignment_id = %assignment.id,
            status = %assignment.status.as_str(),
            "Assignment status updated"
        );

        Ok(assignment)
    }

    /// Append a timestamped note to one of the acting rider's assignments.
    /// Notes are an append-only log; earlier entries are never edited.
    pub async fn add_assignment_notes(
        &self,
        ctx: &AuthContext,
        assignment_id: Uuid,
        text: &str,
    ) -> ApiResult<RiderAssignment> {
        if text.is_empty() {
            return Err(ApiError::ValidationError("Notes are required".to_string()));
        }

        let rider = self.own_rider(ctx).await?;
        let mut assignment = self.owned_assignment(&rider, assignment_id).await?;

        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        assignment.notes = Some(match assignment.notes.take() {
            Some(existing) => format!("{}\n\n[{}] {}", existing, timestamp, text),
            None => format!("[{}] {}", timestamp, text),
        });

        Ok(self.store.update_assignment(&assignment).await?)
    }

    /// Rider self-service availability toggle
    pub async fn update_availability(
        &self,
        ctx: &AuthContext,
        new_status: RiderStatus,
    ) -> ApiResult<Rider> {
        let mut rider = self.own_rider(ctx).await?;

        rider.status = new_status;
        rider.updated_at = Utc::now();

        Ok(self.store.update_rider(&rider).await?)
    }

    /// Workload metrics for the acting rider. `pending_assignments` is
    /// counted from the assignment rows at query time, not cached.
    pub async fn get_metrics(&self, ctx: &AuthContext) -> ApiResult<RiderMetrics> {
        let rider = self.own_rider(ctx).await?;
        let pending_assignments = self
            .store
            .count_active_assignments_for_rider(rider.id)
            .await?;

        Ok(RiderMetrics {
            current_assignments: rider.current_assignments,
            total_completed: rider.total_completed,
            rating: rider.rating,
            pending_assignments,
        })
    }

    // ===== helpers =====

    /// The rider profile behind the acting user
    async fn own_rider(&self, ctx: &AuthContext) -> ApiResult<Rider> {
        require_role(ctx, RoleSet::of(&[Role::Rider]))?;
        self.store
            .find_rider_by_user(ctx.user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Rider profile not found".to_string()))
    }

    /// Fetch an assignment and bind it to the acting rider
    async fn owned_assignment(
        &self,
        rider: &Rider,
        assignment_id: Uuid,
    ) -> ApiResult<RiderAssignment> {
        let assignment = self
            .store
            .get_assignment(assignment_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Assignment not found".to_string()))?;

        if assignment.rider_id != rider.id {
            return Err(ApiError::Forbidden(
                "Assignment belongs to another rider".to_string(),
            ));
        }

        Ok(assignment)
    }

    /// Best-effort compensation for a partially provisioned rider
    async fn rollback_provisioning(&self, user_id: Uuid, profile_inserted: bool) {
        if profile_inserted {
            if let Err(err) = self.store.delete_user(user_id).await {
                tracing::warn!(user_id = %user_id, error = %err, "Failed to roll back user profile");
            }
        }
        if let Err(err) = self.identity.delete_account(user_id).await {
            tracing::warn!(user_id = %user_id, error = %err, "Failed to roll back identity account");
        }
    }
}
