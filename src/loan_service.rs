//! Loan service layer - lifecycle of a loan application
//!
//! Owns the status state machine, milestone timestamps and the
//! notification side effects of every transition. The workflow is
//! deliberately lenient about ordering: any non-terminal status may move to
//! any other status, and re-entering the current status is an idempotent
//! no-op on the milestone timestamps that still re-fires the borrower
//! notification. Concurrent admin updates are last-write-wins; there is no
//! optimistic concurrency token on the loan row.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{require_role, AuthContext, Role, RoleSet};
use crate::calculator;
use crate::error::{ApiError, ApiResult};
use crate::models::{
    AddLoanDocumentRequest, AdminLoanView, AdminMetrics, BorrowerSummary, CreateLoanRequest, Loan,
    LoanDetail, LoanDocument, LoanStatus, LoanStatusHistory, NotificationType, RiderStatus,
    RiderSummary,
};
use crate::notifier::Notifier;
use crate::store::Store;

/// Loan service for managing the application lifecycle
#[derive(Clone)]
pub struct LoanService {
    store: Arc<dyn Store>,
    notifier: Notifier,
}

impl LoanService {
    /// Create a new loan service instance
    pub fn new(store: Arc<dyn Store>, notifier: Notifier) -> Self {
        Self { store, notifier }
    }

    /// Submit a new loan application on behalf of the acting borrower.
    ///
    /// Repayment figures are computed from the amortization formula at
    /// creation and never hand-edited afterwards.
    pub async fn create(&self, ctx: &AuthContext, request: CreateLoanRequest) -> ApiResult<Loan> {
        require_role(ctx, RoleSet::of(&[Role::Borrower, Role::Admin]))?;
        request.validate()?;
        request
            .product_type
            .check_application(request.amount, request.term_months)?;

        let quote = calculator::calculate(
            request.amount,
            request.interest_rate,
            request.term_months as u32,
        )
        .map_err(|e| ApiError::ValidationError(e.to_string()))?;

        let now = Utc::now();
        let loan = Loan {
            id: Uuid::new_v4(),
            borrower_id: ctx.user_id,
            rider_id: None,
            product_type: request.product_type,
            amount: request.amount,
            term_months: request.term_months,
            interest_rate: request.interest_rate,
            status: LoanStatus::Pending,
            purpose: request.purpose,
            notes: None,
            monthly_payment: quote.monthly_payment,
            total_repayment: quote.total_payment,
            applied_at: now,
            reviewed_at: None,
            reviewed_by: None,
            approved_at: None,
            disbursed_at: None,
            closed_at: None,
            created_at: now,
            updated_at: now,
        };

        self.store.insert_loan(&loan).await?;
        self.record_history(&loan, None, None, None).await?;

        tracing::info!(loan_id = %loan.id, borrower_id = %ctx.user_id, "Loan application created");

        self.notifier
            .notify(
                ctx.user_id,
                NotificationType::LoanStatus,
                "Loan Application Submitted",
                &format!(
                    "Your {} loan application for ${} has been submitted successfully.",
                    loan.product_type.as_str(),
                    loan.amount
                ),
                Some(loan.id),
            )
            .await;

        Ok(loan)
    }

    /// Move a loan to a new status (admin only).
    ///
    /// Sets `reviewed_at`/`reviewed_by` on every call; milestone timestamps
    /// (`approved_at`, `disbursed_at`, `closed_at`) are set the first time
    /// the loan reaches the corresponding status and never cleared.
    pub async fn update_status(
        &self,
        ctx: &AuthContext,
        loan_id: Uuid,
        new_status: LoanStatus,
        notes: Option<String>,
    ) -> ApiResult<Loan> {
        require_role(ctx, RoleSet::of(&[Role::Admin]))?;

        let mut loan = self
            .store
            .get_loan(loan_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Loan not found".to_string()))?;

        let old_status = loan.status;
        if old_status.is_terminal() && new_status != old_status {
            return Err(ApiError::ValidationError(format!(
                "Loan is {} and accepts no further status changes",
                old_status.as_str()
            )));
        }

        let now = Utc::now();
        loan.status = new_status;
        loan.reviewed_at = Some(now);
        loan.reviewed_by = Some(ctx.user_id);
        if let Some(notes) = notes.clone() {
            loan.notes = Some(notes);
        }

        match new_status {
            LoanStatus::Approved => {
                loan.approved_at.get_or_insert(now);
            }
            LoanStatus::Disbursed => {
                loan.disbursed_at.get_or_insert(now);
            }
            LoanStatus::Closed => {
                loan.closed_at.get_or_insert(now);
            }
            _ => {}
        }
        loan.updated_at = now;

        let loan = self.store.update_loan(&loan).await?;
        self.record_history(&loan, Some(old_status), notes, Some(ctx.user_id))
            .await?;

        tracing::info!(
            loan_id = %loan.id,
            old_status = %old_status.as_str(),
            new_status = %new_status.as_str(),
            "Loan status updated"
        );

        if let Some((title, message)) = new_status.borrower_notification() {
            self.notifier
                .notify(
                    loan.borrower_id,
                    NotificationType::LoanStatus,
                    title,
                    message,
                    Some(loan.id),
                )
                .await;
        }

        Ok(loan)
    }

    /// Fetch a loan with nested rider, documents and status history.
    ///
    /// Owner or admin only; everyone else gets the same NotFound a missing
    /// id would produce, so existence never leaks.
    pub async fn get_by_id(&self, ctx: &AuthContext, loan_id: Uuid) -> ApiResult<LoanDetail> {
        let loan = self.fetch_owned(ctx, loan_id).await?;

        let rider = match loan.rider_id {
            Some(rider_id) => self.rider_summary(rider_id).await?,
            None => None,
        };
        let documents = self.store.list_documents(loan.id).await?;
        let status_history = self.store.list_status_history(loan.id).await?;

        Ok(LoanDetail {
            loan,
            rider,
            documents,
            status_history,
        })
    }

    /// The acting borrower's loans, newest application first
    pub async fn list_for_borrower(
        &self,
        ctx: &AuthContext,
        status: Option<LoanStatus>,
    ) -> ApiResult<Vec<Loan>> {
        require_role(ctx, RoleSet::of(&[Role::Borrower, Role::Admin]))?;
        Ok(self
            .store
            .list_loans_for_borrower(ctx.user_id, status)
            .await?)
    }

    /// All loans enriched with borrower display info (admin only)
    pub async fn list_all(
        &self,
        ctx: &AuthContext,
        status: Option<LoanStatus>,
    ) -> ApiResult<Vec<AdminLoanView>> {
        require_role(ctx, RoleSet::of(&[Role::Admin]))?;

        let loans = self.store.list_loans(status).await?;

        let mut borrower_ids: Vec<Uuid> = loans.iter().map(|l| l.borrower_id).collect();
        borrower_ids.sort_unstable();
        borrower_ids.dedup();
        let borrowers = self.store.get_users_by_ids(&borrower_ids).await?;

        let mut views = Vec::with_capacity(loans.len());
        for loan in loans {
            let borrower = borrowers
                .iter()
                .find(|u| u.id == loan.borrower_id)
                .map(|u| BorrowerSummary {
                    id: u.id,
                    full_name: u.full_name.clone(),
                    phone: u.phone.clone(),
                    email: u.email.clone(),
                });
            let rider = match loan.rider_id {
                Some(rider_id) => self.rider_summary(rider_id).await?,
                None => None,
            };
            views.push(AdminLoanView {
                loan,
                borrower,
                rider,
            });
        }

        Ok(views)
    }

    /// Status history for a loan (owner or admin, merged NotFound)
    pub async fn status_history(
        &self,
        ctx: &AuthContext,
        loan_id: Uuid,
    ) -> ApiResult<Vec<LoanStatusHistory>> {
        self.fetch_owned(ctx, loan_id).await?;
        Ok(self.store.list_status_history(loan_id).await?)
    }

    /// Attach document metadata to the actor's own loan. File contents live
    /// in external storage; this records the reference only.
    pub async fn add_document(
        &self,
        ctx: &AuthContext,
        loan_id: Uuid,
        request: AddLoanDocumentRequest,
    ) -> ApiResult<LoanDocument> {
        request.validate()?;

        let loan = self
            .store
            .get_loan(loan_id)
            .await?
            .filter(|l| l.borrower_id == ctx.user_id)
            .ok_or_else(|| ApiError::NotFound("Loan not found".to_string()))?;

        let document = LoanDocument {
            id: Uuid::new_v4(),
            loan_id: loan.id,
            file_name: request.file_name,
            storage_path: request.storage_path,
            document_type: request.document_type,
            uploaded_by: Some(ctx.user_id),
            uploaded_at: Utc::now(),
        };

        self.store.insert_document(&document).await?;

        Ok(document)
    }

    /// Portfolio counters for the admin dashboard, computed at query time
    pub async fn admin_metrics(&self, ctx: &AuthContext) -> ApiResult<AdminMetrics> {
        require_role(ctx, RoleSet::of(&[Role::Admin]))?;

        let loans = self.store.list_loans(None).await?;
        let riders = self.store.list_riders().await?;

        Ok(AdminMetrics {
            total_loans: loans.len() as i64,
            pending_loans: loans
                .iter()
                .filter(|l| l.status == LoanStatus::Pending)
                .count() as i64,
            approved_loans: loans
                .iter()
                .filter(|l| l.status == LoanStatus::Approved)
                .count() as i64,
            total_disbursed: loans
                .iter()
                .filter(|l| l.status == LoanStatus::Disbursed)
                .map(|l| l.amount)
                .sum(),
            active_riders: riders
                .iter()
                .filter(|r| r.status == RiderStatus::Active)
                .count() as i64,
        })
    }

    // ===== helpers =====

    /// Fetch a loan the actor may see: the owner or any admin. Not-found
    /// and not-authorized produce the identical error.
    async fn fetch_owned(&self, ctx: &AuthContext, loan_id: Uuid) -> ApiResult<Loan> {
        self.store
            .get_loan(loan_id)
            .await?
            .filter(|l| ctx.is_admin() || l.borrower_id == ctx.user_id)
            .ok_or_else(|| ApiError::NotFound("Loan not found".to_string()))
    }

    async fn rider_summary(&self, rider_id: Uuid) -> ApiResult<Option<RiderSummary>> {
        let Some(rider) = self.store.get_rider(rider_id).await? else {
            return Ok(None);
        };
        let user = self.store.get_user(rider.user_id).await?;

        Ok(user.map(|u| RiderSummary {
            id: rider.id,
            full_name: u.full_name,
            phone: u.phone,
        }))
    }

    async fn record_history(
        &self,
        loan: &Loan,
        old_status: Option<LoanStatus>,
        notes: Option<String>,
        changed_by: Option<Uuid>,
    ) -> ApiResult<()> {
        let entry = LoanStatusHistory {
            id: Uuid::new_v4(),
            loan_id: loan.id,
            old_status,
            new_status: loan.status,
            notes,
            changed_by,
            changed_at: Utc::now(),
        };
        self.store.insert_status_history(&entry).await?;
        Ok(())
    }
}
