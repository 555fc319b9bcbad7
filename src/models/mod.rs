//! Data models for the LoanFlow backend

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

/// User profile (identity itself lives in the external provider)
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Loan product types
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq, Hash)]
#[sqlx(type_name = "loan_product_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LoanProductType {
    Personal,
    Business,
    Education,
    Home,
    Auto,
}

impl LoanProductType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanProductType::Personal => "personal",
            LoanProductType::Business => "business",
            LoanProductType::Education => "education",
            LoanProductType::Home => "home",
            LoanProductType::Auto => "auto",
        }
    }
}

/// Loan status enum
///
/// Unknown values are rejected at the serde boundary; only these variants
/// can ever be stored.
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "loan_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Pending,
    Reviewing,
    Approved,
    Rejected,
    Disbursed,
    Active,
    Closed,
    Defaulted,
}

impl LoanStatus {
    /// Terminal states accept no further transitions (except an idempotent
    /// re-entry of the same status).
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoanStatus::Rejected | LoanStatus::Closed)
    }

    /// Borrower-facing notification for a transition into this status.
    /// `Pending` is covered by the submission notification at creation.
    pub fn borrower_notification(&self) -> Option<(&'static str, &'static str)> {
        match self {
            LoanStatus::Pending => None,
            LoanStatus::Reviewing => Some((
                "Loan Under Review",
                "Your loan application is now under review",
            )),
            LoanStatus::Approved => Some((
                "Loan Approved",
                "Congratulations! Your loan has been approved",
            )),
            LoanStatus::Rejected => Some((
                "Loan Application Reviewed",
                "Your loan application has been reviewed",
            )),
            LoanStatus::Disbursed => Some(("Loan Disbursed", "Your loan has been disbursed")),
            LoanStatus::Active => Some(("Loan Active", "Your loan is now active")),
            LoanStatus::Closed => Some(("Loan Closed", "Your loan has been closed")),
            LoanStatus::Defaulted => Some((
                "Loan Defaulted",
                "Your loan has been marked as defaulted",
            )),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Pending => "pending",
            LoanStatus::Reviewing => "reviewing",
            LoanStatus::Approved => "approved",
            LoanStatus::Rejected => "rejected",
            LoanStatus::Disbursed => "disbursed",
            LoanStatus::Active => "active",
            LoanStatus::Closed => "closed",
            LoanStatus::Defaulted => "defaulted",
        }
    }
}

/// Loan application model
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Loan {
    pub id: Uuid,
    pub borrower_id: Uuid,
    pub rider_id: Option<Uuid>,
    pub product_type: LoanProductType,
    pub amount: f64,
    pub term_months: i32,
    pub interest_rate: f64,
    pub status: LoanStatus,
    pub purpose: Option<String>,
    pub notes: Option<String>,
    pub monthly_payment: f64,
    pub total_repayment: f64,
    pub applied_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub disbursed_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One row per status change, append-only
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct LoanStatusHistory {
    pub id: Uuid,
    pub loan_id: Uuid,
    pub old_status: Option<LoanStatus>,
    pub new_status: LoanStatus,
    pub notes: Option<String>,
    pub changed_by: Option<Uuid>,
    pub changed_at: DateTime<Utc>,
}

/// Document types attached to a loan
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "document_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    IdProof,
    IncomeProof,
    AddressProof,
    BankStatement,
    Other,
}

/// Loan document metadata (file contents live in external storage)
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct LoanDocument {
    pub id: Uuid,
    pub loan_id: Uuid,
    pub file_name: String,
    pub storage_path: String,
    pub document_type: DocumentType,
    pub uploaded_by: Option<Uuid>,
    pub uploaded_at: DateTime<Utc>,
}

/// Rider availability status
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "rider_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RiderStatus {
    Active,
    Inactive,
    OnLeave,
    Suspended,
}

/// Field agent who verifies loan applications on the ground
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Rider {
    pub id: Uuid,
    pub user_id: Uuid,
    pub zone: Option<String>,
    pub status: RiderStatus,
    pub max_assignments: i32,
    pub current_assignments: i32,
    pub total_completed: i32,
    pub rating: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Rider assignment status; advances monotonically and is immutable once
/// completed or cancelled.
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "assignment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Assigned,
    InProgress,
    Completed,
    Cancelled,
}

impl AssignmentStatus {
    pub fn is_final(&self) -> bool {
        matches!(self, AssignmentStatus::Completed | AssignmentStatus::Cancelled)
    }

    /// Whether this status may advance to `next`
    pub fn allows(&self, next: AssignmentStatus) -> bool {
        match self {
            AssignmentStatus::Assigned => !matches!(next, AssignmentStatus::Assigned),
            AssignmentStatus::InProgress => next.is_final(),
            AssignmentStatus::Completed | AssignmentStatus::Cancelled => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentStatus::Assigned => "assigned",
            AssignmentStatus::InProgress => "in_progress",
            AssignmentStatus::Completed => "completed",
            AssignmentStatus::Cancelled => "cancelled",
        }
    }
}

/// One row per admin-assign action; the history of who verified what
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct RiderAssignment {
    pub id: Uuid,
    pub rider_id: Uuid,
    pub loan_id: Uuid,
    pub status: AssignmentStatus,
    pub assigned_at: DateTime<Utc>,
    pub assigned_by: Option<Uuid>,
    pub completed_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// Notification categories
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "notification_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    LoanStatus,
    Assignment,
    System,
    Reminder,
}

/// User-facing notification; additive log, only the read flag mutates
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub read: bool,
    pub related_loan_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

// ===== Request / response types =====

/// Request to create a new loan application
#[derive(Debug, Deserialize, Validate)]
pub struct CreateLoanRequest {
    pub product_type: LoanProductType,
    #[validate(range(min = 0.01, message = "Amount must be a positive number"))]
    pub amount: f64,
    #[validate(range(min = 1, message = "Term months must be a positive number"))]
    pub term_months: i32,
    #[validate(range(min = 0.0, message = "Interest rate must be a non-negative number"))]
    pub interest_rate: f64,
    pub purpose: Option<String>,
}

/// Optional status filter for loan listings
#[derive(Debug, Default, Deserialize)]
pub struct LoanListQuery {
    pub status: Option<LoanStatus>,
}

/// Admin request to move a loan to a new status
#[derive(Debug, Deserialize)]
pub struct UpdateLoanStatusRequest {
    pub status: LoanStatus,
    pub notes: Option<String>,
}

/// Admin request to assign a rider to a loan
#[derive(Debug, Deserialize)]
pub struct AssignRiderRequest {
    pub rider_id: Uuid,
}

/// Admin request to provision a new rider
#[derive(Debug, Deserialize, Validate)]
pub struct CreateRiderRequest {
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Full name is required"))]
    pub full_name: String,
    pub phone: Option<String>,
    pub zone: Option<String>,
    #[validate(range(min = 1, message = "Max assignments must be positive"))]
    pub max_assignments: Option<i32>,
}

/// Provisioned rider plus the generated one-time credentials
#[derive(Debug, Serialize)]
pub struct CreateRiderResponse {
    pub rider: Rider,
    pub email: String,
    pub temporary_password: String,
}

/// Rider request to advance an assignment
#[derive(Debug, Deserialize)]
pub struct UpdateAssignmentStatusRequest {
    pub status: AssignmentStatus,
    pub notes: Option<String>,
}

/// Rider request to append a timestamped note to an assignment
#[derive(Debug, Deserialize, Validate)]
pub struct AddAssignmentNotesRequest {
    #[validate(length(min = 1, message = "Notes are required"))]
    pub notes: String,
}

/// Rider self-service availability toggle
#[derive(Debug, Deserialize)]
pub struct UpdateAvailabilityRequest {
    pub status: RiderStatus,
}

/// Request to attach document metadata to a loan
#[derive(Debug, Deserialize, Validate)]
pub struct AddLoanDocumentRequest {
    #[validate(length(min = 1, message = "File name is required"))]
    pub file_name: String,
    #[validate(length(min = 1, message = "Storage path is required"))]
    pub storage_path: String,
    pub document_type: DocumentType,
}

/// Borrower display info nested in admin listings
#[derive(Debug, Serialize, Clone)]
pub struct BorrowerSummary {
    pub id: Uuid,
    pub full_name: String,
    pub phone: Option<String>,
    pub email: String,
}

/// Rider display info nested in loan views
#[derive(Debug, Serialize, Clone)]
pub struct RiderSummary {
    pub id: Uuid,
    pub full_name: String,
    pub phone: Option<String>,
}

/// Loan enriched with borrower display info (admin listing)
#[derive(Debug, Serialize)]
pub struct AdminLoanView {
    #[serde(flatten)]
    pub loan: Loan,
    pub borrower: Option<BorrowerSummary>,
    pub rider: Option<RiderSummary>,
}

/// Full loan detail with nested rider, documents and status history
#[derive(Debug, Serialize)]
pub struct LoanDetail {
    #[serde(flatten)]
    pub loan: Loan,
    pub rider: Option<RiderSummary>,
    pub documents: Vec<LoanDocument>,
    pub status_history: Vec<LoanStatusHistory>,
}

/// Assignment enriched with loan and borrower info (rider listing)
#[derive(Debug, Serialize)]
pub struct AssignmentView {
    #[serde(flatten)]
    pub assignment: RiderAssignment,
    pub loan: Option<Loan>,
    pub borrower: Option<BorrowerSummary>,
}

/// Rider enriched with user display info (admin roster)
#[derive(Debug, Serialize)]
pub struct RiderView {
    #[serde(flatten)]
    pub rider: Rider,
    pub user: Option<BorrowerSummary>,
}

/// Per-rider workload metrics; `pending_assignments` is computed at query
/// time, never cached.
#[derive(Debug, Serialize)]
pub struct RiderMetrics {
    pub current_assignments: i32,
    pub total_completed: i32,
    pub rating: f64,
    pub pending_assignments: i64,
}

/// Portfolio metrics for the admin dashboard
#[derive(Debug, Serialize)]
pub struct AdminMetrics {
    pub total_loans: i64,
    pub pending_loans: i64,
    pub approved_loans: i64,
    pub total_disbursed: f64,
    pub active_riders: i64,
}

/// Notification inbox with unread counter
#[derive(Debug, Serialize)]
pub struct NotificationFeed {
    pub notifications: Vec<Notification>,
    pub unread_count: i64,
}

/// API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}
