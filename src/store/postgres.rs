//! PostgreSQL store
//!
//! Production [`Store`] implementation over an sqlx connection pool. The
//! schema lives in `migrations/`.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::Role;
use crate::models::{
    Loan, LoanDocument, LoanStatus, LoanStatusHistory, Notification, Rider, RiderAssignment, User,
};
use crate::store::{Store, StoreResult};

/// PostgreSQL-backed [`Store`]
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, full_name, phone, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(&user.phone)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn get_users_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(users)
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<()> {
        // Role grants go with the profile (ON DELETE CASCADE)
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn grant_role(&self, user_id: Uuid, role: Role) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_roles (user_id, role)
            VALUES ($1, $2)
            ON CONFLICT (user_id, role) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(role.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert_loan(&self, loan: &Loan) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO loans (
                id, borrower_id, rider_id, product_type, amount, term_months,
                interest_rate, status, purpose, notes, monthly_payment,
                total_repayment, applied_at, reviewed_at, reviewed_by,
                approved_at, disbursed_at, closed_at, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                    $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
            "#,
        )
        .bind(loan.id)
        .bind(loan.borrower_id)
        .bind(loan.rider_id)
        .bind(loan.product_type)
        .bind(loan.amount)
        .bind(loan.term_months)
        .bind(loan.interest_rate)
        .bind(loan.status)
        .bind(&loan.purpose)
        .bind(&loan.notes)
        .bind(loan.monthly_payment)
        .bind(loan.total_repayment)
        .bind(loan.applied_at)
        .bind(loan.reviewed_at)
        .bind(loan.reviewed_by)
        .bind(loan.approved_at)
        .bind(loan.disbursed_at)
        .bind(loan.closed_at)
        .bind(loan.created_at)
        .bind(loan.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_loan(&self, id: Uuid) -> StoreResult<Option<Loan>> {
        let loan = sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(loan)
    }

    async fn update_loan(&self, loan: &Loan) -> StoreResult<Loan> {
        let updated = sqlx::query_as::<_, Loan>(
            r#"
            UPDATE loans SET
                rider_id = $2, status = $3, purpose = $4, notes = $5,
                monthly_payment = $6, total_repayment = $7, reviewed_at = $8,
                reviewed_by = $9, approved_at = $10, disbursed_at = $11,
                closed_at = $12, updated_at = $13
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(loan.id)
        .bind(loan.rider_id)
        .bind(loan.status)
        .bind(&loan.purpose)
        .bind(&loan.notes)
        .bind(loan.monthly_payment)
        .bind(loan.total_repayment)
        .bind(loan.reviewed_at)
        .bind(loan.reviewed_by)
        .bind(loan.approved_at)
        .bind(loan.disbursed_at)
        .bind(loan.closed_at)
        .bind(loan.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(updated)
    }

    async fn list_loans_for_borrower(
        &self,
        borrower_id: Uuid,
        status: Option<LoanStatus>,
    ) -> StoreResult<Vec<Loan>> {
        let mut query_builder: sqlx::QueryBuilder<sqlx::Postgres> =
            sqlx::QueryBuilder::new("SELECT * FROM loans WHERE borrower_id = ");
        query_builder.push_bind(borrower_id);

        if let Some(status) = status {
            query_builder.push(" AND status = ");
            query_builder.push_bind(status);
        }

        query_builder.push(" ORDER BY applied_at DESC");

        let loans = query_builder
            .build_query_as::<Loan>()
            .fetch_all(&self.pool)
            .await?;

        Ok(loans)
    }

    async fn list_loans(&self, status: Option<LoanStatus>) -> StoreResult<Vec<Loan>> {
        let mut query_builder: sqlx::QueryBuilder<sqlx::Postgres> =
            sqlx::QueryBuilder::new("SELECT * FROM loans WHERE 1=1");

        if let Some(status) = status {
            query_builder.push(" AND status = ");
            query_builder.push_bind(status);
        }

        query_builder.push(" ORDER BY applied_at DESC");

        let loans = query_builder
            .build_query_as::<Loan>()
            .fetch_all(&self.pool)
            .await?;

        Ok(loans)
    }

    async fn insert_status_history(&self, entry: &LoanStatusHistory) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO loan_status_history (
                id, loan_id, old_status, new_status, notes, changed_by, changed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(entry.id)
        .bind(entry.loan_id)
        .bind(entry.old_status)
        .bind(entry.new_status)
        .bind(&entry.notes)
        .bind(entry.changed_by)
        .bind(entry.changed_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_status_history(&self, loan_id: Uuid) -> StoreResult<Vec<LoanStatusHistory>> {
        let entries = sqlx::query_as::<_, LoanStatusHistory>(
            "SELECT * FROM loan_status_history WHERE loan_id = $1 ORDER BY changed_at DESC",
        )
        .bind(loan_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    async fn insert_document(&self, document: &LoanDocument) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO loan_documents (
                id, loan_id, file_name, storage_path, document_type,
                uploaded_by, uploaded_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(document.id)
        .bind(document.loan_id)
        .bind(&document.file_name)
        .bind(&document.storage_path)
        .bind(document.document_type)
        .bind(document.uploaded_by)
        .bind(document.uploaded_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_documents(&self, loan_id: Uuid) -> StoreResult<Vec<LoanDocument>> {
        let documents = sqlx::query_as::<_, LoanDocument>(
            "SELECT * FROM loan_documents WHERE loan_id = $1 ORDER BY uploaded_at",
        )
        .bind(loan_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(documents)
    }

    async fn insert_rider(&self, rider: &Rider) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO riders (
                id, user_id, zone, status, max_assignments, current_assignments,
                total_completed, rating, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(rider.id)
        .bind(rider.user_id)
        .bind(&rider.zone)
        .bind(rider.status)
        .bind(rider.max_assignments)
        .bind(rider.current_assignments)
        .bind(rider.total_completed)
        .bind(rider.rating)
        .bind(rider.created_at)
        .bind(rider.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_rider(&self, id: Uuid) -> StoreResult<Option<Rider>> {
        let rider = sqlx::query_as::<_, Rider>("SELECT * FROM riders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(rider)
    }

    async fn find_rider_by_user(&self, user_id: Uuid) -> StoreResult<Option<Rider>> {
        let rider = sqlx::query_as::<_, Rider>("SELECT * FROM riders WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(rider)
    }

    async fn update_rider(&self, rider: &Rider) -> StoreResult<Rider> {
        let updated = sqlx::query_as::<_, Rider>(
            r#"
            UPDATE riders SET
                zone = $2, status = $3, max_assignments = $4,
                current_assignments = $5, total_completed = $6, rating = $7,
                updated_at = $8
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(rider.id)
        .bind(&rider.zone)
        .bind(rider.status)
        .bind(rider.max_assignments)
        .bind(rider.current_assignments)
        .bind(rider.total_completed)
        .bind(rider.rating)
        .bind(rider.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(updated)
    }

    async fn list_riders(&self) -> StoreResult<Vec<Rider>> {
        let riders = sqlx::query_as::<_, Rider>("SELECT * FROM riders ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;

        Ok(riders)
    }

    async fn insert_assignment(&self, assignment: &RiderAssignment) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO rider_assignments (
                id, rider_id, loan_id, status, assigned_at, assigned_by,
                completed_at, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(assignment.id)
        .bind(assignment.rider_id)
        .bind(assignment.loan_id)
        .bind(assignment.status)
        .bind(assignment.assigned_at)
        .bind(assignment.assigned_by)
        .bind(assignment.completed_at)
        .bind(&assignment.notes)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_assignment(&self, id: Uuid) -> StoreResult<Option<RiderAssignment>> {
        let assignment =
            sqlx::query_as::<_, RiderAssignment>("SELECT * FROM rider_assignments WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(assignment)
    }

    async fn update_assignment(
        &self,
        assignment: &RiderAssignment,
    ) -> StoreResult<RiderAssignment> {
        let updated = sqlx::query_as::<_, RiderAssignment>(
            r#"
            UPDATE rider_assignments SET
                status = $2, completed_at = $3, notes = $4
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(assignment.id)
        .bind(assignment.status)
        .bind(assignment.completed_at)
        .bind(&assignment.notes)
        .fetch_one(&self.pool)
        .await?;

        Ok(updated)
    }

    async fn list_assignments_for_rider(
        &self,
        rider_id: Uuid,
    ) -> StoreResult<Vec<RiderAssignment>> {
        let assignments = sqlx::query_as::<_, RiderAssignment>(
            "SELECT * FROM rider_assignments WHERE rider_id = $1 ORDER BY assigned_at DESC",
        )
        .bind(rider_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(assignments)
    }

    async fn count_active_assignments_for_rider(&self, rider_id: Uuid) -> StoreResult<i64> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM rider_assignments
            WHERE rider_id = $1 AND status IN ('assigned', 'in_progress')
            "#,
        )
        .bind(rider_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn find_active_assignment_for_loan(
        &self,
        loan_id: Uuid,
    ) -> StoreResult<Option<RiderAssignment>> {
        let assignment = sqlx::query_as::<_, RiderAssignment>(
            r#"
            SELECT * FROM rider_assignments
            WHERE loan_id = $1 AND status IN ('assigned', 'in_progress')
            ORDER BY assigned_at DESC
            LIMIT 1
            "#,
        )
        .bind(loan_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(assignment)
    }

    async fn insert_notification(&self, notification: &Notification) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO notifications (
                id, user_id, type, title, message, read, related_loan_id, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(notification.id)
        .bind(notification.user_id)
        .bind(notification.kind)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.read)
        .bind(notification.related_loan_id)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_notifications_for_user(
        &self,
        user_id: Uuid,
    ) -> StoreResult<Vec<Notification>> {
        let notifications = sqlx::query_as::<_, Notification>(
            "SELECT * FROM notifications WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(notifications)
    }

    async fn mark_notification_read(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<Notification>> {
        let notification = sqlx::query_as::<_, Notification>(
            r#"
            UPDATE notifications SET read = TRUE
            WHERE id = $1 AND user_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(notification)
    }

    async fn mark_all_notifications_read(&self, user_id: Uuid) -> StoreResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET read = TRUE WHERE user_id = $1 AND read = FALSE",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
