//! In-memory store
//!
//! Backs the test suite and local development without a database. The
//! whole state sits behind one `RwLock`, which is plenty for both uses.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use crate::auth::Role;
use crate::models::{
    Loan, LoanDocument, LoanStatus, LoanStatusHistory, Notification, Rider, RiderAssignment, User,
};
use crate::store::{is_active_assignment, Store, StoreError, StoreResult};

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    user_roles: HashMap<Uuid, Vec<Role>>,
    loans: HashMap<Uuid, Loan>,
    status_history: Vec<LoanStatusHistory>,
    documents: Vec<LoanDocument>,
    riders: HashMap<Uuid, Rider>,
    assignments: HashMap<Uuid, RiderAssignment>,
    notifications: HashMap<Uuid, Notification>,
}

/// In-memory [`Store`] implementation
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner.read().expect("memory store lock poisoned")
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner.write().expect("memory store lock poisoned")
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let mut inner = self.write();
        if inner.users.contains_key(&user.id) {
            return Err(StoreError::Conflict(format!(
                "user {} already exists",
                user.id
            )));
        }
        inner.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.read().users.get(&id).cloned())
    }

    async fn get_users_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<User>> {
        let inner = self.read();
        Ok(ids
            .iter()
            .filter_map(|id| inner.users.get(id).cloned())
            .collect())
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<()> {
        let mut inner = self.write();
        inner.users.remove(&id);
        inner.user_roles.remove(&id);
        Ok(())
    }

    async fn grant_role(&self, user_id: Uuid, role: Role) -> StoreResult<()> {
        let mut inner = self.write();
        let roles = inner.user_roles.entry(user_id).or_default();
        if !roles.contains(&role) {
            roles.push(role);
        }
        Ok(())
    }

    async fn insert_loan(&self, loan: &Loan) -> StoreResult<()> {
        self.write().loans.insert(loan.id, loan.clone());
        Ok(())
    }

    async fn get_loan(&self, id: Uuid) -> StoreResult<Option<Loan>> {
        Ok(self.read().loans.get(&id).cloned())
    }

    async fn update_loan(&self, loan: &Loan) -> StoreResult<Loan> {
        let mut inner = self.write();
        if !inner.loans.contains_key(&loan.id) {
            return Err(StoreError::NotFound);
        }
        inner.loans.insert(loan.id, loan.clone());
        Ok(loan.clone())
    }

    async fn list_loans_for_borrower(
        &self,
        borrower_id: Uuid,
        status: Option<LoanStatus>,
    ) -> StoreResult<Vec<Loan>> {
        let inner = self.read();
        let mut loans: Vec<Loan> = inner
            .loans
            .values()
            .filter(|l| l.borrower_id == borrower_id)
            .filter(|l| status.map_or(true, |s| l.status == s))
            .cloned()
            .collect();
        loans.sort_by(|a, b| b.applied_at.cmp(&a.applied_at));
        Ok(loans)
    }

    async fn list_loans(&self, status: Option<LoanStatus>) -> StoreResult<Vec<Loan>> {
        let inner = self.read();
        let mut loans: Vec<Loan> = inner
            .loans
            .values()
            .filter(|l| status.map_or(true, |s| l.status == s))
            .cloned()
            .collect();
        loans.sort_by(|a, b| b.applied_at.cmp(&a.applied_at));
        Ok(loans)
    }

    async fn insert_status_history(&self, entry: &LoanStatusHistory) -> StoreResult<()> {
        self.write().status_history.push(entry.clone());
        Ok(())
    }

    async fn list_status_history(&self, loan_id: Uuid) -> StoreResult<Vec<LoanStatusHistory>> {
        let inner = self.read();
        let mut entries: Vec<LoanStatusHistory> = inner
            .status_history
            .iter()
            .filter(|e| e.loan_id == loan_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.changed_at.cmp(&a.changed_at));
        Ok(entries)
    }

    async fn insert_document(&self, document: &LoanDocument) -> StoreResult<()> {
        self.write().documents.push(document.clone());
        Ok(())
    }

    async fn list_documents(&self, loan_id: Uuid) -> StoreResult<Vec<LoanDocument>> {
        let inner = self.read();
        Ok(inner
            .documents
            .iter()
            .filter(|d| d.loan_id == loan_id)
            .cloned()
            .collect())
    }

    async fn insert_rider(&self, rider: &Rider) -> StoreResult<()> {
        self.write().riders.insert(rider.id, rider.clone());
        Ok(())
    }

    async fn get_rider(&self, id: Uuid) -> StoreResult<Option<Rider>> {
        Ok(self.read().riders.get(&id).cloned())
    }

    async fn find_rider_by_user(&self, user_id: Uuid) -> StoreResult<Option<Rider>> {
        let inner = self.read();
        Ok(inner
            .riders
            .values()
            .find(|r| r.user_id == user_id)
            .cloned())
    }

    async fn update_rider(&self, rider: &Rider) -> StoreResult<Rider> {
        let mut inner = self.write();
        if !inner.riders.contains_key(&rider.id) {
            return Err(StoreError::NotFound);
        }
        inner.riders.insert(rider.id, rider.clone());
        Ok(rider.clone())
    }

    async fn list_riders(&self) -> StoreResult<Vec<Rider>> {
        let inner = self.read();
        let mut riders: Vec<Rider> = inner.riders.values().cloned().collect();
        riders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(riders)
    }

    async fn insert_assignment(&self, assignment: &RiderAssignment) -> StoreResult<()> {
        self.write()
            .assignments
            .insert(assignment.id, assignment.clone());
        Ok(())
    }

    async fn get_assignment(&self, id: Uuid) -> StoreResult<Option<RiderAssignment>> {
        Ok(self.read().assignments.get(&id).cloned())
    }

    async fn update_assignment(
        &self,
        assignment: &RiderAssignment,
    ) -> StoreResult<RiderAssignment> {
        let mut inner = self.write();
        if !inner.assignments.contains_key(&assignment.id) {
            return Err(StoreError::NotFound);
        }
        inner.assignments.insert(assignment.id, assignment.clone());
        Ok(assignment.clone())
    }

    async fn list_assignments_for_rider(
        &self,
        rider_id: Uuid,
    ) -> StoreResult<Vec<RiderAssignment>> {
        let inner = self.read();
        let mut assignments: Vec<RiderAssignment> = inner
            .assignments
            .values()
            .filter(|a| a.rider_id == rider_id)
            .cloned()
            .collect();
        assignments.sort_by(|a, b| b.assigned_at.cmp(&a.assigned_at));
        Ok(assignments)
    }

    async fn count_active_assignments_for_rider(&self, rider_id: Uuid) -> StoreResult<i64> {
        let inner = self.read();
        Ok(inner
            .assignments
            .values()
            .filter(|a| a.rider_id == rider_id && is_active_assignment(a.status))
            .count() as i64)
    }

    async fn find_active_assignment_for_loan(
        &self,
        loan_id: Uuid,
    ) -> StoreResult<Option<RiderAssignment>> {
        let inner = self.read();
        Ok(inner
            .assignments
            .values()
            .filter(|a| a.loan_id == loan_id && is_active_assignment(a.status))
            .max_by_key(|a| a.assigned_at)
            .cloned())
    }

    async fn insert_notification(&self, notification: &Notification) -> StoreResult<()> {
        self.write()
            .notifications
            .insert(notification.id, notification.clone());
        Ok(())
    }

    async fn list_notifications_for_user(
        &self,
        user_id: Uuid,
    ) -> StoreResult<Vec<Notification>> {
        let inner = self.read();
        let mut notifications: Vec<Notification> = inner
            .notifications
            .values()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notifications)
    }

    async fn mark_notification_read(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<Notification>> {
        let mut inner = self.write();
        match inner.notifications.get_mut(&id) {
            Some(n) if n.user_id == user_id => {
                n.read = true;
                Ok(Some(n.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn mark_all_notifications_read(&self, user_id: Uuid) -> StoreResult<u64> {
        let mut inner = self.write();
        let mut updated = 0;
        for n in inner.notifications.values_mut() {
            if n.user_id == user_id && !n.read {
                n.read = true;
                updated += 1;
            }
        }
        Ok(updated)
    }
}
