//! Notification dispatcher
//!
//! Single funnel for the notification side effects of loan and assignment
//! transitions. Delivery is best-effort: a failed insert is logged and
//! swallowed so it can never fail the primary operation that triggered it.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::models::{Notification, NotificationType};
use crate::store::Store;

/// Dispatches user-facing notifications
#[derive(Clone)]
pub struct Notifier {
    store: Arc<dyn Store>,
}

impl Notifier {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Record a notification for `user_id`. Infallible by contract; the
    /// triggering transaction has already committed when this runs.
    pub async fn notify(
        &self,
        user_id: Uuid,
        kind: NotificationType,
        title: &str,
        message: &str,
        related_loan_id: Option<Uuid>,
    ) {
        let notification = Notification {
            id: Uuid::new_v4(),
            user_id,
            kind,
            title: title.to_string(),
            message: message.to_string(),
            read: false,
            related_loan_id,
            created_at: Utc::now(),
        };

        if let Err(err) = self.store.insert_notification(&notification).await {
            tracing::warn!(
                user_id = %user_id,
                title = %title,
                error = %err,
                "Failed to deliver notification"
            );
        }
    }
}
