//! Notification inbox - user-facing notification queries

use std::sync::Arc;

use uuid::Uuid;

use crate::auth::AuthContext;
use crate::error::{ApiError, ApiResult};
use crate::models::{Notification, NotificationFeed};
use crate::store::Store;

/// Read and acknowledge notifications; any authenticated user
#[derive(Clone)]
pub struct NotificationService {
    store: Arc<dyn Store>,
}

impl NotificationService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// The actor's notifications, newest first, with an unread counter
    pub async fn list(&self, ctx: &AuthContext) -> ApiResult<NotificationFeed> {
        let notifications = self
            .store
            .list_notifications_for_user(ctx.user_id)
            .await?;
        let unread_count = notifications.iter().filter(|n| !n.read).count() as i64;

        Ok(NotificationFeed {
            notifications,
            unread_count,
        })
    }

    /// Mark one of the actor's notifications read. A foreign or unknown id
    /// resolves to NotFound.
    pub async fn mark_read(&self, ctx: &AuthContext, id: Uuid) -> ApiResult<Notification> {
        self.store
            .mark_notification_read(id, ctx.user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Notification not found".to_string()))
    }

    /// Mark all of the actor's notifications read; returns how many changed
    pub async fn mark_all_read(&self, ctx: &AuthContext) -> ApiResult<u64> {
        Ok(self.store.mark_all_notifications_read(ctx.user_id).await?)
    }
}
