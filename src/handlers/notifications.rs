//! Notification inbox handlers

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::Authenticated;
use crate::models::{ApiResponse, Notification, NotificationFeed};
use crate::notification_service::NotificationService;

pub async fn list_notifications(
    State(service): State<NotificationService>,
    Authenticated(ctx): Authenticated,
) -> Result<Json<ApiResponse<NotificationFeed>>, ApiError> {
    let feed = service.list(&ctx).await?;

    Ok(Json(ApiResponse::ok(feed)))
}

pub async fn mark_notification_read(
    State(service): State<NotificationService>,
    Authenticated(ctx): Authenticated,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Notification>>, ApiError> {
    let notification = service.mark_read(&ctx, id).await?;

    Ok(Json(ApiResponse::ok(notification)))
}

pub async fn mark_all_notifications_read(
    State(service): State<NotificationService>,
    Authenticated(ctx): Authenticated,
) -> Result<Json<ApiResponse<u64>>, ApiError> {
    let updated = service.mark_all_read(&ctx).await?;

    Ok(Json(ApiResponse::ok(updated)))
}
