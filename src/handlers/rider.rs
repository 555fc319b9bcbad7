//! Rider-facing handlers: assignments, availability, metrics

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::Authenticated;
use crate::models::{
    AddAssignmentNotesRequest, ApiResponse, AssignmentView, Rider, RiderAssignment, RiderMetrics,
    UpdateAssignmentStatusRequest, UpdateAvailabilityRequest,
};
use crate::rider_service::RiderService;

pub async fn get_assignments(
    State(service): State<RiderService>,
    Authenticated(ctx): Authenticated,
) -> Result<Json<ApiResponse<Vec<AssignmentView>>>, ApiError> {
    let assignments = service.get_assignments(&ctx).await?;

    Ok(Json(ApiResponse::ok(assignments)))
}

pub async fn update_assignment_status(
    State(service): State<RiderService>,
    Authenticated(ctx): Authenticated,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateAssignmentStatusRequest>,
) -> Result<Json<ApiResponse<RiderAssignment>>, ApiError> {
    let assignment = service
        .update_assignment_status(&ctx, id, request.status, request.notes)
        .await?;

    Ok(Json(ApiResponse::ok(assignment)))
}

pub async fn add_assignment_notes(
    State(service): State<RiderService>,
    Authenticated(ctx): Authenticated,
    Path(id): Path<Uuid>,
    Json(request): Json<AddAssignmentNotesRequest>,
) -> Result<Json<ApiResponse<RiderAssignment>>, ApiError> {
    let assignment = service
        .add_assignment_notes(&ctx, id, &request.notes)
        .await?;

    Ok(Json(ApiResponse::ok(assignment)))
}

pub async fn update_availability(
    State(service): State<RiderService>,
    Authenticated(ctx): Authenticated,
    Json(request): Json<UpdateAvailabilityRequest>,
) -> Result<Json<ApiResponse<Rider>>, ApiError> {
    let rider = service.update_availability(&ctx, request.status).await?;

    Ok(Json(ApiResponse::ok(rider)))
}

pub async fn rider_metrics(
    State(service): State<RiderService>,
    Authenticated(ctx): Authenticated,
) -> Result<Json<ApiResponse<RiderMetrics>>, ApiError> {
    let metrics = service.get_metrics(&ctx).await?;

    Ok(Json(ApiResponse::ok(metrics)))
}
