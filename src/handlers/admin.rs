//! Admin handlers: loan review, rider roster, dashboard metrics

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::ApiError;
use crate::loan_service::LoanService;
use crate::middleware::AdminOnly;
use crate::models::{
    AdminLoanView, AdminMetrics, ApiResponse, AssignRiderRequest, CreateRiderRequest,
    CreateRiderResponse, Loan, LoanListQuery, RiderView, UpdateLoanStatusRequest,
};
use crate::rider_service::RiderService;

pub async fn list_all_loans(
    State(service): State<LoanService>,
    AdminOnly(ctx): AdminOnly,
    Query(query): Query<LoanListQuery>,
) -> Result<Json<ApiResponse<Vec<AdminLoanView>>>, ApiError> {
    let loans = service.list_all(&ctx, query.status).await?;

    Ok(Json(ApiResponse::ok(loans)))
}

pub async fn update_loan_status(
    State(service): State<LoanService>,
    AdminOnly(ctx): AdminOnly,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateLoanStatusRequest>,
) -> Result<Json<ApiResponse<Loan>>, ApiError> {
    let loan = service
        .update_status(&ctx, id, request.status, request.notes)
        .await?;

    Ok(Json(ApiResponse::ok(loan)))
}

pub async fn assign_rider(
    State(service): State<RiderService>,
    AdminOnly(ctx): AdminOnly,
    Path(id): Path<Uuid>,
    Json(request): Json<AssignRiderRequest>,
) -> Result<Json<ApiResponse<Loan>>, ApiError> {
    let loan = service.assign_rider(&ctx, id, request.rider_id).await?;

    Ok(Json(ApiResponse::ok(loan)))
}

pub async fn list_riders(
    State(service): State<RiderService>,
    AdminOnly(ctx): AdminOnly,
) -> Result<Json<ApiResponse<Vec<RiderView>>>, ApiError> {
    let riders = service.list_riders(&ctx).await?;

    Ok(Json(ApiResponse::ok(riders)))
}

pub async fn create_rider(
    State(service): State<RiderService>,
    AdminOnly(ctx): AdminOnly,
    Json(request): Json<CreateRiderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CreateRiderResponse>>), ApiError> {
    let rider = service.create_rider(&ctx, request).await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(rider))))
}

pub async fn admin_metrics(
    State(service): State<LoanService>,
    AdminOnly(ctx): AdminOnly,
) -> Result<Json<ApiResponse<AdminMetrics>>, ApiError> {
    let metrics = service.admin_metrics(&ctx).await?;

    Ok(Json(ApiResponse::ok(metrics)))
}
