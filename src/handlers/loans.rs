//! Borrower-facing loan handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::ApiError;
use crate::loan_service::LoanService;
use crate::middleware::Authenticated;
use crate::models::{
    AddLoanDocumentRequest, ApiResponse, CreateLoanRequest, Loan, LoanDetail, LoanDocument,
    LoanListQuery, LoanStatusHistory,
};

pub async fn create_loan(
    State(service): State<LoanService>,
    Authenticated(ctx): Authenticated,
    Json(request): Json<CreateLoanRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Loan>>), ApiError> {
    let loan = service.create(&ctx, request).await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(loan))))
}

pub async fn list_loans(
    State(service): State<LoanService>,
    Authenticated(ctx): Authenticated,
    Query(query): Query<LoanListQuery>,
) -> Result<Json<ApiResponse<Vec<Loan>>>, ApiError> {
    let loans = service.list_for_borrower(&ctx, query.status).await?;

    Ok(Json(ApiResponse::ok(loans)))
}

pub async fn get_loan(
    State(service): State<LoanService>,
    Authenticated(ctx): Authenticated,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<LoanDetail>>, ApiError> {
    let loan = service.get_by_id(&ctx, id).await?;

    Ok(Json(ApiResponse::ok(loan)))
}

pub async fn get_loan_history(
    State(service): State<LoanService>,
    Authenticated(ctx): Authenticated,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<LoanStatusHistory>>>, ApiError> {
    let history = service.status_history(&ctx, id).await?;

    Ok(Json(ApiResponse::ok(history)))
}

pub async fn add_loan_document(
    State(service): State<LoanService>,
    Authenticated(ctx): Authenticated,
    Path(id): Path<Uuid>,
    Json(request): Json<AddLoanDocumentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<LoanDocument>>), ApiError> {
    let document = service.add_document(&ctx, id, request).await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(document))))
}
