//! Authentication middleware
//!
//! Extracts the bearer token minted by the external identity provider,
//! verifies it, and attaches the actor context (user id + role set) to the
//! request. Roles are computed once here; handlers and services only ever
//! see the typed [`AuthContext`].

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    response::{IntoResponse, Response},
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use std::sync::Arc;

use crate::auth::jwt::{JwtError, TokenVerifier};
use crate::auth::{AuthContext, Role};
use crate::error::ApiError;

/// Extractor for authenticated actors
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(Authenticated(ctx): Authenticated) -> impl IntoResponse {
///     format!("Hello, user {}", ctx.user_id)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Authenticated(pub AuthContext);

#[async_trait]
impl<S> FromRequestParts<S> for Authenticated
where
    Arc<TokenVerifier>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| {
                    ApiError::Unauthorized(
                        "Authorization header with Bearer token required".to_string(),
                    )
                    .into_response()
                })?;

        let verifier = Arc::<TokenVerifier>::from_ref(state);

        let ctx = verifier.verify(bearer.token()).map_err(|e| {
            let message = match e {
                JwtError::TokenExpired => "Token has expired",
                _ => "Invalid token",
            };
            ApiError::Unauthorized(message.to_string()).into_response()
        })?;

        Ok(Authenticated(ctx))
    }
}

/// Extractor that additionally requires the admin role
pub struct AdminOnly(pub AuthContext);

#[async_trait]
impl<S> FromRequestParts<S> for AdminOnly
where
    Arc<TokenVerifier>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Authenticated(ctx) = Authenticated::from_request_parts(parts, state).await?;

        if !ctx.roles.contains(Role::Admin) {
            return Err(
                ApiError::Forbidden("Admin access required".to_string()).into_response(),
            );
        }

        Ok(AdminOnly(ctx))
    }
}
