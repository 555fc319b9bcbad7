//! Middleware for the LoanFlow API
//!
//! Request tracing, security headers, and the authentication extractors.

pub mod auth;
mod security;
mod tracing;

pub use auth::{AdminOnly, Authenticated};
pub use security::security_headers;
pub use tracing::request_tracing;
