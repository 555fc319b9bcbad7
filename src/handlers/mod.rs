//! API handlers for the LoanFlow backend

pub mod admin;
pub mod loans;
pub mod notifications;
pub mod rider;

pub use admin::*;
pub use loans::*;
pub use notifications::*;
pub use rider::*;
