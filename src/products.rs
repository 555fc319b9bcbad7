//! Loan product catalog
//!
//! Per-product amount and term windows used to validate applications. The
//! catalog is fixed at compile time; interest rates are quoted per
//! application, not per product.

use crate::error::ApiError;
use crate::models::LoanProductType;

/// Amount and term window for a loan product
#[derive(Debug, Clone, Copy)]
pub struct ProductTerms {
    pub min_amount: f64,
    pub max_amount: f64,
    pub min_term_months: i32,
    pub max_term_months: i32,
}

impl LoanProductType {
    /// The product's amount/term window
    pub fn terms(&self) -> ProductTerms {
        match self {
            LoanProductType::Personal => ProductTerms {
                min_amount: 1_000.0,
                max_amount: 50_000.0,
                min_term_months: 6,
                max_term_months: 60,
            },
            LoanProductType::Business => ProductTerms {
                min_amount: 5_000.0,
                max_amount: 500_000.0,
                min_term_months: 12,
                max_term_months: 84,
            },
            LoanProductType::Education => ProductTerms {
                min_amount: 1_000.0,
                max_amount: 100_000.0,
                min_term_months: 6,
                max_term_months: 120,
            },
            LoanProductType::Home => ProductTerms {
                min_amount: 50_000.0,
                max_amount: 2_000_000.0,
                min_term_months: 60,
                max_term_months: 360,
            },
            LoanProductType::Auto => ProductTerms {
                min_amount: 5_000.0,
                max_amount: 150_000.0,
                min_term_months: 12,
                max_term_months: 84,
            },
        }
    }

    /// Validate an application's amount and term against this product
    pub fn check_application(&self, amount: f64, term_months: i32) -> Result<(), ApiError> {
        let terms = self.terms();

        if amount < terms.min_amount || amount > terms.max_amount {
            return Err(ApiError::ValidationError(format!(
                "Loan amount must be between {} and {} for a {} loan",
                terms.min_amount,
                terms.max_amount,
                self.as_str()
            )));
        }

        if term_months < terms.min_term_months || term_months > terms.max_term_months {
            return Err(ApiError::ValidationError(format!(
                "Loan term must be between {} and {} months for a {} loan",
                terms.min_term_months,
                terms.max_term_months,
                self.as_str()
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_within_window_accepted() {
        assert!(LoanProductType::Personal
            .check_application(5_000.0, 12)
            .is_ok());
        assert!(LoanProductType::Home
            .check_application(250_000.0, 240)
            .is_ok());
    }

    #[test]
    fn test_amount_outside_window_rejected() {
        assert!(LoanProductType::Personal
            .check_application(500.0, 12)
            .is_err());
        assert!(LoanProductType::Personal
            .check_application(75_000.0, 12)
            .is_err());
    }

    #[test]
    fn test_term_outside_window_rejected() {
        assert!(LoanProductType::Personal
            .check_application(5_000.0, 3)
            .is_err());
        assert!(LoanProductType::Auto
            .check_application(20_000.0, 120)
            .is_err());
    }

    #[test]
    fn test_window_edges_inclusive() {
        let terms = LoanProductType::Business.terms();
        assert!(LoanProductType::Business
            .check_application(terms.min_amount, terms.min_term_months)
            .is_ok());
        assert!(LoanProductType::Business
            .check_application(terms.max_amount, terms.max_term_months)
            .is_ok());
    }
}
