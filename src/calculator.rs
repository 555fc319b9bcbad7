//! Amortization calculator
//!
//! Pure repayment math shared by the application flow and the quote
//! endpoint. Deterministic: identical inputs always produce identical
//! outputs, which test fixtures rely on.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Calculator input errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CalculatorError {
    #[error("Invalid input: {0}")]
    InvalidInput(&'static str),
}

/// Repayment quote for a principal/rate/term combination
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LoanQuote {
    pub monthly_payment: f64,
    pub total_payment: f64,
    pub total_interest: f64,
}

/// Round to cents, half away from zero. Applied at the final step only;
/// intermediate values stay at full precision.
fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Compute the monthly payment, total payment and total interest for an
/// amortizing loan.
///
/// The annual rate is a percentage (8.5 means 8.5% per year). A zero rate
/// degenerates to straight-line repayment, which sidesteps the division by
/// zero in the standard formula.
pub fn calculate(
    principal: f64,
    annual_rate_percent: f64,
    term_months: u32,
) -> Result<LoanQuote, CalculatorError> {
    if !principal.is_finite() || principal <= 0.0 {
        return Err(CalculatorError::InvalidInput(
            "principal must be a positive number",
        ));
    }
    if term_months == 0 {
        return Err(CalculatorError::InvalidInput(
            "term must be a positive number of months",
        ));
    }
    if !annual_rate_percent.is_finite() || annual_rate_percent < 0.0 {
        return Err(CalculatorError::InvalidInput(
            "annual rate must be non-negative",
        ));
    }

    let monthly_rate = annual_rate_percent / 100.0 / 12.0;

    let monthly_payment = if monthly_rate == 0.0 {
        principal / term_months as f64
    } else {
        let growth = (1.0 + monthly_rate).powi(term_months as i32);
        principal * monthly_rate * growth / (growth - 1.0)
    };

    let total_payment = monthly_payment * term_months as f64;
    let total_interest = total_payment - principal;

    Ok(LoanQuote {
        monthly_payment: round_cents(monthly_payment),
        total_payment: round_cents(total_payment),
        total_interest: round_cents(total_interest),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_quote() {
        // Golden values for the standard amortization formula.
        let quote = calculate(10_000.0, 8.5, 24).unwrap();
        assert_eq!(quote.monthly_payment, 454.56);
        assert_eq!(quote.total_payment, 10_909.36);
        assert_eq!(quote.total_interest, 909.36);
    }

    #[test]
    fn test_zero_rate_is_straight_line() {
        let quote = calculate(12_000.0, 0.0, 12).unwrap();
        assert_eq!(quote.monthly_payment, 1_000.00);
        assert_eq!(quote.total_payment, 12_000.00);
        assert_eq!(quote.total_interest, 0.00);
    }

    #[test]
    fn test_deterministic() {
        let a = calculate(5_000.0, 10.0, 12).unwrap();
        let b = calculate(5_000.0, 10.0, 12).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.monthly_payment.to_bits(), b.monthly_payment.to_bits());
    }

    #[test]
    fn test_single_month_term() {
        let quote = calculate(1_000.0, 12.0, 1).unwrap();
        // One payment of principal plus one month of interest.
        assert_eq!(quote.monthly_payment, 1_010.00);
        assert_eq!(quote.total_interest, 10.00);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(matches!(
            calculate(0.0, 8.5, 24),
            Err(CalculatorError::InvalidInput(_))
        ));
        assert!(matches!(
            calculate(-100.0, 8.5, 24),
            Err(CalculatorError::InvalidInput(_))
        ));
        assert!(matches!(
            calculate(10_000.0, 8.5, 0),
            Err(CalculatorError::InvalidInput(_))
        ));
        assert!(matches!(
            calculate(10_000.0, -1.0, 24),
            Err(CalculatorError::InvalidInput(_))
        ));
        assert!(matches!(
            calculate(f64::NAN, 8.5, 24),
            Err(CalculatorError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_total_is_monthly_times_term_before_rounding() {
        // Rounding happens once at the end, so the rounded total can differ
        // from rounded-monthly * term by more than a cent.
        let quote = calculate(10_000.0, 8.5, 24).unwrap();
        let naive_total = quote.monthly_payment * 24.0;
        assert!((quote.total_payment - naive_total).abs() < 0.25);
    }
}
