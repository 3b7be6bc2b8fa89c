//! Service Layer
//!
//! Lifecycle operations grouped by concern. Each file adds an
//! `impl LifecycleManager` block; the public methods are the exported
//! operations and convert every internal error to an `ActionResult`.

mod client_service;
mod link_service;
mod messaging_service;
mod payment_service;
mod protocol_service;

pub use client_service::CreateClientRequest;
pub use link_service::CreatePaymentLinkRequest;
pub use messaging_service::{MsaSent, SowSent};
pub use payment_service::{classify_payment, PaymentProcessed, PaymentRecorded};

use covenant_core::{CovenantResult, ValidationError};

/// Normalize a positive decimal amount such as "2500" or "49.90".
pub(crate) fn validate_amount(raw: &str) -> CovenantResult<String> {
    let amount = raw.trim();
    let (whole, fraction) = amount.split_once('.').unwrap_or((amount, ""));
    let digits_only = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    let well_formed = !whole.is_empty()
        && digits_only(whole)
        && digits_only(fraction)
        && (fraction.is_empty() == !amount.contains('.'));
    let positive = amount.chars().any(|c| matches!(c, '1'..='9'));

    if well_formed && positive {
        Ok(amount.to_string())
    } else {
        Err(ValidationError::InvalidValue {
            field: "amount".to_string(),
            reason: "must be a positive decimal".to_string(),
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_amount() {
        assert_eq!(validate_amount(" 2500 ").unwrap(), "2500");
        assert_eq!(validate_amount("49.90").unwrap(), "49.90");
        assert_eq!(validate_amount("0.5").unwrap(), "0.5");
        for bad in ["", "0", "0.00", "-5", "1.", ".5", "1.2.3", "12a", "1e3"] {
            assert!(validate_amount(bad).is_err(), "accepted {:?}", bad);
        }
    }
}
