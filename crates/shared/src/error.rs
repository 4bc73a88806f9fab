//! Ledger-wide error taxonomy.
//!
//! Every failure the engine can surface carries a stable machine-readable
//! code and an HTTP-mappable status so perimeter layers can translate without
//! inspecting messages.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::types::AccountId;

/// Result type alias using `LedgerError`.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Failures surfaced by the ledger core.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Shape or format violation in an input (bad amount, malformed account
    /// number, same from/to, unknown currency).
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The caller's role or ownership does not permit the operation.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Account, balance, or transaction missing.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation targets a closed account.
    #[error("Account is inactive: {0}")]
    InactiveAccount(String),

    /// Declared currency differs from the referenced account's currency.
    #[error("Currency mismatch: declared {declared}, account holds {held}")]
    CurrencyMismatch {
        /// Currency declared on the operation.
        declared: String,
        /// Currency of the referenced account.
        held: String,
    },

    /// Sufficiency check failed.
    #[error("Insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds {
        /// The offending account, when the failure is attributable to one entry.
        account_id: Option<AccountId>,
        /// Balance available at check time.
        available: Decimal,
        /// Amount the operation required.
        requested: Decimal,
    },

    /// Unique-key violation (duplicate transaction id, duplicate balance row).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Attempted status change outside the legal transition set.
    #[error("Illegal state transition: {from} -> {to}")]
    IllegalStateTransition {
        /// Status before the attempt.
        from: String,
        /// Requested status.
        to: String,
    },

    /// A completed reversal already references the original transaction.
    #[error("Transaction already reversed: {0}")]
    AlreadyReversed(String),

    /// Serialization retries exceeded the configured budget.
    #[error("Concurrency retries exhausted after {attempts} attempts")]
    ConcurrencyExhausted {
        /// Attempts made before giving up.
        attempts: u32,
    },

    /// Underlying store I/O failure.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// The caller abandoned the operation before commit.
    #[error("Operation cancelled")]
    Cancelled,

    /// The caller-supplied deadline expired during the operation.
    #[error("Deadline exceeded")]
    DeadlineExceeded,
}

impl From<crate::types::ident::IdentError> for LedgerError {
    fn from(err: crate::types::ident::IdentError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl LedgerError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest(_) => 400,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::Cancelled | Self::DeadlineExceeded => 408,
            Self::Conflict(_) | Self::IllegalStateTransition { .. } | Self::AlreadyReversed(_) => {
                409
            }
            Self::InactiveAccount(_)
            | Self::CurrencyMismatch { .. }
            | Self::InsufficientFunds { .. } => 422,
            Self::ConcurrencyExhausted { .. } | Self::StoreUnavailable(_) => 503,
        }
    }

    /// Returns the stable error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::InactiveAccount(_) => "INACTIVE_ACCOUNT",
            Self::CurrencyMismatch { .. } => "CURRENCY_MISMATCH",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::Conflict(_) => "CONFLICT",
            Self::IllegalStateTransition { .. } => "ILLEGAL_STATE_TRANSITION",
            Self::AlreadyReversed(_) => "ALREADY_REVERSED",
            Self::ConcurrencyExhausted { .. } => "CONCURRENCY_EXHAUSTED",
            Self::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            Self::Cancelled => "CANCELLED",
            Self::DeadlineExceeded => "DEADLINE_EXCEEDED",
        }
    }

    /// Builds an `InsufficientFunds` error without an attributed account.
    #[must_use]
    pub const fn insufficient(available: Decimal, requested: Decimal) -> Self {
        Self::InsufficientFunds {
            account_id: None,
            available,
            requested,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_status_codes() {
        assert_eq!(LedgerError::BadRequest(String::new()).status_code(), 400);
        assert_eq!(LedgerError::Forbidden(String::new()).status_code(), 403);
        assert_eq!(LedgerError::NotFound(String::new()).status_code(), 404);
        assert_eq!(LedgerError::Conflict(String::new()).status_code(), 409);
        assert_eq!(
            LedgerError::insufficient(dec!(50), dec!(75)).status_code(),
            422
        );
        assert_eq!(
            LedgerError::StoreUnavailable(String::new()).status_code(),
            503
        );
        assert_eq!(LedgerError::DeadlineExceeded.status_code(), 408);
    }

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(
            LedgerError::insufficient(dec!(1), dec!(2)).error_code(),
            "INSUFFICIENT_FUNDS"
        );
        assert_eq!(
            LedgerError::AlreadyReversed("TRF-1-AAAAAAAA".into()).error_code(),
            "ALREADY_REVERSED"
        );
        assert_eq!(
            LedgerError::ConcurrencyExhausted { attempts: 3 }.error_code(),
            "CONCURRENCY_EXHAUSTED"
        );
    }

    #[test]
    fn test_insufficient_funds_payload() {
        let err = LedgerError::insufficient(dec!(50.00), dec!(75.00));
        match err {
            LedgerError::InsufficientFunds {
                account_id,
                available,
                requested,
            } => {
                assert!(account_id.is_none());
                assert_eq!(available, dec!(50.00));
                assert_eq!(requested, dec!(75.00));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_display_messages() {
        let err = LedgerError::CurrencyMismatch {
            declared: "EUR".into(),
            held: "USD".into(),
        };
        assert_eq!(
            err.to_string(),
            "Currency mismatch: declared EUR, account holds USD"
        );
    }
}
