//! Internal retry classification and backoff.

use std::time::Duration;

use argent_shared::error::LedgerError;
use argent_store::StoreError;

/// Outcome of one attempt at a commit frame: either a retryable
/// serialization conflict (naming the contested row) or a typed failure to
/// surface.
#[derive(Debug)]
pub(crate) enum TryError {
    /// First-committer-wins validation failed; the attempt may be retried.
    Conflict(String),
    /// A typed failure; surface it, never retry.
    Ledger(LedgerError),
}

impl From<StoreError> for TryError {
    fn from(err: StoreError) -> Self {
        if err.is_serialization_conflict() {
            Self::Conflict(err.to_string())
        } else {
            Self::Ledger(err.into())
        }
    }
}

impl From<LedgerError> for TryError {
    fn from(err: LedgerError) -> Self {
        Self::Ledger(err)
    }
}

/// Exponential backoff: `base * 2^attempt`, capped to keep the shift sane.
pub(crate) fn backoff_delay(base_ms: u64, attempt: u32) -> Duration {
    Duration::from_millis(base_ms.saturating_mul(1_u64 << attempt.min(16)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles() {
        assert_eq!(backoff_delay(10, 0), Duration::from_millis(10));
        assert_eq!(backoff_delay(10, 1), Duration::from_millis(20));
        assert_eq!(backoff_delay(10, 2), Duration::from_millis(40));
        assert_eq!(backoff_delay(10, 3), Duration::from_millis(80));
    }

    #[test]
    fn test_backoff_saturates() {
        // Large attempt counts must not overflow.
        let delay = backoff_delay(u64::MAX, 40);
        assert_eq!(delay, Duration::from_millis(u64::MAX));
    }

    #[test]
    fn test_conflict_classification() {
        let conflict: TryError = StoreError::Serialization("balance x".into()).into();
        assert!(matches!(conflict, TryError::Conflict(_)));

        let fatal: TryError = StoreError::NotFound("account".into()).into();
        assert!(matches!(fatal, TryError::Ledger(LedgerError::NotFound(_))));
    }
}
