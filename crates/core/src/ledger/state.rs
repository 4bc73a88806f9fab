//! Transaction status state machine.
//!
//! Legal transitions:
//!
//! ```text
//! Pending    -> Processing | Cancelled
//! Processing -> Completed  | Failed
//! Completed  -> (terminal)
//! Failed     -> (terminal)
//! Cancelled  -> (terminal)
//! ```

use argent_shared::error::{LedgerError, LedgerResult};

use super::types::TransactionStatus;

/// Whether `from -> to` is a legal status transition.
#[must_use]
pub const fn can_transition(from: TransactionStatus, to: TransactionStatus) -> bool {
    matches!(
        (from, to),
        (
            TransactionStatus::Pending,
            TransactionStatus::Processing | TransactionStatus::Cancelled
        ) | (
            TransactionStatus::Processing,
            TransactionStatus::Completed | TransactionStatus::Failed
        )
    )
}

/// Checks a transition, surfacing `IllegalStateTransition` when it is not in
/// the legal set. Terminal states reject every change.
pub fn check_transition(from: TransactionStatus, to: TransactionStatus) -> LedgerResult<()> {
    if can_transition(from, to) {
        Ok(())
    } else {
        Err(LedgerError::IllegalStateTransition {
            from: from.as_str().to_string(),
            to: to.as_str().to_string(),
        })
    }
}
