//! Store-internal error types, converted to the public taxonomy at the
//! engine boundary.

use thiserror::Error;

use argent_core::ledger::types::TransactionStatus;
use argent_shared::error::LedgerError;
use argent_shared::types::{AccountId, AccountNumber, TxId};

/// Failures raised by the store and its repositories.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Row missing.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A balance row already exists for the account.
    #[error("Duplicate balance row for account {0}")]
    DuplicateBalance(AccountId),

    /// The transaction id is already in the journal.
    #[error("Duplicate transaction id: {0}")]
    DuplicateTransaction(TxId),

    /// The account number is already taken.
    #[error("Duplicate account number: {0}")]
    DuplicateAccountNumber(AccountNumber),

    /// A completed reversal already references the original transaction.
    #[error("A completed reversal already references {0}")]
    DuplicateReversal(TxId),

    /// Requested status change is outside the legal transition set.
    #[error("Illegal state transition: {from} -> {to}")]
    IllegalStateTransition {
        /// Status before the attempt.
        from: TransactionStatus,
        /// Requested status.
        to: TransactionStatus,
    },

    /// A row read by this context changed before commit; first committer won.
    #[error("Serialization conflict on {0}")]
    Serialization(String),

    /// The transaction violates journal invariants (last-line defense).
    #[error("Invalid transaction: {0}")]
    Invalid(String),

    /// The context's deadline expired.
    #[error("Deadline exceeded")]
    DeadlineExceeded,

    /// Store I/O failure.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Whether the failure is a serialization conflict the engine may retry.
    #[must_use]
    pub const fn is_serialization_conflict(&self) -> bool {
        matches!(self, Self::Serialization(_))
    }
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => Self::NotFound(what),
            StoreError::DuplicateBalance(account) => {
                Self::Conflict(format!("balance already exists for account {account}"))
            }
            StoreError::DuplicateTransaction(tx_id) => {
                Self::Conflict(format!("transaction id already exists: {tx_id}"))
            }
            StoreError::DuplicateAccountNumber(number) => {
                Self::Conflict(format!("account number already exists: {number}"))
            }
            StoreError::DuplicateReversal(tx_id) => Self::AlreadyReversed(tx_id.to_string()),
            StoreError::IllegalStateTransition { from, to } => Self::IllegalStateTransition {
                from: from.as_str().to_string(),
                to: to.as_str().to_string(),
            },
            StoreError::Serialization(what) => {
                Self::Conflict(format!("serialization conflict on {what}"))
            }
            StoreError::Invalid(what) => Self::BadRequest(what),
            StoreError::DeadlineExceeded => Self::DeadlineExceeded,
            StoreError::Unavailable(what) => Self::StoreUnavailable(what),
        }
    }
}
