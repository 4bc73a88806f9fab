//! Double-entry ledger domain logic.

pub mod posting;
pub mod reversal;
pub mod state;
pub mod types;
pub mod validation;

pub use posting::{check_sufficiency, customer_and_counterparty_entries};
pub use types::{
    Account, AccountKind, Balance, DepositInput, Entry, EntrySide, FeeInput, Metadata, Operation,
    ReversalInput, SystemPurpose, Transaction, TransactionKind, TransactionStatus, TransferInput,
    WithdrawalInput,
};
