//! The Argent ledger engine.
//!
//! The engine is the only writer of the balance and journal stores. Each
//! operation runs the same commit frame: open a serializable commit context,
//! load and check the affected accounts, build a balanced entry set, run the
//! sufficiency check, append the journal row, write the new balances, mark
//! the row completed, and commit. On any failure the context is dropped and
//! no partial state persists.
//!
//! Serialization conflicts are retried internally with exponential backoff;
//! everything else surfaces as a typed [`LedgerError`].
//!
//! [`LedgerError`]: argent_shared::error::LedgerError

pub mod engine;
mod queries;
mod retry;
mod sweep;
pub mod types;

pub use engine::LedgerEngine;
pub use types::{BalanceView, OpenAccountInput, SweepReport};
