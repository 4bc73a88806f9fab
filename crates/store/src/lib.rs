//! Transactional store for the Argent ledger core.
//!
//! This crate provides:
//! - The versioned in-process store and its serializable commit contexts
//!   (snapshot reads with recorded row versions, buffered writes,
//!   first-committer-wins validation at commit)
//! - Repositories over the store for accounts, balances, and the journal
//! - The system-account router
//!
//! The store is the only place state lives; repositories are views over it
//! and the commit context is the unit of atomicity. Dropping a context
//! without committing leaves no trace.

pub mod error;
pub mod repositories;
pub mod router;
pub mod tx;

pub use error::StoreError;
pub use repositories::{
    AccountRepository, BalanceRepository, JournalRepository, TransactionFilter,
};
pub use router::SystemAccountRouter;
pub use tx::{CommitCtx, Store};
