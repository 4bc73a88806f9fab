//! Repositories over the transactional store.

pub mod account;
pub mod balance;
pub mod journal;

pub use account::AccountRepository;
pub use balance::BalanceRepository;
pub use journal::{JournalRepository, TransactionFilter};
