//! Common types used across the ledger.

pub mod id;
pub mod ident;
pub mod money;
pub mod pagination;

pub use id::*;
pub use ident::{AccountNumber, TxId, TxPrefix};
pub use money::Currency;
pub use pagination::{PageRequest, PageResponse, SortBy, SortDir};
