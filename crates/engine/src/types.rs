//! Engine-facing input and output types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use argent_core::ledger::types::{AccountKind, Metadata};
use argent_shared::types::{AccountNumber, Currency, TxId, UserId};

/// Input for provisioning a customer account.
#[derive(Debug, Clone)]
pub struct OpenAccountInput {
    /// The owning user.
    pub owner_id: UserId,
    /// Account classification; SYSTEM is engine-owned and rejected here.
    pub kind: AccountKind,
    /// Account currency, fixed for life.
    pub currency: Currency,
    /// Optional metadata.
    pub metadata: Option<Metadata>,
}

/// A balance as reported to callers.
///
/// `available` currently equals `amount`: holds and pending authorizations
/// do not reduce availability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceView {
    /// The account.
    pub account_number: AccountNumber,
    /// Account currency.
    pub currency: Currency,
    /// Current ledger balance.
    pub amount: Decimal,
    /// Spendable balance.
    pub available: Decimal,
    /// Time of the last balance write.
    pub last_updated: DateTime<Utc>,
}

/// Outcome of a pending-transaction sweep.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SweepReport {
    /// Rows committed by this sweep.
    pub processed: u64,
    /// Rows marked failed by this sweep.
    pub failed: u64,
    /// Transaction ids of the failed rows.
    pub failed_ids: Vec<TxId>,
}
