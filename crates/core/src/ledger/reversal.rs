//! Reversal construction.
//!
//! A reversal is a side-flipped copy of a completed transaction's entries:
//! debits become credits and credits become debits with the same amounts, so
//! applying the original and its reversal restores every affected balance
//! exactly.

use chrono::{DateTime, Utc};
use serde_json::Value;

use argent_shared::types::{JournalId, TxId, UserId};

use super::types::{Entry, Metadata, Transaction, TransactionKind, TransactionStatus};

/// Metadata key linking a reversal to its original transaction.
pub const ORIGINAL_TX_ID_KEY: &str = "originalTransactionId";

/// Metadata key carrying the reversal reason.
pub const REVERSAL_REASON_KEY: &str = "reversalReason";

/// Side-flips every entry of the original, preserving accounts and amounts.
#[must_use]
pub fn reversing_entries(original: &[Entry]) -> Vec<Entry> {
    original
        .iter()
        .map(|entry| Entry {
            account_id: entry.account_id,
            side: entry.side.flipped(),
            amount: entry.amount,
        })
        .collect()
}

/// Assembles the reversal journal row for a completed original.
///
/// The from/to accounts are swapped, the reference points at the original,
/// and the metadata carries the original id and the reason alongside any
/// caller-supplied keys.
#[must_use]
pub fn build_reversal(
    original: &Transaction,
    id: JournalId,
    tx_id: TxId,
    initiated_by: UserId,
    reason: &str,
    extra_metadata: Option<Metadata>,
    now: DateTime<Utc>,
) -> Transaction {
    let mut metadata = extra_metadata.unwrap_or_default();
    metadata.insert(
        ORIGINAL_TX_ID_KEY.to_string(),
        Value::String(original.tx_id.to_string()),
    );
    metadata.insert(
        REVERSAL_REASON_KEY.to_string(),
        Value::String(reason.to_string()),
    );

    Transaction {
        id,
        tx_id,
        kind: TransactionKind::Reversal,
        initiated_by,
        entries: reversing_entries(&original.entries),
        amount: original.amount,
        currency: original.currency,
        from_account: original.to_account.clone(),
        to_account: original.from_account.clone(),
        status: TransactionStatus::Processing,
        description: format!("Reversal of {}: {reason}", original.tx_id),
        reference: Some(original.tx_id.to_string()),
        metadata,
        failure_reason: None,
        processed_at: None,
        created_at: now,
        updated_at: now,
    }
}

/// The original transaction id a reversal references, if the row carries one.
#[must_use]
pub fn referenced_original(tx: &Transaction) -> Option<&str> {
    tx.metadata.get(ORIGINAL_TX_ID_KEY).and_then(Value::as_str)
}
