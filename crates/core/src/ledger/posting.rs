//! Balanced-entry construction and sufficiency.
//!
//! Every direct primitive posts exactly two legs: the customer account on the
//! side the operation dictates, and a counter-party (a system account, or the
//! peer account for transfers) on the opposite side for the same amount.

use rust_decimal::Decimal;

use argent_shared::error::{LedgerError, LedgerResult};
use argent_shared::types::AccountId;

use super::types::{Entry, EntrySide};

/// Builds the two balanced legs of a direct operation.
///
/// The customer posts `customer_side` for `amount`; the counter-party posts
/// the flipped side for the same amount. Debits always equal credits by
/// construction.
#[must_use]
pub fn customer_and_counterparty_entries(
    customer: AccountId,
    customer_side: EntrySide,
    counterparty: AccountId,
    amount: Decimal,
) -> Vec<Entry> {
    vec![
        Entry {
            account_id: customer,
            side: customer_side,
            amount,
        },
        Entry {
            account_id: counterparty,
            side: customer_side.flipped(),
            amount,
        },
    ]
}

/// Fails with `InsufficientFunds` when `available` cannot cover `requested`.
pub fn check_sufficiency(
    account_id: AccountId,
    available: Decimal,
    requested: Decimal,
) -> LedgerResult<()> {
    if available < requested {
        return Err(LedgerError::InsufficientFunds {
            account_id: Some(account_id),
            available,
            requested,
        });
    }
    Ok(())
}

/// Whether applying `delta` to `current` keeps the balance non-negative.
///
/// Used by the sweep and by reversals, where the balance effect is derived
/// from stored entries rather than a fresh sufficiency check.
#[must_use]
pub fn stays_non_negative(current: Decimal, delta: Decimal) -> bool {
    current + delta >= Decimal::ZERO
}
