//! Input and entry-set validation.
//!
//! Everything here runs before any I/O: a validation failure means no journal
//! row is written and no balance is touched.

use rust_decimal::Decimal;

use argent_shared::config::AmountConfig;
use argent_shared::error::{LedgerError, LedgerResult};

use super::types::{Entry, EntrySide, Operation, ReversalInput};

/// Validates a monetary amount against the configured policy:
/// strictly positive, at most `scale` fractional digits, at most `max_units`.
pub fn validate_amount(amount: Decimal, policy: &AmountConfig) -> LedgerResult<()> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::BadRequest(format!(
            "amount must be positive, got {amount}"
        )));
    }
    if amount.normalize().scale() > policy.scale {
        return Err(LedgerError::BadRequest(format!(
            "amount {amount} exceeds {} decimal places",
            policy.scale
        )));
    }
    if amount > policy.max_units {
        return Err(LedgerError::BadRequest(format!(
            "amount {amount} exceeds the maximum of {}",
            policy.max_units
        )));
    }
    Ok(())
}

/// Validates the shape of a direct operation before any I/O.
pub fn validate_operation(op: &Operation, policy: &AmountConfig) -> LedgerResult<()> {
    validate_amount(op.amount(), policy)?;

    match op {
        Operation::Transfer(input) => {
            if input.from_account == input.to_account {
                return Err(LedgerError::BadRequest(
                    "transfer source and destination must differ".to_string(),
                ));
            }
        }
        Operation::Fee(input) => {
            if input.description.trim().is_empty() {
                return Err(LedgerError::BadRequest(
                    "fee description must not be empty".to_string(),
                ));
            }
        }
        Operation::Deposit(_) | Operation::Withdrawal(_) => {}
    }

    Ok(())
}

/// Validates a reversal request shape.
pub fn validate_reversal_input(input: &ReversalInput) -> LedgerResult<()> {
    if input.reason.trim().is_empty() {
        return Err(LedgerError::BadRequest(
            "reversal reason must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates a balanced entry set against its declared amount:
/// at least two entries, every entry positive, debit sum equal to credit sum,
/// and both equal to the declared amount.
pub fn validate_entry_set(entries: &[Entry], declared_amount: Decimal) -> LedgerResult<()> {
    if entries.len() < 2 {
        return Err(LedgerError::BadRequest(format!(
            "a transaction needs at least 2 entries, got {}",
            entries.len()
        )));
    }

    let mut debits = Decimal::ZERO;
    let mut credits = Decimal::ZERO;

    for entry in entries {
        if entry.amount <= Decimal::ZERO {
            return Err(LedgerError::BadRequest(format!(
                "entry amounts must be positive, got {}",
                entry.amount
            )));
        }
        match entry.side {
            EntrySide::Debit => debits += entry.amount,
            EntrySide::Credit => credits += entry.amount,
        }
    }

    if debits != credits {
        return Err(LedgerError::BadRequest(format!(
            "unbalanced entries: debits {debits}, credits {credits}"
        )));
    }
    if debits != declared_amount {
        return Err(LedgerError::BadRequest(format!(
            "declared amount {declared_amount} does not match entry total {debits}"
        )));
    }

    Ok(())
}
