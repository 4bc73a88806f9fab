//! Balance repository.
//!
//! Non-negativity is a policy decision and lives in the engine; this layer
//! only guarantees atomicity and rowwise conflict detection.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use argent_core::ledger::types::Balance;
use argent_shared::types::{AccountId, Currency};

use crate::error::StoreError;
use crate::tx::{CommitCtx, Store};

/// Balance rows: one per account, keyed by account id.
#[derive(Debug, Clone)]
pub struct BalanceRepository {
    store: Store,
}

impl BalanceRepository {
    /// Creates a new balance repository over the store.
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    /// Reads the balance row inside the context, recording its version so a
    /// concurrent writer conflicts at commit.
    pub async fn read(
        &self,
        ctx: &mut CommitCtx,
        account_id: AccountId,
    ) -> Result<Balance, StoreError> {
        ctx.balance(account_id).await
    }

    /// Stages a new amount for a balance previously read in this context.
    pub async fn write(
        &self,
        ctx: &mut CommitCtx,
        account_id: AccountId,
        new_amount: Decimal,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut balance = ctx.balance(account_id).await?;
        balance.amount = new_amount;
        balance.last_updated = now;
        ctx.stage_balance_update(balance);
        Ok(())
    }

    /// Stages the initial balance row for a freshly created account.
    pub async fn init(
        &self,
        ctx: &mut CommitCtx,
        account_id: AccountId,
        currency: Currency,
        initial: Decimal,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        ctx.stage_balance_insert(Balance {
            account_id,
            currency,
            amount: initial,
            last_updated: now,
        })
        .await
    }

    /// Read-only lookup outside any context.
    pub async fn find(&self, account_id: AccountId) -> Option<Balance> {
        let state = self.store.state.read().await;
        state.balances.get(&account_id).map(|row| row.value.clone())
    }
}
