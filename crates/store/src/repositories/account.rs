//! Account repository.

use argent_core::ledger::types::{Account, SystemPurpose};
use argent_shared::types::{AccountId, AccountNumber, Currency, UserId};

use crate::error::StoreError;
use crate::router::SYSTEM_PURPOSE_KEY;
use crate::tx::{CommitCtx, Store};

/// Account rows: creation, transactional loads, and read-only lookups.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    store: Store,
}

impl AccountRepository {
    /// Creates a new account repository over the store.
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    /// Stages a new account inside the context. The number must be unclaimed.
    pub async fn create(&self, ctx: &mut CommitCtx, account: Account) -> Result<(), StoreError> {
        ctx.stage_account_insert(account).await
    }

    /// Loads an account by number inside the context.
    pub async fn load_by_number(
        &self,
        ctx: &mut CommitCtx,
        number: &AccountNumber,
    ) -> Result<Account, StoreError> {
        ctx.account_by_number(number).await
    }

    /// Loads an account by id inside the context.
    pub async fn load(&self, ctx: &mut CommitCtx, id: AccountId) -> Result<Account, StoreError> {
        ctx.account(id).await
    }

    /// Stages an update to an account previously loaded in this context.
    pub fn update(&self, ctx: &mut CommitCtx, account: Account) {
        ctx.stage_account_update(account);
    }

    /// Read-only lookup by number.
    pub async fn find_by_number(&self, number: &AccountNumber) -> Option<Account> {
        let state = self.store.state.read().await;
        let id = state.numbers.get(number)?;
        state.accounts.get(id).map(|row| row.value.clone())
    }

    /// Read-only lookup by id.
    pub async fn find_by_id(&self, id: AccountId) -> Option<Account> {
        let state = self.store.state.read().await;
        state.accounts.get(&id).map(|row| row.value.clone())
    }

    /// Read-only list of a user's accounts.
    pub async fn list_by_owner(&self, owner: UserId) -> Vec<Account> {
        let state = self.store.state.read().await;
        let mut accounts: Vec<Account> = state
            .accounts
            .values()
            .filter(|row| row.value.owner_id == owner)
            .map(|row| row.value.clone())
            .collect();
        accounts.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        accounts
    }

    /// Finds the system account for a (purpose, currency), if one has been
    /// materialized.
    pub async fn find_system(
        &self,
        purpose: SystemPurpose,
        currency: Currency,
    ) -> Option<Account> {
        let state = self.store.state.read().await;
        state
            .accounts
            .values()
            .map(|row| &row.value)
            .find(|account| {
                account.kind.is_system()
                    && account.currency == currency
                    && account
                        .metadata
                        .get(SYSTEM_PURPOSE_KEY)
                        .and_then(serde_json::Value::as_str)
                        == Some(purpose.as_str())
            })
            .cloned()
    }
}
