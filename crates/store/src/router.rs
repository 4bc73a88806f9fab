//! System-account router.
//!
//! The counter-party for deposits, withdrawals, and fees is an engine-owned
//! SYSTEM account, one per (purpose, currency), lazily materialized on first
//! use and cached for the life of the process. The cache mutex doubles as the
//! exclusion guard so the create step runs at most once per key per process;
//! rediscovery on a cache miss is idempotent because lookup precedes create.
//!
//! System accounts store their signed position directly: the deposits account
//! runs negative as customers are credited, withdrawals and fees run
//! positive. They are exempt from the non-negativity policy.

use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use argent_core::ledger::types::{Account, AccountKind, Metadata, SystemPurpose};
use argent_shared::types::{AccountId, AccountNumber, Currency, UserId};
use rust_decimal::Decimal;

use crate::error::StoreError;
use crate::repositories::{AccountRepository, BalanceRepository};
use crate::tx::Store;

/// Account metadata key tagging a system account with its purpose.
pub const SYSTEM_PURPOSE_KEY: &str = "system_purpose";

/// Lazily materializes and caches system accounts.
pub struct SystemAccountRouter {
    store: Store,
    accounts: AccountRepository,
    balances: BalanceRepository,
    cache: Mutex<HashMap<(SystemPurpose, Currency), AccountId>>,
}

impl SystemAccountRouter {
    /// Creates a router over the store with an empty cache.
    #[must_use]
    pub fn new(store: Store) -> Self {
        Self {
            accounts: AccountRepository::new(store.clone()),
            balances: BalanceRepository::new(store.clone()),
            store,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// The reserved user owning every system account.
    #[must_use]
    pub const fn system_user() -> UserId {
        UserId::from_uuid(Uuid::nil())
    }

    /// Resolves the system account for a (purpose, currency), creating it on
    /// first use.
    pub async fn system_account(
        &self,
        purpose: SystemPurpose,
        currency: Currency,
    ) -> Result<AccountId, StoreError> {
        let mut cache = self.cache.lock().await;
        if let Some(&id) = cache.get(&(purpose, currency)) {
            return Ok(id);
        }

        // Cache miss: rediscover before creating, so a restart never mints a
        // second account for the same key.
        if let Some(existing) = self.accounts.find_system(purpose, currency).await {
            cache.insert((purpose, currency), existing.id);
            return Ok(existing.id);
        }

        let account = Self::system_account_record(purpose, currency);
        let id = account.id;

        let mut ctx = self.store.begin();
        self.accounts.create(&mut ctx, account).await?;
        self.balances
            .init(&mut ctx, id, currency, Decimal::ZERO, Utc::now())
            .await?;
        ctx.commit().await?;

        info!(
            purpose = %purpose,
            currency = %currency,
            account_id = %id,
            "materialized system account"
        );

        cache.insert((purpose, currency), id);
        Ok(id)
    }

    fn system_account_record(purpose: SystemPurpose, currency: Currency) -> Account {
        let now = Utc::now();
        let mut metadata = Metadata::new();
        metadata.insert(
            SYSTEM_PURPOSE_KEY.to_string(),
            serde_json::Value::String(purpose.as_str().to_string()),
        );

        Account {
            id: AccountId::new(),
            account_number: AccountNumber::mint(),
            owner_id: Self::system_user(),
            kind: AccountKind::System,
            currency,
            active: true,
            metadata,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_creates_once_per_purpose_currency() {
        let store = Store::new();
        let router = SystemAccountRouter::new(store);

        let first = router
            .system_account(SystemPurpose::Deposits, Currency::Usd)
            .await
            .unwrap();
        let second = router
            .system_account(SystemPurpose::Deposits, Currency::Usd)
            .await
            .unwrap();
        assert_eq!(first, second);

        let other_purpose = router
            .system_account(SystemPurpose::Withdrawals, Currency::Usd)
            .await
            .unwrap();
        assert_ne!(first, other_purpose);

        let other_currency = router
            .system_account(SystemPurpose::Deposits, Currency::Eur)
            .await
            .unwrap();
        assert_ne!(first, other_currency);
    }

    #[tokio::test]
    async fn test_rediscovery_survives_cache_loss() {
        let store = Store::new();

        let first = {
            let router = SystemAccountRouter::new(store.clone());
            router
                .system_account(SystemPurpose::Fees, Currency::Gbp)
                .await
                .unwrap()
        };

        // A fresh router simulates a process restart with a cold cache.
        let router = SystemAccountRouter::new(store);
        let second = router
            .system_account(SystemPurpose::Fees, Currency::Gbp)
            .await
            .unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_system_account_starts_at_zero() {
        let store = Store::new();
        let router = SystemAccountRouter::new(store.clone());

        let id = router
            .system_account(SystemPurpose::Deposits, Currency::Usd)
            .await
            .unwrap();

        let balances = BalanceRepository::new(store.clone());
        let balance = balances.find(id).await.unwrap();
        assert_eq!(balance.amount, Decimal::ZERO);

        let accounts = AccountRepository::new(store);
        let account = accounts.find_by_id(id).await.unwrap();
        assert!(account.kind.is_system());
        assert_eq!(account.owner_id, SystemAccountRouter::system_user());
    }

    #[tokio::test]
    async fn test_concurrent_resolution_yields_one_account() {
        let store = Store::new();
        let router = std::sync::Arc::new(SystemAccountRouter::new(store));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let router = std::sync::Arc::clone(&router);
            handles.push(tokio::spawn(async move {
                router
                    .system_account(SystemPurpose::Deposits, Currency::Jpy)
                    .await
                    .unwrap()
            }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap());
        }
        ids.dedup();
        assert_eq!(ids.len(), 1);
    }
}
