//! Read path: balances, transaction lookups, and statistics.

use argent_core::ledger::types::{Account, Transaction};
use argent_core::stats::{AccountStats, StatsService, TimeWindow, UserStats};
use argent_shared::error::{LedgerError, LedgerResult};
use argent_shared::types::{AccountNumber, PageRequest, PageResponse, TxId, UserId};
use argent_store::TransactionFilter;

use crate::engine::LedgerEngine;
use crate::types::BalanceView;

impl LedgerEngine {
    /// Reads an account.
    pub async fn account(&self, number: &AccountNumber) -> LedgerResult<Account> {
        self.accounts
            .find_by_number(number)
            .await
            .ok_or_else(|| LedgerError::NotFound(format!("account {number}")))
    }

    /// Lists a user's accounts.
    pub async fn accounts_of(&self, owner: UserId) -> Vec<Account> {
        self.accounts.list_by_owner(owner).await
    }

    /// Reads the current balance of an account.
    pub async fn balance_of(&self, number: &AccountNumber) -> LedgerResult<BalanceView> {
        let account = self.account(number).await?;
        let balance = self
            .balances
            .find(account.id)
            .await
            .ok_or_else(|| LedgerError::NotFound(format!("balance for {number}")))?;

        Ok(BalanceView {
            account_number: number.clone(),
            currency: balance.currency,
            amount: balance.amount,
            available: balance.amount,
            last_updated: balance.last_updated,
        })
    }

    /// Reads a transaction by its prefix-tagged id.
    pub async fn transaction_by_tx_id(&self, tx_id: &TxId) -> LedgerResult<Transaction> {
        self.journal
            .find_by_tx_id(tx_id)
            .await
            .ok_or_else(|| LedgerError::NotFound(format!("transaction {tx_id}")))
    }

    /// Pages through the transactions a user initiated.
    pub async fn list_user_transactions(
        &self,
        user: UserId,
        filter: &TransactionFilter,
        page: &PageRequest,
    ) -> PageResponse<Transaction> {
        self.journal.list_by_user(user, filter, page).await
    }

    /// Pages through the transactions touching an account.
    pub async fn list_account_transactions(
        &self,
        number: &AccountNumber,
        filter: &TransactionFilter,
        page: &PageRequest,
    ) -> PageResponse<Transaction> {
        self.journal.list_by_account(number, filter, page).await
    }

    /// Aggregates a user's completed transactions over the window.
    pub async fn user_stats(&self, user: UserId, window: TimeWindow) -> UserStats {
        let transactions = self.journal.completed_by_user(user, window).await;
        StatsService::user_stats(&transactions)
    }

    /// Aggregates the completed transactions touching an account over the
    /// window.
    pub async fn account_stats(
        &self,
        number: &AccountNumber,
        window: TimeWindow,
    ) -> LedgerResult<AccountStats> {
        // Surface NotFound for unknown accounts rather than empty stats.
        self.account(number).await?;
        let transactions = self
            .journal
            .completed_touching_account(number, window)
            .await;
        Ok(StatsService::account_stats(number, &transactions))
    }
}
