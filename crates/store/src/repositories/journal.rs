//! Journal repository: the append-only transaction log.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use argent_core::ledger::state::can_transition;
use argent_core::ledger::types::{Transaction, TransactionKind, TransactionStatus};
use argent_core::ledger::validation::validate_entry_set;
use argent_core::stats::TimeWindow;
use argent_shared::types::{
    AccountNumber, JournalId, PageRequest, PageResponse, SortBy, SortDir, TxId, UserId,
};

use crate::error::StoreError;
use crate::tx::{CommitCtx, Store};

/// Filter grammar for transaction list queries.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    /// Restrict to one kind.
    pub kind: Option<TransactionKind>,
    /// Restrict to one status.
    pub status: Option<TransactionStatus>,
    /// Inclusive creation-time lower bound.
    pub from_time: Option<DateTime<Utc>>,
    /// Exclusive creation-time upper bound.
    pub to_time: Option<DateTime<Utc>>,
    /// Restrict to rows touching this account (as source or destination).
    pub account_number: Option<AccountNumber>,
    /// Inclusive amount lower bound.
    pub min_amount: Option<Decimal>,
    /// Inclusive amount upper bound.
    pub max_amount: Option<Decimal>,
}

impl TransactionFilter {
    fn matches(&self, tx: &Transaction) -> bool {
        if self.kind.is_some_and(|kind| tx.kind != kind) {
            return false;
        }
        if self.status.is_some_and(|status| tx.status != status) {
            return false;
        }
        if self.from_time.is_some_and(|from| tx.created_at < from) {
            return false;
        }
        if self.to_time.is_some_and(|to| tx.created_at >= to) {
            return false;
        }
        if let Some(number) = &self.account_number {
            let touches = tx.from_account.as_ref() == Some(number)
                || tx.to_account.as_ref() == Some(number);
            if !touches {
                return false;
            }
        }
        if self.min_amount.is_some_and(|min| tx.amount < min) {
            return false;
        }
        if self.max_amount.is_some_and(|max| tx.amount > max) {
            return false;
        }
        true
    }
}

/// The append-only journal of transactions with balanced entries.
#[derive(Debug, Clone)]
pub struct JournalRepository {
    store: Store,
}

impl JournalRepository {
    /// Creates a new journal repository over the store.
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    /// Stages insertion of a journal row.
    ///
    /// Last-line defense: the row must enter as Processing (direct path) or
    /// Pending (deferred path), carry at least two positive entries, and
    /// balance debits against credits and the declared amount. Duplicate
    /// transaction ids are rejected.
    pub async fn append(&self, ctx: &mut CommitCtx, tx: Transaction) -> Result<(), StoreError> {
        if !matches!(
            tx.status,
            TransactionStatus::Processing | TransactionStatus::Pending
        ) {
            return Err(StoreError::Invalid(format!(
                "journal rows are appended as processing or pending, not {}",
                tx.status
            )));
        }
        validate_entry_set(&tx.entries, tx.amount)
            .map_err(|err| StoreError::Invalid(err.to_string()))?;

        ctx.stage_transaction_insert(tx).await
    }

    /// Transitions a row's status inside the context.
    ///
    /// Legal transitions only: Pending->Processing, Processing->Completed,
    /// Processing->Failed, Pending->Cancelled. Terminal states reject every
    /// change with `IllegalStateTransition`.
    pub async fn mark_status(
        &self,
        ctx: &mut CommitCtx,
        tx_id: &TxId,
        to: TransactionStatus,
        processed_at: Option<DateTime<Utc>>,
        failure_reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Transaction, StoreError> {
        let mut tx = ctx.transaction_by_tx_id(tx_id).await?;
        if !can_transition(tx.status, to) {
            return Err(StoreError::IllegalStateTransition {
                from: tx.status,
                to,
            });
        }

        tx.status = to;
        tx.updated_at = now;
        if let Some(processed_at) = processed_at {
            tx.processed_at = Some(processed_at);
        }
        if let Some(reason) = failure_reason {
            tx.failure_reason = Some(reason);
        }

        ctx.stage_transaction_update(tx.clone());
        Ok(tx)
    }

    /// Loads a row by transaction id inside the context.
    pub async fn load_by_tx_id(
        &self,
        ctx: &mut CommitCtx,
        tx_id: &TxId,
    ) -> Result<Transaction, StoreError> {
        ctx.transaction_by_tx_id(tx_id).await
    }

    /// Looks up the completed reversal of `original` inside the context,
    /// recording the index so concurrent reversals conflict.
    pub async fn reversal_of(
        &self,
        ctx: &mut CommitCtx,
        original: &TxId,
    ) -> Result<Option<Transaction>, StoreError> {
        ctx.reversal_of(original).await
    }

    /// Read-only lookup by transaction id.
    pub async fn find_by_tx_id(&self, tx_id: &TxId) -> Option<Transaction> {
        let state = self.store.state.read().await;
        let id = state.tx_ids.get(tx_id)?;
        state.journal.get(id).map(|row| row.value.clone())
    }

    /// Read-only lookup by row id.
    pub async fn find_by_id(&self, id: JournalId) -> Option<Transaction> {
        let state = self.store.state.read().await;
        state.journal.get(&id).map(|row| row.value.clone())
    }

    /// Pages through the transactions a user initiated.
    pub async fn list_by_user(
        &self,
        user: UserId,
        filter: &TransactionFilter,
        page: &PageRequest,
    ) -> PageResponse<Transaction> {
        self.list_where(|tx| tx.initiated_by == user, filter, page)
            .await
    }

    /// Pages through the transactions touching an account.
    pub async fn list_by_account(
        &self,
        number: &AccountNumber,
        filter: &TransactionFilter,
        page: &PageRequest,
    ) -> PageResponse<Transaction> {
        self.list_where(
            |tx| {
                tx.from_account.as_ref() == Some(number) || tx.to_account.as_ref() == Some(number)
            },
            filter,
            page,
        )
        .await
    }

    /// Completed transactions a user initiated inside the window, in
    /// creation order. Input for the user statistics fold.
    pub async fn completed_by_user(&self, user: UserId, window: TimeWindow) -> Vec<Transaction> {
        self.scan(|tx| {
            tx.initiated_by == user
                && tx.status == TransactionStatus::Completed
                && window.contains(tx.created_at)
        })
        .await
    }

    /// Completed transactions touching an account inside the window, in
    /// creation order. Input for the account statistics fold.
    pub async fn completed_touching_account(
        &self,
        number: &AccountNumber,
        window: TimeWindow,
    ) -> Vec<Transaction> {
        self.scan(|tx| {
            tx.status == TransactionStatus::Completed
                && window.contains(tx.created_at)
                && (tx.from_account.as_ref() == Some(number)
                    || tx.to_account.as_ref() == Some(number))
        })
        .await
    }

    /// Pending rows created before `cutoff`, oldest first. Input for the
    /// sweeper.
    pub async fn pending_older_than(&self, cutoff: DateTime<Utc>) -> Vec<Transaction> {
        self.scan(|tx| tx.status == TransactionStatus::Pending && tx.created_at < cutoff)
            .await
    }

    async fn scan(&self, predicate: impl Fn(&Transaction) -> bool) -> Vec<Transaction> {
        let state = self.store.state.read().await;
        let mut rows: Vec<Transaction> = state
            .journal
            .values()
            .map(|row| &row.value)
            .filter(|tx| predicate(tx))
            .cloned()
            .collect();
        drop(state);
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        rows
    }

    async fn list_where(
        &self,
        scope: impl Fn(&Transaction) -> bool,
        filter: &TransactionFilter,
        page: &PageRequest,
    ) -> PageResponse<Transaction> {
        let mut rows = self.scan(|tx| scope(tx) && filter.matches(tx)).await;

        match page.sort_by {
            SortBy::CreatedAt => {} // scan order is already (created_at, id)
            SortBy::Amount => {
                rows.sort_by(|a, b| a.amount.cmp(&b.amount).then(a.id.cmp(&b.id)));
            }
            SortBy::ProcessedAt => {
                rows.sort_by(|a, b| a.processed_at.cmp(&b.processed_at).then(a.id.cmp(&b.id)));
            }
        }
        if page.sort_dir == SortDir::Desc {
            rows.reverse();
        }

        let total = rows.len() as u64;
        let data: Vec<Transaction> = rows
            .into_iter()
            .skip(page.offset())
            .take(page.limit() as usize)
            .collect();

        PageResponse::new(data, page.page(), page.limit(), total)
    }
}
