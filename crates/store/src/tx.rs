//! The versioned store and its serializable commit contexts.
//!
//! Every row carries a version. A commit context records the version of each
//! row it reads (0 when it observed absence), buffers all writes, and at
//! commit takes the state write lock, revalidates every recorded version, and
//! applies the buffer in one step. Any mismatch aborts the context with a
//! serialization conflict: the first committer wins, and the loser retries
//! against fresh state. Operations on disjoint rows never conflict.
//!
//! Dropping a context without committing leaves no trace; there is no
//! partial state to clean up.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::RwLock;

use argent_core::ledger::reversal::referenced_original;
use argent_core::ledger::types::{
    Account, Balance, Transaction, TransactionKind, TransactionStatus,
};
use argent_shared::types::{AccountId, AccountNumber, JournalId, TxId};

use crate::error::StoreError;

/// A versioned row.
#[derive(Debug, Clone)]
pub(crate) struct Row<T> {
    pub(crate) version: u64,
    pub(crate) value: T,
}

/// The committed state. Guarded by the store's `RwLock`.
#[derive(Debug, Default)]
pub(crate) struct State {
    pub(crate) accounts: HashMap<AccountId, Row<Account>>,
    pub(crate) numbers: HashMap<AccountNumber, AccountId>,
    pub(crate) balances: HashMap<AccountId, Row<Balance>>,
    pub(crate) journal: HashMap<JournalId, Row<Transaction>>,
    pub(crate) tx_ids: HashMap<TxId, JournalId>,
    /// Unique index: original transaction id -> completed reversal row.
    pub(crate) reversals: HashMap<TxId, JournalId>,
}

/// A row identity as seen by the read-set validator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ReadKey {
    Account(AccountId),
    Number(AccountNumber),
    Balance(AccountId),
    Journal(JournalId),
    TxIndex(TxId),
    ReversalIndex(TxId),
}

impl ReadKey {
    fn describe(&self) -> String {
        match self {
            Self::Account(id) => format!("account {id}"),
            Self::Number(number) => format!("account number {number}"),
            Self::Balance(id) => format!("balance {id}"),
            Self::Journal(id) => format!("journal row {id}"),
            Self::TxIndex(tx_id) => format!("transaction id {tx_id}"),
            Self::ReversalIndex(tx_id) => format!("reversal of {tx_id}"),
        }
    }
}

impl State {
    /// Current version of a row; 0 when absent. Index keys use 1/0 as a
    /// presence marker.
    fn version_of(&self, key: &ReadKey) -> u64 {
        match key {
            ReadKey::Account(id) => self.accounts.get(id).map_or(0, |row| row.version),
            ReadKey::Number(number) => u64::from(self.numbers.contains_key(number)),
            ReadKey::Balance(id) => self.balances.get(id).map_or(0, |row| row.version),
            ReadKey::Journal(id) => self.journal.get(id).map_or(0, |row| row.version),
            ReadKey::TxIndex(tx_id) => u64::from(self.tx_ids.contains_key(tx_id)),
            ReadKey::ReversalIndex(tx_id) => u64::from(self.reversals.contains_key(tx_id)),
        }
    }
}

/// Handle to the shared ledger state. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct Store {
    pub(crate) state: Arc<RwLock<State>>,
}

impl Store {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a commit context with no deadline.
    #[must_use]
    pub fn begin(&self) -> CommitCtx {
        self.begin_with_deadline(None)
    }

    /// Opens a commit context that aborts once `deadline` passes.
    #[must_use]
    pub fn begin_with_deadline(&self, deadline: Option<Instant>) -> CommitCtx {
        CommitCtx {
            store: self.clone(),
            deadline,
            reads: HashMap::new(),
            staged_accounts: HashMap::new(),
            staged_balances: HashMap::new(),
            staged_journal: HashMap::new(),
            staged_tx_ids: HashMap::new(),
        }
    }
}

/// A serializable unit of work over the store.
///
/// Reads see committed state (plus this context's own staged writes) and
/// record the versions they observed; writes are buffered until [`commit`]
/// validates the read set and applies everything atomically.
///
/// [`commit`]: CommitCtx::commit
pub struct CommitCtx {
    store: Store,
    deadline: Option<Instant>,
    reads: HashMap<ReadKey, u64>,
    staged_accounts: HashMap<AccountId, Account>,
    staged_balances: HashMap<AccountId, Balance>,
    staged_journal: HashMap<JournalId, Transaction>,
    staged_tx_ids: HashMap<TxId, JournalId>,
}

impl CommitCtx {
    fn check_deadline(&self) -> Result<(), StoreError> {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(StoreError::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    fn record(&mut self, key: ReadKey, version: u64) {
        // First observation wins; a later divergence fails commit validation.
        self.reads.entry(key).or_insert(version);
    }

    /// Reads an account by id.
    pub async fn account(&mut self, id: AccountId) -> Result<Account, StoreError> {
        self.check_deadline()?;
        if let Some(account) = self.staged_accounts.get(&id) {
            return Ok(account.clone());
        }

        let state = Arc::clone(&self.store.state);
        let guard = state.read().await;
        match guard.accounts.get(&id) {
            Some(row) => {
                let (version, account) = (row.version, row.value.clone());
                drop(guard);
                self.record(ReadKey::Account(id), version);
                Ok(account)
            }
            None => {
                drop(guard);
                self.record(ReadKey::Account(id), 0);
                Err(StoreError::NotFound(format!("account {id}")))
            }
        }
    }

    /// Reads an account by its human-facing number.
    pub async fn account_by_number(
        &mut self,
        number: &AccountNumber,
    ) -> Result<Account, StoreError> {
        self.check_deadline()?;
        if let Some(account) = self
            .staged_accounts
            .values()
            .find(|a| &a.account_number == number)
        {
            return Ok(account.clone());
        }

        let state = Arc::clone(&self.store.state);
        let guard = state.read().await;
        let Some(&id) = guard.numbers.get(number) else {
            drop(guard);
            self.record(ReadKey::Number(number.clone()), 0);
            return Err(StoreError::NotFound(format!("account {number}")));
        };
        let row = guard
            .accounts
            .get(&id)
            .ok_or_else(|| StoreError::Unavailable(format!("dangling account index {number}")))?;
        let (version, account) = (row.version, row.value.clone());
        drop(guard);

        self.record(ReadKey::Number(number.clone()), 1);
        self.record(ReadKey::Account(id), version);
        Ok(account)
    }

    /// Reads a balance row.
    pub async fn balance(&mut self, account_id: AccountId) -> Result<Balance, StoreError> {
        self.check_deadline()?;
        if let Some(balance) = self.staged_balances.get(&account_id) {
            return Ok(balance.clone());
        }

        let state = Arc::clone(&self.store.state);
        let guard = state.read().await;
        match guard.balances.get(&account_id) {
            Some(row) => {
                let (version, balance) = (row.version, row.value.clone());
                drop(guard);
                self.record(ReadKey::Balance(account_id), version);
                Ok(balance)
            }
            None => {
                drop(guard);
                self.record(ReadKey::Balance(account_id), 0);
                Err(StoreError::NotFound(format!("balance {account_id}")))
            }
        }
    }

    /// Reads a journal row by transaction id.
    pub async fn transaction_by_tx_id(
        &mut self,
        tx_id: &TxId,
    ) -> Result<Transaction, StoreError> {
        self.check_deadline()?;
        if let Some(journal_id) = self.staged_tx_ids.get(tx_id) {
            if let Some(tx) = self.staged_journal.get(journal_id) {
                return Ok(tx.clone());
            }
        }

        let state = Arc::clone(&self.store.state);
        let guard = state.read().await;
        let Some(&journal_id) = guard.tx_ids.get(tx_id) else {
            drop(guard);
            return Err(StoreError::NotFound(format!("transaction {tx_id}")));
        };
        let row = guard
            .journal
            .get(&journal_id)
            .ok_or_else(|| StoreError::Unavailable(format!("dangling journal index {tx_id}")))?;
        let (version, tx) = (row.version, row.value.clone());
        drop(guard);

        self.record(ReadKey::TxIndex(tx_id.clone()), 1);
        self.record(ReadKey::Journal(journal_id), version);
        Ok(tx)
    }

    /// Looks up the completed reversal referencing `original`, recording the
    /// index state so a concurrent reversal of the same original conflicts at
    /// commit.
    pub async fn reversal_of(
        &mut self,
        original: &TxId,
    ) -> Result<Option<Transaction>, StoreError> {
        self.check_deadline()?;

        let state = Arc::clone(&self.store.state);
        let guard = state.read().await;
        let found = guard.reversals.get(original).copied();
        let tx = found.and_then(|id| guard.journal.get(&id).map(|row| row.value.clone()));
        drop(guard);

        self.record(
            ReadKey::ReversalIndex(original.clone()),
            u64::from(found.is_some()),
        );
        Ok(tx)
    }

    /// Stages a brand-new account. The account number and id must be
    /// unclaimed at commit time.
    pub async fn stage_account_insert(&mut self, account: Account) -> Result<(), StoreError> {
        self.check_deadline()?;
        let number = account.account_number.clone();

        let state = Arc::clone(&self.store.state);
        let guard = state.read().await;
        let taken = guard.numbers.contains_key(&number);
        drop(guard);
        if taken {
            self.record(ReadKey::Number(number.clone()), 1);
            return Err(StoreError::DuplicateAccountNumber(number));
        }

        self.record(ReadKey::Number(number), 0);
        self.record(ReadKey::Account(account.id), 0);
        self.staged_accounts.insert(account.id, account);
        Ok(())
    }

    /// Stages an update to an already-read account row.
    pub fn stage_account_update(&mut self, account: Account) {
        self.staged_accounts.insert(account.id, account);
    }

    /// Stages a brand-new balance row; fails if one exists.
    pub async fn stage_balance_insert(&mut self, balance: Balance) -> Result<(), StoreError> {
        self.check_deadline()?;
        let account_id = balance.account_id;
        if self.staged_balances.contains_key(&account_id) {
            return Err(StoreError::DuplicateBalance(account_id));
        }

        let state = Arc::clone(&self.store.state);
        let guard = state.read().await;
        let exists = guard.balances.contains_key(&account_id);
        drop(guard);
        if exists {
            self.record(ReadKey::Balance(account_id), 1);
            return Err(StoreError::DuplicateBalance(account_id));
        }

        self.record(ReadKey::Balance(account_id), 0);
        self.staged_balances.insert(account_id, balance);
        Ok(())
    }

    /// Stages an update to an already-read balance row.
    pub fn stage_balance_update(&mut self, balance: Balance) {
        self.staged_balances.insert(balance.account_id, balance);
    }

    /// Stages insertion of a journal row; the transaction id must be unique.
    pub async fn stage_transaction_insert(&mut self, tx: Transaction) -> Result<(), StoreError> {
        self.check_deadline()?;
        if self.staged_tx_ids.contains_key(&tx.tx_id) {
            return Err(StoreError::DuplicateTransaction(tx.tx_id));
        }

        let state = Arc::clone(&self.store.state);
        let guard = state.read().await;
        let taken = guard.tx_ids.contains_key(&tx.tx_id);
        drop(guard);
        if taken {
            self.record(ReadKey::TxIndex(tx.tx_id.clone()), 1);
            return Err(StoreError::DuplicateTransaction(tx.tx_id));
        }

        self.record(ReadKey::TxIndex(tx.tx_id.clone()), 0);
        self.record(ReadKey::Journal(tx.id), 0);
        self.staged_tx_ids.insert(tx.tx_id.clone(), tx.id);
        self.staged_journal.insert(tx.id, tx);
        Ok(())
    }

    /// Stages an update to an already-read journal row.
    pub fn stage_transaction_update(&mut self, tx: Transaction) {
        self.staged_tx_ids.insert(tx.tx_id.clone(), tx.id);
        self.staged_journal.insert(tx.id, tx);
    }

    /// Abandons the context. Buffered writes are discarded; committed state
    /// is untouched.
    pub fn cancel(self) {
        drop(self);
    }

    /// Validates the read set and applies the buffered writes atomically.
    ///
    /// # Errors
    ///
    /// - `Serialization` when any row read by this context changed (or
    ///   appeared, or vanished) since it was read
    /// - `DuplicateTransaction` / `DuplicateReversal` when a unique index
    ///   would be violated
    /// - `DeadlineExceeded` when the context's deadline has passed
    pub async fn commit(mut self) -> Result<(), StoreError> {
        self.check_deadline()?;

        let state = Arc::clone(&self.store.state);
        let mut guard = state.write().await;

        // First committer wins: every observed version must still hold.
        for (key, observed) in &self.reads {
            let current = guard.version_of(key);
            if current != *observed {
                return Err(StoreError::Serialization(key.describe()));
            }
        }

        // Unique-index last-line defense for contexts that staged an insert
        // without observing the index themselves.
        for (tx_id, journal_id) in &self.staged_tx_ids {
            if let Some(existing) = guard.tx_ids.get(tx_id) {
                if existing != journal_id {
                    return Err(StoreError::DuplicateTransaction(tx_id.clone()));
                }
            }
        }

        // A journal row becoming a completed reversal claims the one slot for
        // its original transaction.
        let mut new_reversals: Vec<(TxId, JournalId)> = Vec::new();
        for (journal_id, tx) in &self.staged_journal {
            if tx.kind != TransactionKind::Reversal || tx.status != TransactionStatus::Completed {
                continue;
            }
            let Some(original) = referenced_original(tx) else {
                continue;
            };
            let original = TxId::parse(original)
                .map_err(|e| StoreError::Invalid(format!("reversal metadata: {e}")))?;
            match guard.reversals.get(&original) {
                Some(existing) if existing != journal_id => {
                    return Err(StoreError::DuplicateReversal(original));
                }
                _ => new_reversals.push((original, *journal_id)),
            }
        }

        // Validation passed; apply everything. Nothing below can fail.
        for (id, mut account) in std::mem::take(&mut self.staged_accounts) {
            let version = guard.accounts.get(&id).map_or(1, |row| row.version + 1);
            account.version = i64::try_from(version).unwrap_or(i64::MAX);
            guard.numbers.insert(account.account_number.clone(), id);
            guard.accounts.insert(id, Row { version, value: account });
        }

        for (id, balance) in std::mem::take(&mut self.staged_balances) {
            let version = guard.balances.get(&id).map_or(1, |row| row.version + 1);
            guard.balances.insert(id, Row { version, value: balance });
        }

        for (id, tx) in std::mem::take(&mut self.staged_journal) {
            let version = guard.journal.get(&id).map_or(1, |row| row.version + 1);
            guard.tx_ids.insert(tx.tx_id.clone(), id);
            guard.journal.insert(id, Row { version, value: tx });
        }

        for (original, journal_id) in new_reversals {
            guard.reversals.insert(original, journal_id);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use argent_core::ledger::types::{AccountKind, Metadata};
    use argent_shared::types::{Currency, TxPrefix, UserId};

    fn account(currency: Currency) -> Account {
        let now = Utc::now();
        Account {
            id: AccountId::new(),
            account_number: AccountNumber::mint(),
            owner_id: UserId::new(),
            kind: AccountKind::Savings,
            currency,
            active: true,
            metadata: Metadata::new(),
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    fn balance(account_id: AccountId, amount: Decimal) -> Balance {
        Balance {
            account_id,
            currency: Currency::Usd,
            amount,
            last_updated: Utc::now(),
        }
    }

    async fn seed_account(store: &Store, amount: Decimal) -> Account {
        let account = account(Currency::Usd);
        let mut ctx = store.begin();
        ctx.stage_account_insert(account.clone()).await.unwrap();
        ctx.stage_balance_insert(balance(account.id, amount))
            .await
            .unwrap();
        ctx.commit().await.unwrap();
        account
    }

    #[tokio::test]
    async fn test_commit_makes_writes_visible() {
        let store = Store::new();
        let account = seed_account(&store, dec!(100)).await;

        let mut ctx = store.begin();
        let loaded = ctx.account(account.id).await.unwrap();
        assert_eq!(loaded.account_number, account.account_number);
        assert_eq!(loaded.version, 1);

        let loaded = ctx.balance(account.id).await.unwrap();
        assert_eq!(loaded.amount, dec!(100));
    }

    #[tokio::test]
    async fn test_dropped_context_leaves_no_trace() {
        let store = Store::new();
        let account = seed_account(&store, dec!(100)).await;

        let mut ctx = store.begin();
        let mut updated = ctx.balance(account.id).await.unwrap();
        updated.amount = dec!(999);
        ctx.stage_balance_update(updated);
        ctx.cancel();

        let mut ctx = store.begin();
        assert_eq!(ctx.balance(account.id).await.unwrap().amount, dec!(100));
    }

    #[tokio::test]
    async fn test_first_committer_wins() {
        let store = Store::new();
        let account = seed_account(&store, dec!(100)).await;

        let mut first = store.begin();
        let mut second = store.begin();

        let mut from_first = first.balance(account.id).await.unwrap();
        let mut from_second = second.balance(account.id).await.unwrap();

        from_first.amount = dec!(30);
        first.stage_balance_update(from_first);
        first.commit().await.unwrap();

        from_second.amount = dec!(170);
        second.stage_balance_update(from_second);
        let err = second.commit().await.unwrap_err();
        assert!(err.is_serialization_conflict(), "got {err:?}");

        let mut ctx = store.begin();
        assert_eq!(ctx.balance(account.id).await.unwrap().amount, dec!(30));
    }

    #[tokio::test]
    async fn test_disjoint_rows_commute() {
        let store = Store::new();
        let account_a = seed_account(&store, dec!(10)).await;
        let account_b = seed_account(&store, dec!(20)).await;

        let mut first = store.begin();
        let mut second = store.begin();

        let mut balance_a = first.balance(account_a.id).await.unwrap();
        let mut balance_b = second.balance(account_b.id).await.unwrap();

        balance_a.amount = dec!(11);
        balance_b.amount = dec!(21);
        first.stage_balance_update(balance_a);
        second.stage_balance_update(balance_b);

        first.commit().await.unwrap();
        second.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_tx_id_rejected() {
        let store = Store::new();
        let account = seed_account(&store, dec!(100)).await;
        let peer = seed_account(&store, dec!(0)).await;
        let tx_id = TxId::mint(TxPrefix::Dep);

        let make_tx = |id: JournalId| {
            let now = Utc::now();
            Transaction {
                id,
                tx_id: tx_id.clone(),
                kind: TransactionKind::Deposit,
                initiated_by: UserId::new(),
                entries: vec![
                    argent_core::ledger::types::Entry::credit(account.id, dec!(5)),
                    argent_core::ledger::types::Entry::debit(peer.id, dec!(5)),
                ],
                amount: dec!(5),
                currency: Currency::Usd,
                from_account: None,
                to_account: Some(account.account_number.clone()),
                status: TransactionStatus::Processing,
                description: String::new(),
                reference: None,
                metadata: Metadata::new(),
                failure_reason: None,
                processed_at: None,
                created_at: now,
                updated_at: now,
            }
        };

        let mut ctx = store.begin();
        ctx.stage_transaction_insert(make_tx(JournalId::new()))
            .await
            .unwrap();
        ctx.commit().await.unwrap();

        let mut ctx = store.begin();
        let err = ctx
            .stage_transaction_insert(make_tx(JournalId::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateTransaction(_)));
    }

    #[tokio::test]
    async fn test_duplicate_balance_rejected() {
        let store = Store::new();
        let account = seed_account(&store, dec!(1)).await;

        let mut ctx = store.begin();
        let err = ctx
            .stage_balance_insert(balance(account.id, dec!(0)))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateBalance(_)));
    }

    #[tokio::test]
    async fn test_deadline_aborts_commit() {
        let store = Store::new();
        let account = seed_account(&store, dec!(100)).await;

        let deadline = Instant::now() - std::time::Duration::from_millis(1);
        let mut ctx = store.begin_with_deadline(Some(deadline));
        let err = ctx.balance(account.id).await.unwrap_err();
        assert!(matches!(err, StoreError::DeadlineExceeded));
    }
}
