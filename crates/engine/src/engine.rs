//! The ledger engine: the five primitives and account provisioning.

use std::collections::HashMap;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, info, instrument};

use argent_core::ledger::posting::{
    check_sufficiency, customer_and_counterparty_entries, stays_non_negative,
};
use argent_core::ledger::reversal::build_reversal;
use argent_core::ledger::types::{
    Account, AccountKind, DepositInput, Entry, FeeInput, Operation, ReversalInput, Transaction,
    TransactionStatus, TransferInput, WithdrawalInput,
};
use argent_core::ledger::validation::{validate_operation, validate_reversal_input};
use argent_shared::auth::{Caller, Role};
use argent_shared::config::LedgerConfig;
use argent_shared::error::{LedgerError, LedgerResult};
use argent_shared::types::{
    AccountId, AccountNumber, Currency, JournalId, TxId, TxPrefix,
};
use argent_store::{
    AccountRepository, BalanceRepository, CommitCtx, JournalRepository, Store,
    SystemAccountRouter,
};

use crate::retry::{backoff_delay, TryError};
use crate::types::OpenAccountInput;

/// Orchestrates the ledger primitives over the transactional store.
///
/// The engine is the only writer of balances and the journal. It is cheap to
/// share behind an `Arc`; all methods take `&self`.
pub struct LedgerEngine {
    pub(crate) store: Store,
    pub(crate) accounts: AccountRepository,
    pub(crate) balances: BalanceRepository,
    pub(crate) journal: JournalRepository,
    pub(crate) router: SystemAccountRouter,
    pub(crate) config: LedgerConfig,
}

impl LedgerEngine {
    /// Creates an engine over the store with the given configuration.
    #[must_use]
    pub fn new(store: Store, config: LedgerConfig) -> Self {
        Self {
            accounts: AccountRepository::new(store.clone()),
            balances: BalanceRepository::new(store.clone()),
            journal: JournalRepository::new(store.clone()),
            router: SystemAccountRouter::new(store.clone()),
            store,
            config,
        }
    }

    // ------------------------------------------------------------------
    // The five primitives
    // ------------------------------------------------------------------

    /// Credits a customer account from the deposits system account.
    #[instrument(skip(self, caller, input), fields(account = %input.account_number, amount = %input.amount))]
    pub async fn deposit(
        &self,
        caller: &Caller,
        input: DepositInput,
    ) -> LedgerResult<Transaction> {
        self.execute(caller, Operation::Deposit(input)).await
    }

    /// Debits a customer account into the withdrawals system account.
    /// Fails with `InsufficientFunds` when the balance cannot cover it.
    #[instrument(skip(self, caller, input), fields(account = %input.account_number, amount = %input.amount))]
    pub async fn withdraw(
        &self,
        caller: &Caller,
        input: WithdrawalInput,
    ) -> LedgerResult<Transaction> {
        self.execute(caller, Operation::Withdrawal(input)).await
    }

    /// Moves funds between two customer accounts. The source must belong to
    /// the caller (admins may act on any source).
    #[instrument(skip(self, caller, input), fields(from = %input.from_account, to = %input.to_account, amount = %input.amount))]
    pub async fn transfer(
        &self,
        caller: &Caller,
        input: TransferInput,
    ) -> LedgerResult<Transaction> {
        self.execute(caller, Operation::Transfer(input)).await
    }

    /// Debits a fee from a customer account into the fees system account.
    #[instrument(skip(self, caller, input), fields(account = %input.account_number, amount = %input.amount))]
    pub async fn charge_fee(&self, caller: &Caller, input: FeeInput) -> LedgerResult<Transaction> {
        self.execute(caller, Operation::Fee(input)).await
    }

    /// Reverses a completed transaction: admin-only, at most once per
    /// original, and rejected if it would overdraw any strict account.
    #[instrument(skip(self, caller, input), fields(original = %input.original_tx_id))]
    pub async fn reverse(
        &self,
        caller: &Caller,
        input: ReversalInput,
    ) -> LedgerResult<Transaction> {
        if !caller.is_admin() {
            return Err(LedgerError::Forbidden(
                "reversal requires the admin role".to_string(),
            ));
        }
        validate_reversal_input(&input)?;

        let tx_id = TxId::mint(TxPrefix::Rev);
        let mut attempt = 0_u32;
        loop {
            match self.try_reverse(caller, &input, &tx_id).await {
                Ok(tx) => {
                    info!(tx_id = %tx.tx_id, "reversal committed");
                    return Ok(tx);
                }
                Err(TryError::Ledger(err)) => return Err(err),
                Err(TryError::Conflict(row)) => {
                    attempt = self.pause_before_retry(attempt, &row).await?;
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Deferred submission
    // ------------------------------------------------------------------

    /// Journals an operation as Pending with no balance effect. The pending
    /// sweep applies it later; sufficiency is checked then, not now.
    #[instrument(skip(self, caller, op), fields(kind = %op.kind(), amount = %op.amount()))]
    pub async fn enqueue(&self, caller: &Caller, op: Operation) -> LedgerResult<Transaction> {
        validate_operation(&op, &self.config.amount)?;

        let tx_id = TxId::mint(op.kind().prefix());
        let mut attempt = 0_u32;
        loop {
            match self.try_submit(caller, &op, &tx_id, true).await {
                Ok(tx) => {
                    info!(tx_id = %tx.tx_id, "operation enqueued");
                    return Ok(tx);
                }
                Err(TryError::Ledger(err)) => return Err(err),
                Err(TryError::Conflict(row)) => {
                    attempt = self.pause_before_retry(attempt, &row).await?;
                }
            }
        }
    }

    /// Cancels a Pending transaction before the sweep applies it. Only the
    /// submitter (or an admin) may cancel; terminal rows reject the change.
    #[instrument(skip(self, caller), fields(tx_id = %tx_id))]
    pub async fn cancel_pending(
        &self,
        caller: &Caller,
        tx_id: &TxId,
    ) -> LedgerResult<Transaction> {
        let mut attempt = 0_u32;
        loop {
            match self.try_cancel_pending(caller, tx_id).await {
                Ok(tx) => {
                    info!(tx_id = %tx.tx_id, "pending transaction cancelled");
                    return Ok(tx);
                }
                Err(TryError::Ledger(err)) => return Err(err),
                Err(TryError::Conflict(row)) => {
                    attempt = self.pause_before_retry(attempt, &row).await?;
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Account provisioning
    // ------------------------------------------------------------------

    /// Provisions a customer account with a zero balance.
    #[instrument(skip(self, caller, input), fields(owner = %input.owner_id, kind = %input.kind))]
    pub async fn open_account(
        &self,
        caller: &Caller,
        input: OpenAccountInput,
    ) -> LedgerResult<Account> {
        if input.kind.is_system() {
            return Err(LedgerError::BadRequest(
                "system accounts are engine-owned".to_string(),
            ));
        }
        if input.owner_id != caller.user_id && caller.role == Role::Customer {
            return Err(LedgerError::Forbidden(
                "customers may only open their own accounts".to_string(),
            ));
        }

        // A minted number colliding is astronomically unlikely; remint and
        // retry a few times rather than surfacing the conflict.
        let mut attempt = 0_u32;
        loop {
            match self.try_open_account(caller, &input).await {
                Ok(account) => {
                    info!(account = %account.account_number, "account opened");
                    return Ok(account);
                }
                Err(TryError::Ledger(LedgerError::Conflict(_))) if attempt < 3 => attempt += 1,
                Err(TryError::Ledger(err)) => return Err(err),
                Err(TryError::Conflict(row)) => {
                    attempt = self.pause_before_retry(attempt, &row).await?;
                }
            }
        }
    }

    /// Closes or reopens an account. Closed accounts reject every primitive
    /// with `InactiveAccount`.
    #[instrument(skip(self, caller), fields(account = %number, active))]
    pub async fn set_account_active(
        &self,
        caller: &Caller,
        number: &AccountNumber,
        active: bool,
    ) -> LedgerResult<Account> {
        let mut attempt = 0_u32;
        loop {
            match self.try_set_active(caller, number, active).await {
                Ok(account) => return Ok(account),
                Err(TryError::Ledger(err)) => return Err(err),
                Err(TryError::Conflict(row)) => {
                    attempt = self.pause_before_retry(attempt, &row).await?;
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Commit frames
    // ------------------------------------------------------------------

    /// Runs a direct operation through the commit frame with retry.
    async fn execute(&self, caller: &Caller, op: Operation) -> LedgerResult<Transaction> {
        validate_operation(&op, &self.config.amount)?;

        // One id per logical operation: a serialization retry re-runs the
        // frame with the same id, since nothing was committed.
        let tx_id = TxId::mint(op.kind().prefix());
        let mut attempt = 0_u32;
        loop {
            match self.try_submit(caller, &op, &tx_id, false).await {
                Ok(tx) => {
                    info!(tx_id = %tx.tx_id, kind = %tx.kind, amount = %tx.amount, "transaction committed");
                    return Ok(tx);
                }
                Err(TryError::Ledger(err)) => return Err(err),
                Err(TryError::Conflict(row)) => {
                    attempt = self.pause_before_retry(attempt, &row).await?;
                }
            }
        }
    }

    /// One pass through the commit frame. `deferred` journals the row as
    /// Pending and skips sufficiency and balance writes.
    async fn try_submit(
        &self,
        caller: &Caller,
        op: &Operation,
        tx_id: &TxId,
        deferred: bool,
    ) -> Result<Transaction, TryError> {
        let now = Utc::now();
        let mut ctx = self.store.begin_with_deadline(caller.deadline);

        let customer = self
            .accounts
            .load_by_number(&mut ctx, op.customer_account())
            .await?;
        Self::check_operable(&customer, op.currency())?;

        if let Operation::Transfer(_) = op {
            if customer.owner_id != caller.user_id && !caller.is_admin() {
                return Err(LedgerError::Forbidden(
                    "transfer source is not owned by the caller".to_string(),
                )
                .into());
            }
        }

        let counterparty = match op.system_purpose() {
            Some(purpose) => {
                let id = self.router.system_account(purpose, op.currency()).await?;
                self.accounts.load(&mut ctx, id).await?
            }
            None => {
                let Operation::Transfer(input) = op else {
                    return Err(LedgerError::BadRequest(
                        "operation has no counter-party".to_string(),
                    )
                    .into());
                };
                let to = self
                    .accounts
                    .load_by_number(&mut ctx, &input.to_account)
                    .await?;
                Self::check_operable(&to, op.currency())?;
                to
            }
        };

        let amount = op.amount();
        if !deferred && op.requires_sufficiency() {
            let balance = self.balances.read(&mut ctx, customer.id).await?;
            check_sufficiency(customer.id, balance.amount, amount)?;
        }

        let entries = customer_and_counterparty_entries(
            customer.id,
            op.customer_side(),
            counterparty.id,
            amount,
        );
        let (from_account, to_account) = op.from_to();
        let tx = Transaction {
            id: JournalId::new(),
            tx_id: tx_id.clone(),
            kind: op.kind(),
            initiated_by: caller.user_id,
            entries: entries.clone(),
            amount,
            currency: op.currency(),
            from_account,
            to_account,
            status: if deferred {
                TransactionStatus::Pending
            } else {
                TransactionStatus::Processing
            },
            description: op.description(),
            reference: op.reference(),
            metadata: op.metadata(),
            failure_reason: None,
            processed_at: None,
            created_at: now,
            updated_at: now,
        };
        self.journal.append(&mut ctx, tx.clone()).await?;

        if deferred {
            ctx.commit().await?;
            return Ok(tx);
        }

        let kinds = HashMap::from([(customer.id, customer.kind), (counterparty.id, counterparty.kind)]);
        self.apply_entries(&mut ctx, &entries, &kinds).await?;

        let completed = self
            .journal
            .mark_status(
                &mut ctx,
                tx_id,
                TransactionStatus::Completed,
                Some(now),
                None,
                now,
            )
            .await?;
        ctx.commit().await?;
        Ok(completed)
    }

    /// One pass through the reversal frame.
    async fn try_reverse(
        &self,
        caller: &Caller,
        input: &ReversalInput,
        tx_id: &TxId,
    ) -> Result<Transaction, TryError> {
        let now = Utc::now();
        let mut ctx = self.store.begin_with_deadline(caller.deadline);

        let original = self
            .journal
            .load_by_tx_id(&mut ctx, &input.original_tx_id)
            .await?;
        if original.status != TransactionStatus::Completed {
            return Err(LedgerError::BadRequest(format!(
                "only completed transactions can be reversed; {} is {}",
                original.tx_id, original.status
            ))
            .into());
        }
        if self
            .journal
            .reversal_of(&mut ctx, &input.original_tx_id)
            .await?
            .is_some()
        {
            return Err(LedgerError::AlreadyReversed(original.tx_id.to_string()).into());
        }

        let reversal = build_reversal(
            &original,
            JournalId::new(),
            tx_id.clone(),
            caller.user_id,
            &input.reason,
            input.metadata.clone(),
            now,
        );
        let entries = reversal.entries.clone();
        self.journal.append(&mut ctx, reversal).await?;

        let kinds = self.load_entry_account_kinds(&mut ctx, &entries).await?;
        self.apply_entries(&mut ctx, &entries, &kinds).await?;

        let completed = self
            .journal
            .mark_status(
                &mut ctx,
                tx_id,
                TransactionStatus::Completed,
                Some(now),
                None,
                now,
            )
            .await?;
        ctx.commit().await?;
        Ok(completed)
    }

    async fn try_cancel_pending(
        &self,
        caller: &Caller,
        tx_id: &TxId,
    ) -> Result<Transaction, TryError> {
        let now = Utc::now();
        let mut ctx = self.store.begin_with_deadline(caller.deadline);

        let tx = self.journal.load_by_tx_id(&mut ctx, tx_id).await?;
        if tx.initiated_by != caller.user_id && !caller.is_admin() {
            return Err(LedgerError::Forbidden(
                "pending transaction belongs to another user".to_string(),
            )
            .into());
        }

        let cancelled = self
            .journal
            .mark_status(
                &mut ctx,
                tx_id,
                TransactionStatus::Cancelled,
                None,
                None,
                now,
            )
            .await?;
        ctx.commit().await?;
        Ok(cancelled)
    }

    async fn try_open_account(
        &self,
        caller: &Caller,
        input: &OpenAccountInput,
    ) -> Result<Account, TryError> {
        let now = Utc::now();
        let account = Account {
            id: AccountId::new(),
            account_number: AccountNumber::mint(),
            owner_id: input.owner_id,
            kind: input.kind,
            currency: input.currency,
            active: true,
            metadata: input.metadata.clone().unwrap_or_default(),
            created_at: now,
            updated_at: now,
            version: 0,
        };

        let mut ctx = self.store.begin_with_deadline(caller.deadline);
        self.accounts.create(&mut ctx, account.clone()).await?;
        self.balances
            .init(&mut ctx, account.id, input.currency, Decimal::ZERO, now)
            .await?;
        ctx.commit().await?;

        Ok(Account {
            version: 1,
            ..account
        })
    }

    async fn try_set_active(
        &self,
        caller: &Caller,
        number: &AccountNumber,
        active: bool,
    ) -> Result<Account, TryError> {
        let now = Utc::now();
        let mut ctx = self.store.begin_with_deadline(caller.deadline);

        let mut account = self.accounts.load_by_number(&mut ctx, number).await?;
        if account.owner_id != caller.user_id && caller.role == Role::Customer {
            return Err(LedgerError::Forbidden(
                "account is not owned by the caller".to_string(),
            )
            .into());
        }

        account.active = active;
        account.updated_at = now;
        self.accounts.update(&mut ctx, account);
        ctx.commit().await?;

        self.accounts
            .find_by_number(number)
            .await
            .ok_or_else(|| TryError::Ledger(LedgerError::NotFound(format!("account {number}"))))
    }

    // ------------------------------------------------------------------
    // Shared pieces
    // ------------------------------------------------------------------

    /// Applies each entry's signed delta to its balance, enforcing the
    /// non-negativity policy for strict accounts. System accounts and kinds
    /// on the allow list may run negative.
    pub(crate) async fn apply_entries(
        &self,
        ctx: &mut CommitCtx,
        entries: &[Entry],
        kinds: &HashMap<AccountId, AccountKind>,
    ) -> Result<(), TryError> {
        let now = Utc::now();
        for entry in entries {
            let balance = self.balances.read(ctx, entry.account_id).await?;
            let new_amount = balance.amount + entry.signed_delta();

            let kind = kinds
                .get(&entry.account_id)
                .copied()
                .unwrap_or(AccountKind::Savings);
            let exempt = kind.is_system() || self.config.balance.allows_negative(kind.as_str());
            if !exempt && !stays_non_negative(balance.amount, entry.signed_delta()) {
                return Err(LedgerError::InsufficientFunds {
                    account_id: Some(entry.account_id),
                    available: balance.amount,
                    requested: entry.amount,
                }
                .into());
            }

            self.balances
                .write(ctx, entry.account_id, new_amount, now)
                .await?;
        }
        Ok(())
    }

    /// Loads the accounts behind a set of entries and returns their kinds
    /// for the non-negativity policy.
    pub(crate) async fn load_entry_account_kinds(
        &self,
        ctx: &mut CommitCtx,
        entries: &[Entry],
    ) -> Result<HashMap<AccountId, AccountKind>, TryError> {
        let mut kinds = HashMap::with_capacity(entries.len());
        for entry in entries {
            if kinds.contains_key(&entry.account_id) {
                continue;
            }
            let account = self.accounts.load(ctx, entry.account_id).await?;
            kinds.insert(account.id, account.kind);
        }
        Ok(kinds)
    }

    /// Sleeps out the backoff for a serialization conflict, or gives up with
    /// `ConcurrencyExhausted` once the retry budget is spent.
    pub(crate) async fn pause_before_retry(
        &self,
        attempt: u32,
        row: &str,
    ) -> LedgerResult<u32> {
        if attempt >= self.config.concurrency.max_retries {
            return Err(LedgerError::ConcurrencyExhausted {
                attempts: attempt + 1,
            });
        }
        debug!(row, attempt, "serialization conflict; backing off");
        tokio::time::sleep(backoff_delay(
            self.config.concurrency.base_backoff_ms,
            attempt,
        ))
        .await;
        Ok(attempt + 1)
    }

    /// Rejects inactive accounts and declared-currency mismatches.
    fn check_operable(account: &Account, declared: Currency) -> LedgerResult<()> {
        if !account.active {
            return Err(LedgerError::InactiveAccount(
                account.account_number.to_string(),
            ));
        }
        if account.currency != declared {
            return Err(LedgerError::CurrencyMismatch {
                declared: declared.to_string(),
                held: account.currency.to_string(),
            });
        }
        Ok(())
    }
}
