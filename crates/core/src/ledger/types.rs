//! Ledger domain types.
//!
//! Defines the account, balance, and transaction entities plus the operation
//! inputs consumed by the engine. Transactions reference accounts by id only;
//! nothing references a transaction back from an account or balance.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use argent_shared::types::{AccountId, AccountNumber, Currency, JournalId, TxId, TxPrefix, UserId};

/// Free-form metadata attached to accounts and transactions.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Account classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    /// Customer savings account.
    Savings,
    /// Customer investment account.
    Investment,
    /// Customer credit account; may carry a negative balance.
    Credit,
    /// Engine-owned counter-party account; exempt from non-negativity.
    System,
}

impl AccountKind {
    /// Lower-case name, used for policy lookups and serialization.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Savings => "savings",
            Self::Investment => "investment",
            Self::Credit => "credit",
            Self::System => "system",
        }
    }

    /// Whether this is the engine-owned SYSTEM kind.
    #[must_use]
    pub const fn is_system(self) -> bool {
        matches!(self, Self::System)
    }
}

impl std::fmt::Display for AccountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An account row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Opaque unique identifier.
    pub id: AccountId,
    /// Human-facing account number.
    pub account_number: AccountNumber,
    /// Owning user.
    pub owner_id: UserId,
    /// Account classification.
    pub kind: AccountKind,
    /// Account currency; balances never change currency.
    pub currency: Currency,
    /// False once the account is closed.
    pub active: bool,
    /// Free-form metadata.
    pub metadata: Metadata,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
    /// Monotonic counter advanced on every mutation.
    pub version: i64,
}

/// A balance row, stored separately from the account so hot balance updates
/// do not contend with account-metadata reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Balance {
    /// The account this balance belongs to.
    pub account_id: AccountId,
    /// Mirror of the account currency.
    pub currency: Currency,
    /// Current amount. Signed position for SYSTEM accounts.
    pub amount: Decimal,
    /// Time of the last balance write.
    pub last_updated: DateTime<Utc>,
}

/// Which side of the double entry an entry posts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntrySide {
    /// Debit: decreases the holding account's ledger balance.
    Debit,
    /// Credit: increases the holding account's ledger balance.
    Credit,
}

impl EntrySide {
    /// The opposite side.
    #[must_use]
    pub const fn flipped(self) -> Self {
        match self {
            Self::Debit => Self::Credit,
            Self::Credit => Self::Debit,
        }
    }
}

/// One leg of a balanced posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// The account posted to.
    pub account_id: AccountId,
    /// Debit or credit.
    pub side: EntrySide,
    /// Posted amount; always positive.
    pub amount: Decimal,
}

impl Entry {
    /// A debit entry.
    #[must_use]
    pub const fn debit(account_id: AccountId, amount: Decimal) -> Self {
        Self {
            account_id,
            side: EntrySide::Debit,
            amount,
        }
    }

    /// A credit entry.
    #[must_use]
    pub const fn credit(account_id: AccountId, amount: Decimal) -> Self {
        Self {
            account_id,
            side: EntrySide::Credit,
            amount,
        }
    }

    /// Signed balance delta this entry applies to its account:
    /// credits add, debits subtract.
    #[must_use]
    pub fn signed_delta(&self) -> Decimal {
        match self.side {
            EntrySide::Credit => self.amount,
            EntrySide::Debit => -self.amount,
        }
    }
}

/// Transaction classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Cash in from outside the ledger.
    Deposit,
    /// Cash out to outside the ledger.
    Withdrawal,
    /// Movement between two customer accounts.
    Transfer,
    /// Payment to a third party.
    Payment,
    /// Fee charged to a customer account.
    Fee,
    /// Interest credited to a customer account.
    Interest,
    /// Manual adjustment.
    Adjustment,
    /// Side-flipped copy of a completed transaction.
    Reversal,
    /// Refund of a previous charge.
    Refund,
}

impl TransactionKind {
    /// The id prefix minted for this kind.
    #[must_use]
    pub const fn prefix(self) -> TxPrefix {
        match self {
            Self::Deposit => TxPrefix::Dep,
            Self::Withdrawal => TxPrefix::Wdr,
            Self::Transfer => TxPrefix::Trf,
            Self::Fee => TxPrefix::Fee,
            Self::Reversal => TxPrefix::Rev,
            Self::Payment | Self::Interest | Self::Adjustment | Self::Refund => TxPrefix::Txn,
        }
    }

    /// Lower-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Withdrawal => "withdrawal",
            Self::Transfer => "transfer",
            Self::Payment => "payment",
            Self::Fee => "fee",
            Self::Interest => "interest",
            Self::Adjustment => "adjustment",
            Self::Reversal => "reversal",
            Self::Refund => "refund",
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transaction lifecycle status. Legal transitions are defined in
/// [`super::state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Deliberately deferred; awaits the sweep.
    Pending,
    /// Mid-commit.
    Processing,
    /// Terminal: committed and visible.
    Completed,
    /// Terminal: rejected, with a failure reason.
    Failed,
    /// Terminal: withdrawn before processing.
    Cancelled,
}

impl TransactionStatus {
    /// Lower-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Terminal states are immutable.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A journal row: one transaction with its balanced entries.
///
/// Immutable once it reaches a terminal status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Row id.
    pub id: JournalId,
    /// Globally unique, prefix-tagged id.
    pub tx_id: TxId,
    /// Classification.
    pub kind: TransactionKind,
    /// User who initiated the operation.
    pub initiated_by: UserId,
    /// Balanced entries; at least two.
    pub entries: Vec<Entry>,
    /// Declared amount; equals the debit sum and the credit sum.
    pub amount: Decimal,
    /// Transaction currency; every referenced account holds this currency.
    pub currency: Currency,
    /// Source account, where the operation has one.
    pub from_account: Option<AccountNumber>,
    /// Destination account, where the operation has one.
    pub to_account: Option<AccountNumber>,
    /// Lifecycle status.
    pub status: TransactionStatus,
    /// Human description.
    pub description: String,
    /// External reference; for reversals, the original transaction id.
    pub reference: Option<String>,
    /// Free-form metadata.
    pub metadata: Metadata,
    /// Populated when status is Failed.
    pub failure_reason: Option<String>,
    /// Set when the transaction completes.
    pub processed_at: Option<DateTime<Utc>>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last status change.
    pub updated_at: DateTime<Utc>,
}

/// Purpose of an engine-owned system account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemPurpose {
    /// Counter-party for customer deposits.
    Deposits,
    /// Counter-party for customer withdrawals.
    Withdrawals,
    /// Counter-party for fees.
    Fees,
}

impl SystemPurpose {
    /// Lower-case name, used in system-account metadata.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Deposits => "deposits",
            Self::Withdrawals => "withdrawals",
            Self::Fees => "fees",
        }
    }
}

impl std::fmt::Display for SystemPurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input for a deposit.
#[derive(Debug, Clone)]
pub struct DepositInput {
    /// Customer account to credit.
    pub account_number: AccountNumber,
    /// Amount; positive, within configured scale and cap.
    pub amount: Decimal,
    /// Declared currency; must match the account.
    pub currency: Currency,
    /// Optional description.
    pub description: Option<String>,
    /// Optional external reference.
    pub reference: Option<String>,
    /// Optional metadata.
    pub metadata: Option<Metadata>,
}

/// Input for a withdrawal. Same shape as a deposit.
#[derive(Debug, Clone)]
pub struct WithdrawalInput {
    /// Customer account to debit.
    pub account_number: AccountNumber,
    /// Amount; positive, within configured scale and cap.
    pub amount: Decimal,
    /// Declared currency; must match the account.
    pub currency: Currency,
    /// Optional description.
    pub description: Option<String>,
    /// Optional external reference.
    pub reference: Option<String>,
    /// Optional metadata.
    pub metadata: Option<Metadata>,
}

/// Input for a transfer between two customer accounts.
#[derive(Debug, Clone)]
pub struct TransferInput {
    /// Source account; must belong to the caller.
    pub from_account: AccountNumber,
    /// Destination account.
    pub to_account: AccountNumber,
    /// Amount; positive, within configured scale and cap.
    pub amount: Decimal,
    /// Declared currency; must match both accounts.
    pub currency: Currency,
    /// Optional description.
    pub description: Option<String>,
    /// Optional external reference.
    pub reference: Option<String>,
    /// Optional metadata.
    pub metadata: Option<Metadata>,
}

/// Input for a fee charge.
#[derive(Debug, Clone)]
pub struct FeeInput {
    /// Customer account to debit.
    pub account_number: AccountNumber,
    /// Amount; positive, within configured scale and cap.
    pub amount: Decimal,
    /// Declared currency; must match the account.
    pub currency: Currency,
    /// Why the fee was charged; required.
    pub description: String,
    /// Optional external reference.
    pub reference: Option<String>,
    /// Optional metadata.
    pub metadata: Option<Metadata>,
}

/// Input for a reversal of a completed transaction.
#[derive(Debug, Clone)]
pub struct ReversalInput {
    /// Id of the transaction to reverse.
    pub original_tx_id: TxId,
    /// Why the reversal is happening; required.
    pub reason: String,
    /// Optional metadata.
    pub metadata: Option<Metadata>,
}

/// The four direct primitives as one variant set.
///
/// Differences between the primitives reduce to which counter-party the
/// router returns, which side the customer account takes, and whether a
/// sufficiency check runs — so the invariants live in one dispatcher rather
/// than four copies.
#[derive(Debug, Clone)]
pub enum Operation {
    /// Credit a customer account from the deposits system account.
    Deposit(DepositInput),
    /// Debit a customer account into the withdrawals system account.
    Withdrawal(WithdrawalInput),
    /// Move funds between two customer accounts.
    Transfer(TransferInput),
    /// Debit a customer account into the fees system account.
    Fee(FeeInput),
}

impl Operation {
    /// The journal kind this operation records as.
    #[must_use]
    pub const fn kind(&self) -> TransactionKind {
        match self {
            Self::Deposit(_) => TransactionKind::Deposit,
            Self::Withdrawal(_) => TransactionKind::Withdrawal,
            Self::Transfer(_) => TransactionKind::Transfer,
            Self::Fee(_) => TransactionKind::Fee,
        }
    }

    /// The declared amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        match self {
            Self::Deposit(input) => input.amount,
            Self::Withdrawal(input) => input.amount,
            Self::Transfer(input) => input.amount,
            Self::Fee(input) => input.amount,
        }
    }

    /// The declared currency.
    #[must_use]
    pub const fn currency(&self) -> Currency {
        match self {
            Self::Deposit(input) => input.currency,
            Self::Withdrawal(input) => input.currency,
            Self::Transfer(input) => input.currency,
            Self::Fee(input) => input.currency,
        }
    }

    /// The customer account the operation is anchored on (the source side
    /// for transfers).
    #[must_use]
    pub const fn customer_account(&self) -> &AccountNumber {
        match self {
            Self::Deposit(input) => &input.account_number,
            Self::Withdrawal(input) => &input.account_number,
            Self::Transfer(input) => &input.from_account,
            Self::Fee(input) => &input.account_number,
        }
    }

    /// The side the customer account takes in the posting.
    #[must_use]
    pub const fn customer_side(&self) -> EntrySide {
        match self {
            Self::Deposit(_) => EntrySide::Credit,
            Self::Withdrawal(_) | Self::Transfer(_) | Self::Fee(_) => EntrySide::Debit,
        }
    }

    /// Whether a sufficiency check runs on the customer account.
    #[must_use]
    pub const fn requires_sufficiency(&self) -> bool {
        !matches!(self, Self::Deposit(_))
    }

    /// The system purpose acting as counter-party, if any (transfers have a
    /// peer account instead).
    #[must_use]
    pub const fn system_purpose(&self) -> Option<SystemPurpose> {
        match self {
            Self::Deposit(_) => Some(SystemPurpose::Deposits),
            Self::Withdrawal(_) => Some(SystemPurpose::Withdrawals),
            Self::Fee(_) => Some(SystemPurpose::Fees),
            Self::Transfer(_) => None,
        }
    }

    /// The from/to account numbers recorded on the journal row.
    #[must_use]
    pub fn from_to(&self) -> (Option<AccountNumber>, Option<AccountNumber>) {
        match self {
            Self::Deposit(input) => (None, Some(input.account_number.clone())),
            Self::Withdrawal(input) => (Some(input.account_number.clone()), None),
            Self::Fee(input) => (Some(input.account_number.clone()), None),
            Self::Transfer(input) => (
                Some(input.from_account.clone()),
                Some(input.to_account.clone()),
            ),
        }
    }

    /// The description recorded on the journal row.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::Deposit(input) => input
                .description
                .clone()
                .unwrap_or_else(|| "Deposit".to_string()),
            Self::Withdrawal(input) => input
                .description
                .clone()
                .unwrap_or_else(|| "Withdrawal".to_string()),
            Self::Transfer(input) => input
                .description
                .clone()
                .unwrap_or_else(|| "Transfer".to_string()),
            Self::Fee(input) => input.description.clone(),
        }
    }

    /// The external reference recorded on the journal row.
    #[must_use]
    pub fn reference(&self) -> Option<String> {
        match self {
            Self::Deposit(input) => input.reference.clone(),
            Self::Withdrawal(input) => input.reference.clone(),
            Self::Transfer(input) => input.reference.clone(),
            Self::Fee(input) => input.reference.clone(),
        }
    }

    /// The metadata recorded on the journal row.
    #[must_use]
    pub fn metadata(&self) -> Metadata {
        let meta = match self {
            Self::Deposit(input) => &input.metadata,
            Self::Withdrawal(input) => &input.metadata,
            Self::Transfer(input) => &input.metadata,
            Self::Fee(input) => &input.metadata,
        };
        meta.clone().unwrap_or_default()
    }
}
