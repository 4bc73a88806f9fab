//! Shared fixtures for engine integration tests.

// Each test binary uses a different subset of these helpers.
#![allow(dead_code)]

use rust_decimal::Decimal;

use argent_core::ledger::types::{
    Account, AccountKind, DepositInput, FeeInput, TransferInput, WithdrawalInput,
};
use argent_engine::{LedgerEngine, OpenAccountInput};
use argent_shared::auth::Caller;
use argent_shared::config::LedgerConfig;
use argent_shared::types::{AccountNumber, Currency, UserId};
use argent_store::Store;

/// An engine over a fresh store with default configuration.
pub fn engine() -> LedgerEngine {
    LedgerEngine::new(Store::new(), LedgerConfig::default())
}

/// Opens a savings account in the given currency for the caller.
pub async fn open_account(engine: &LedgerEngine, caller: &Caller, currency: Currency) -> Account {
    engine
        .open_account(
            caller,
            OpenAccountInput {
                owner_id: caller.user_id,
                kind: AccountKind::Savings,
                currency,
                metadata: None,
            },
        )
        .await
        .expect("account should open")
}

/// Opens a USD savings account and deposits `amount` into it.
pub async fn funded_account(engine: &LedgerEngine, caller: &Caller, amount: Decimal) -> Account {
    let account = open_account(engine, caller, Currency::Usd).await;
    if amount > Decimal::ZERO {
        engine
            .deposit(caller, deposit(&account.account_number, amount))
            .await
            .expect("seed deposit should commit");
    }
    account
}

pub fn customer() -> Caller {
    Caller::customer(UserId::new())
}

pub fn deposit(number: &AccountNumber, amount: Decimal) -> DepositInput {
    DepositInput {
        account_number: number.clone(),
        amount,
        currency: Currency::Usd,
        description: None,
        reference: None,
        metadata: None,
    }
}

pub fn withdrawal(number: &AccountNumber, amount: Decimal) -> WithdrawalInput {
    WithdrawalInput {
        account_number: number.clone(),
        amount,
        currency: Currency::Usd,
        description: None,
        reference: None,
        metadata: None,
    }
}

pub fn transfer(from: &AccountNumber, to: &AccountNumber, amount: Decimal) -> TransferInput {
    TransferInput {
        from_account: from.clone(),
        to_account: to.clone(),
        amount,
        currency: Currency::Usd,
        description: None,
        reference: None,
        metadata: None,
    }
}

pub fn fee(number: &AccountNumber, amount: Decimal, description: &str) -> FeeInput {
    FeeInput {
        account_number: number.clone(),
        amount,
        currency: Currency::Usd,
        description: description.to_string(),
        reference: None,
        metadata: None,
    }
}

/// Current balance amount of an account.
pub async fn balance(engine: &LedgerEngine, number: &AccountNumber) -> Decimal {
    engine
        .balance_of(number)
        .await
        .expect("balance should exist")
        .amount
}
