//! Concurrency: linearizability on a shared account and conservation under
//! contention.

mod common;

use std::sync::Arc;

use futures::future::join_all;
use rand::Rng;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::Barrier;

use argent_core::ledger::types::TransactionStatus;
use argent_shared::error::LedgerError;
use argent_shared::types::PageRequest;
use argent_store::{SystemAccountRouter, TransactionFilter};

use common::{balance, customer, deposit, engine, funded_account, transfer, withdrawal};

// ============================================================================
// Two concurrent transfers on the same source: exactly one completes
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_transfers_on_same_source() {
    let engine = Arc::new(engine());
    let caller = customer();
    let source = funded_account(&engine, &caller, dec!(100.00)).await;
    let dest_b = funded_account(&engine, &caller, dec!(0)).await;
    let dest_c = funded_account(&engine, &caller, dec!(0)).await;

    let barrier = Arc::new(Barrier::new(2));
    let mut handles = Vec::new();
    for dest in [dest_b.account_number.clone(), dest_c.account_number.clone()] {
        let engine = Arc::clone(&engine);
        let caller = caller.clone();
        let barrier = Arc::clone(&barrier);
        let from = source.account_number.clone();
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            engine.transfer(&caller, transfer(&from, &dest, dec!(70.00))).await
        }));
    }

    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|r| r.expect("task should not panic"))
        .collect();

    let completed = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(completed, 1, "exactly one transfer should commit");

    let rejected = results.iter().find(|r| r.is_err()).unwrap();
    assert!(
        matches!(
            rejected.as_ref().unwrap_err(),
            LedgerError::InsufficientFunds { .. }
        ),
        "the loser should fail sufficiency, got {rejected:?}"
    );

    // Conservation: the three balances still sum to the initial 100.
    let total = balance(&engine, &source.account_number).await
        + balance(&engine, &dest_b.account_number).await
        + balance(&engine, &dest_c.account_number).await;
    assert_eq!(total, dec!(100.00));
}

// ============================================================================
// Concurrent deposits on one account: no drift, every success visible
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_deposits_no_drift() {
    const TASKS: usize = 40;
    let amount = dec!(10.00);

    let engine = Arc::new(engine());
    let caller = customer();
    let account = funded_account(&engine, &caller, dec!(0)).await;

    let barrier = Arc::new(Barrier::new(TASKS));
    let mut handles = Vec::with_capacity(TASKS);
    for _ in 0..TASKS {
        let engine = Arc::clone(&engine);
        let caller = caller.clone();
        let barrier = Arc::clone(&barrier);
        let number = account.account_number.clone();
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            engine.deposit(&caller, deposit(&number, dec!(10.00))).await
        }));
    }

    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|r| r.expect("task should not panic"))
        .collect();

    let mut successes = 0_i64;
    for result in &results {
        match result {
            Ok(_) => successes += 1,
            // Heavy contention may exhaust the retry budget; that is a clean
            // rejection, not drift.
            Err(LedgerError::ConcurrencyExhausted { .. }) => {}
            Err(other) => panic!("unexpected failure: {other:?}"),
        }
    }
    assert!(successes > 0, "at least one deposit should commit");

    let expected = amount * Decimal::from(successes);
    assert_eq!(
        balance(&engine, &account.account_number).await,
        expected,
        "final balance must equal the sum of committed deposits"
    );

    // The journal agrees with the balance.
    let completed = TransactionFilter {
        status: Some(TransactionStatus::Completed),
        ..TransactionFilter::default()
    };
    let page = engine
        .list_account_transactions(
            &account.account_number,
            &completed,
            &PageRequest { limit: 100, ..PageRequest::default() },
        )
        .await;
    assert_eq!(page.meta.total, successes as u64);
}

// ============================================================================
// Random mixed operations on a shared account stay linearizable
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_random_mixed_operations_linearize() {
    const TASKS: usize = 24;
    let initial = dec!(500.00);

    let engine = Arc::new(engine());
    let caller = customer();
    let account = funded_account(&engine, &caller, initial).await;

    let barrier = Arc::new(Barrier::new(TASKS));
    let mut handles = Vec::with_capacity(TASKS);
    for _ in 0..TASKS {
        let engine = Arc::clone(&engine);
        let caller = caller.clone();
        let barrier = Arc::clone(&barrier);
        let number = account.account_number.clone();
        handles.push(tokio::spawn(async move {
            let (is_deposit, cents) = {
                let mut rng = rand::thread_rng();
                (rng.gen_bool(0.5), rng.gen_range(1..=5_000_i64))
            };
            let amount = Decimal::new(cents, 2);
            barrier.wait().await;

            let result = if is_deposit {
                engine.deposit(&caller, deposit(&number, amount)).await
            } else {
                engine.withdraw(&caller, withdrawal(&number, amount)).await
            };
            result.map(|tx| {
                if is_deposit {
                    tx.amount
                } else {
                    -tx.amount
                }
            })
        }));
    }

    let mut expected = initial;
    for result in join_all(handles).await {
        match result.expect("task should not panic") {
            Ok(delta) => expected += delta,
            Err(
                LedgerError::InsufficientFunds { .. } | LedgerError::ConcurrencyExhausted { .. },
            ) => {}
            Err(other) => panic!("unexpected failure: {other:?}"),
        }
    }

    let actual = balance(&engine, &account.account_number).await;
    assert_eq!(
        actual, expected,
        "final balance must equal initial plus the signed deltas of completed operations"
    );
    assert!(actual >= Decimal::ZERO, "strict account went negative");

    // Money was moved, never created: customer plus system accounts cancel.
    let mut total = Decimal::ZERO;
    for account in engine.accounts_of(caller.user_id).await {
        total += balance(&engine, &account.account_number).await;
    }
    for account in engine
        .accounts_of(SystemAccountRouter::system_user())
        .await
    {
        total += balance(&engine, &account.account_number).await;
    }
    assert_eq!(total, Decimal::ZERO);
}

// ============================================================================
// Concurrent reversals of one original: only one wins
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reversals_single_winner() {
    use argent_core::ledger::types::ReversalInput;
    use argent_shared::auth::Caller;
    use argent_shared::types::UserId;

    let engine = Arc::new(engine());
    let caller = customer();
    let from = funded_account(&engine, &caller, dec!(100.00)).await;
    let to = funded_account(&engine, &caller, dec!(0)).await;

    let original = engine
        .transfer(
            &caller,
            transfer(&from.account_number, &to.account_number, dec!(40.00)),
        )
        .await
        .unwrap();

    let barrier = Arc::new(Barrier::new(4));
    let mut handles = Vec::new();
    for _ in 0..4 {
        let engine = Arc::clone(&engine);
        let barrier = Arc::clone(&barrier);
        let tx_id = original.tx_id.clone();
        handles.push(tokio::spawn(async move {
            let admin = Caller::admin(UserId::new());
            barrier.wait().await;
            engine
                .reverse(
                    &admin,
                    ReversalInput {
                        original_tx_id: tx_id,
                        reason: "race".to_string(),
                        metadata: None,
                    },
                )
                .await
        }));
    }

    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|r| r.expect("task should not panic"))
        .collect();

    let wins = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(wins, 1, "exactly one reversal may complete");
    for result in results.iter().filter(|r| r.is_err()) {
        assert!(
            matches!(
                result.as_ref().unwrap_err(),
                LedgerError::AlreadyReversed(_) | LedgerError::ConcurrencyExhausted { .. }
            ),
            "losers must see AlreadyReversed, got {result:?}"
        );
    }

    // Balances reflect exactly one reversal.
    assert_eq!(balance(&engine, &from.account_number).await, dec!(100.00));
    assert_eq!(balance(&engine, &to.account_number).await, dec!(0.00));
}
