//! Pending-transaction sweep.
//!
//! Batch recovery for deliberately deferred work: each stale Pending row is
//! its own commit unit. A row that cannot be applied is marked Failed with a
//! reason — its balance effects are rolled back with the aborted context —
//! and the rest of the batch continues untouched.
//!
//! The direct path never needs this: it marks Processing inside the same
//! commit as the balance writes, so a crash mid-operation leaves either a
//! completed transaction or nothing.

use chrono::Utc;
use tracing::{error, info, instrument, warn};

use argent_core::ledger::types::{Transaction, TransactionStatus};
use argent_shared::error::LedgerError;
use argent_shared::types::TxId;

use crate::engine::LedgerEngine;
use crate::retry::TryError;
use crate::types::SweepReport;

impl LedgerEngine {
    /// Sweeps Pending transactions older than the configured staleness
    /// threshold.
    pub async fn sweep_stale(&self) -> SweepReport {
        let threshold = chrono::Duration::seconds(
            i64::try_from(self.config.sweep.staleness_threshold_secs).unwrap_or(i64::MAX),
        );
        self.sweep_pending(threshold).await
    }

    /// Sweeps Pending transactions older than `older_than`.
    #[instrument(skip(self, older_than))]
    pub async fn sweep_pending(&self, older_than: chrono::Duration) -> SweepReport {
        let cutoff = Utc::now() - older_than;
        let stale = self.journal.pending_older_than(cutoff).await;

        let mut report = SweepReport::default();
        for tx in stale {
            match self.sweep_one(&tx).await {
                Ok(()) => report.processed += 1,
                Err(err) => {
                    warn!(tx_id = %tx.tx_id, error = %err, "sweep could not apply transaction");
                    report.failed += 1;
                    report.failed_ids.push(tx.tx_id.clone());
                    self.mark_swept_failed(&tx.tx_id, &err.to_string()).await;
                }
            }
        }

        info!(
            processed = report.processed,
            failed = report.failed,
            "pending sweep finished"
        );
        report
    }

    /// Applies one pending transaction in its own commit unit.
    async fn sweep_one(&self, tx: &Transaction) -> Result<(), LedgerError> {
        let mut attempt = 0_u32;
        loop {
            match self.try_sweep_one(tx).await {
                Ok(()) => return Ok(()),
                Err(TryError::Ledger(err)) => return Err(err),
                Err(TryError::Conflict(row)) => {
                    attempt = self.pause_before_retry(attempt, &row).await?;
                }
            }
        }
    }

    async fn try_sweep_one(&self, tx: &Transaction) -> Result<(), TryError> {
        let now = Utc::now();
        let mut ctx = self.store.begin();

        self.journal
            .mark_status(
                &mut ctx,
                &tx.tx_id,
                TransactionStatus::Processing,
                None,
                None,
                now,
            )
            .await?;

        let kinds = self.load_entry_account_kinds(&mut ctx, &tx.entries).await?;
        self.apply_entries(&mut ctx, &tx.entries, &kinds).await?;

        self.journal
            .mark_status(
                &mut ctx,
                &tx.tx_id,
                TransactionStatus::Completed,
                Some(now),
                None,
                now,
            )
            .await?;
        ctx.commit().await?;
        Ok(())
    }

    /// Records a sweep failure on the row itself, in a commit unit of its
    /// own. The failed transition is Pending -> Processing -> Failed.
    async fn mark_swept_failed(&self, tx_id: &TxId, reason: &str) {
        let mut attempt = 0_u32;
        loop {
            match self.try_mark_failed(tx_id, reason).await {
                Ok(()) => return,
                Err(TryError::Ledger(err)) => {
                    error!(%tx_id, error = %err, "could not record sweep failure");
                    return;
                }
                Err(TryError::Conflict(row)) => {
                    match self.pause_before_retry(attempt, &row).await {
                        Ok(next) => attempt = next,
                        Err(err) => {
                            error!(%tx_id, error = %err, "could not record sweep failure");
                            return;
                        }
                    }
                }
            }
        }
    }

    async fn try_mark_failed(&self, tx_id: &TxId, reason: &str) -> Result<(), TryError> {
        let now = Utc::now();
        let mut ctx = self.store.begin();

        self.journal
            .mark_status(
                &mut ctx,
                tx_id,
                TransactionStatus::Processing,
                None,
                None,
                now,
            )
            .await?;
        self.journal
            .mark_status(
                &mut ctx,
                tx_id,
                TransactionStatus::Failed,
                None,
                Some(reason.to_string()),
                now,
            )
            .await?;
        ctx.commit().await?;
        Ok(())
    }
}
