//! Statistics folds.

use std::collections::BTreeMap;

use chrono::Datelike;
use rust_decimal::Decimal;

use argent_shared::types::{AccountNumber, Currency};

use crate::ledger::types::{Transaction, TransactionKind, TransactionStatus};

use super::types::{
    AccountStats, CurrencyTotal, DailyPoint, Direction, DirectionKindBreakdown, KindBreakdown,
    MonthlyPoint, NetFlow, UserStats,
};

/// Pure aggregation over completed transactions.
///
/// Callers are expected to pass transactions already filtered to the window;
/// non-completed rows are skipped defensively so a stray Pending row can
/// never leak into the numbers.
pub struct StatsService;

impl StatsService {
    /// Aggregates a user's completed transactions: count and total per
    /// currency, per (kind, currency), and per (year, month, kind).
    #[must_use]
    pub fn user_stats(transactions: &[Transaction]) -> UserStats {
        let mut summary: BTreeMap<Currency, (u64, Decimal)> = BTreeMap::new();
        let mut by_type: BTreeMap<(TransactionKind, Currency), (u64, Decimal)> = BTreeMap::new();
        let mut monthly: BTreeMap<(i32, u32, TransactionKind), (u64, Decimal)> = BTreeMap::new();

        for tx in Self::completed(transactions) {
            let bucket = summary.entry(tx.currency).or_insert((0, Decimal::ZERO));
            bucket.0 += 1;
            bucket.1 += tx.amount;

            let bucket = by_type
                .entry((tx.kind, tx.currency))
                .or_insert((0, Decimal::ZERO));
            bucket.0 += 1;
            bucket.1 += tx.amount;

            let stamp = tx.processed_at.unwrap_or(tx.created_at);
            let bucket = monthly
                .entry((stamp.year(), stamp.month(), tx.kind))
                .or_insert((0, Decimal::ZERO));
            bucket.0 += 1;
            bucket.1 += tx.amount;
        }

        UserStats {
            summary: summary
                .into_iter()
                .map(|(currency, (count, total))| CurrencyTotal {
                    currency,
                    count,
                    total,
                })
                .collect(),
            by_type: by_type
                .into_iter()
                .map(|((kind, currency), (count, total))| KindBreakdown {
                    kind,
                    currency,
                    count,
                    total,
                })
                .collect(),
            monthly_trend: monthly
                .into_iter()
                .map(|((year, month, kind), (count, total))| MonthlyPoint {
                    year,
                    month,
                    kind,
                    count,
                    total,
                })
                .collect(),
        }
    }

    /// Aggregates the completed transactions touching one account: net flow
    /// per currency, per (direction, kind), and a daily trend.
    ///
    /// Direction is Incoming when the account is the destination, Outgoing
    /// otherwise.
    #[must_use]
    pub fn account_stats(account: &AccountNumber, transactions: &[Transaction]) -> AccountStats {
        let mut flows: BTreeMap<Currency, (Decimal, Decimal)> = BTreeMap::new();
        let mut by_dir: BTreeMap<(Direction, TransactionKind), (u64, Decimal)> = BTreeMap::new();
        let mut daily: BTreeMap<chrono::NaiveDate, (Decimal, Decimal)> = BTreeMap::new();

        for tx in Self::completed(transactions) {
            let direction = Self::direction(account, tx);

            let flow = flows
                .entry(tx.currency)
                .or_insert((Decimal::ZERO, Decimal::ZERO));
            match direction {
                Direction::Incoming => flow.0 += tx.amount,
                Direction::Outgoing => flow.1 += tx.amount,
            }

            let bucket = by_dir
                .entry((direction, tx.kind))
                .or_insert((0, Decimal::ZERO));
            bucket.0 += 1;
            bucket.1 += tx.amount;

            let day = tx.processed_at.unwrap_or(tx.created_at).date_naive();
            let point = daily.entry(day).or_insert((Decimal::ZERO, Decimal::ZERO));
            match direction {
                Direction::Incoming => point.0 += tx.amount,
                Direction::Outgoing => point.1 += tx.amount,
            }
        }

        AccountStats {
            net_flow: flows
                .into_iter()
                .map(|(currency, (incoming, outgoing))| NetFlow {
                    currency,
                    incoming,
                    outgoing,
                    net: incoming - outgoing,
                })
                .collect(),
            by_direction_and_type: by_dir
                .into_iter()
                .map(|((direction, kind), (count, total))| DirectionKindBreakdown {
                    direction,
                    kind,
                    count,
                    total,
                })
                .collect(),
            daily_trend: daily
                .into_iter()
                .map(|(date, (incoming, outgoing))| DailyPoint {
                    date,
                    incoming,
                    outgoing,
                })
                .collect(),
        }
    }

    /// Flow direction of `tx` relative to `account`.
    #[must_use]
    pub fn direction(account: &AccountNumber, tx: &Transaction) -> Direction {
        if tx.to_account.as_ref() == Some(account) {
            Direction::Incoming
        } else {
            Direction::Outgoing
        }
    }

    fn completed(transactions: &[Transaction]) -> impl Iterator<Item = &Transaction> {
        transactions
            .iter()
            .filter(|tx| tx.status == TransactionStatus::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    use argent_shared::types::{AccountId, JournalId, TxId, UserId};

    use crate::ledger::types::{Entry, Metadata};

    fn tx(
        kind: TransactionKind,
        amount: Decimal,
        currency: Currency,
        from: Option<AccountNumber>,
        to: Option<AccountNumber>,
        when: chrono::DateTime<Utc>,
    ) -> Transaction {
        Transaction {
            id: JournalId::new(),
            tx_id: TxId::mint(kind.prefix()),
            kind,
            initiated_by: UserId::new(),
            entries: vec![
                Entry::debit(AccountId::new(), amount),
                Entry::credit(AccountId::new(), amount),
            ],
            amount,
            currency,
            from_account: from,
            to_account: to,
            status: TransactionStatus::Completed,
            description: String::new(),
            reference: None,
            metadata: Metadata::new(),
            failure_reason: None,
            processed_at: Some(when),
            created_at: when,
            updated_at: when,
        }
    }

    #[test]
    fn test_user_stats_summary_per_currency() {
        let jan = Utc.with_ymd_and_hms(2026, 1, 10, 9, 0, 0).unwrap();
        let feb = Utc.with_ymd_and_hms(2026, 2, 3, 9, 0, 0).unwrap();
        let account = AccountNumber::mint();

        let txs = vec![
            tx(
                TransactionKind::Deposit,
                dec!(100.00),
                Currency::Usd,
                None,
                Some(account.clone()),
                jan,
            ),
            tx(
                TransactionKind::Withdrawal,
                dec!(30.00),
                Currency::Usd,
                Some(account.clone()),
                None,
                feb,
            ),
            tx(
                TransactionKind::Deposit,
                dec!(50.00),
                Currency::Eur,
                None,
                Some(account),
                feb,
            ),
        ];

        let stats = StatsService::user_stats(&txs);

        assert_eq!(stats.summary.len(), 2);
        let usd = stats
            .summary
            .iter()
            .find(|s| s.currency == Currency::Usd)
            .unwrap();
        assert_eq!(usd.count, 2);
        assert_eq!(usd.total, dec!(130.00));

        assert_eq!(stats.by_type.len(), 3);
        assert_eq!(stats.monthly_trend.len(), 3);

        let jan_deposits = stats
            .monthly_trend
            .iter()
            .find(|p| p.year == 2026 && p.month == 1 && p.kind == TransactionKind::Deposit)
            .unwrap();
        assert_eq!(jan_deposits.count, 1);
        assert_eq!(jan_deposits.total, dec!(100.00));
    }

    #[test]
    fn test_user_stats_skips_non_completed() {
        let when = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let mut pending = tx(
            TransactionKind::Deposit,
            dec!(10.00),
            Currency::Usd,
            None,
            None,
            when,
        );
        pending.status = TransactionStatus::Pending;

        let stats = StatsService::user_stats(&[pending]);
        assert!(stats.summary.is_empty());
    }

    #[test]
    fn test_account_stats_net_flow() {
        let account = AccountNumber::mint();
        let peer = AccountNumber::mint();
        let day1 = Utc.with_ymd_and_hms(2026, 4, 1, 10, 0, 0).unwrap();
        let day2 = Utc.with_ymd_and_hms(2026, 4, 2, 10, 0, 0).unwrap();

        let txs = vec![
            // Incoming 100
            tx(
                TransactionKind::Deposit,
                dec!(100.00),
                Currency::Usd,
                None,
                Some(account.clone()),
                day1,
            ),
            // Outgoing 40
            tx(
                TransactionKind::Transfer,
                dec!(40.00),
                Currency::Usd,
                Some(account.clone()),
                Some(peer.clone()),
                day1,
            ),
            // Incoming 15
            tx(
                TransactionKind::Transfer,
                dec!(15.00),
                Currency::Usd,
                Some(peer),
                Some(account.clone()),
                day2,
            ),
        ];

        let stats = StatsService::account_stats(&account, &txs);

        assert_eq!(stats.net_flow.len(), 1);
        let flow = &stats.net_flow[0];
        assert_eq!(flow.incoming, dec!(115.00));
        assert_eq!(flow.outgoing, dec!(40.00));
        assert_eq!(flow.net, dec!(75.00));

        assert_eq!(stats.daily_trend.len(), 2);
        assert_eq!(stats.daily_trend[0].incoming, dec!(100.00));
        assert_eq!(stats.daily_trend[0].outgoing, dec!(40.00));
        assert_eq!(stats.daily_trend[1].incoming, dec!(15.00));

        let incoming_transfers = stats
            .by_direction_and_type
            .iter()
            .find(|b| b.direction == Direction::Incoming && b.kind == TransactionKind::Transfer)
            .unwrap();
        assert_eq!(incoming_transfers.count, 1);
        assert_eq!(incoming_transfers.total, dec!(15.00));
    }

    #[test]
    fn test_direction_rule() {
        let account = AccountNumber::mint();
        let when = Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap();

        let incoming = tx(
            TransactionKind::Deposit,
            dec!(1.00),
            Currency::Usd,
            None,
            Some(account.clone()),
            when,
        );
        assert_eq!(
            StatsService::direction(&account, &incoming),
            Direction::Incoming
        );

        let outgoing = tx(
            TransactionKind::Fee,
            dec!(1.00),
            Currency::Usd,
            Some(account.clone()),
            None,
            when,
        );
        assert_eq!(
            StatsService::direction(&account, &outgoing),
            Direction::Outgoing
        );
    }
}
