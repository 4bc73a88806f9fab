//! Statistics result types.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use argent_shared::types::Currency;

use crate::ledger::types::TransactionKind;

/// Half-open observation window; `None` bounds are unbounded.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Inclusive lower bound.
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound.
    pub to: Option<DateTime<Utc>>,
}

impl TimeWindow {
    /// The unbounded window.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            from: None,
            to: None,
        }
    }

    /// Whether `instant` falls inside this window.
    #[must_use]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.from.is_none_or(|from| instant >= from) && self.to.is_none_or(|to| instant < to)
    }
}

/// Count and total for one currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyTotal {
    /// Currency.
    pub currency: Currency,
    /// Number of transactions.
    pub count: u64,
    /// Sum of declared amounts.
    pub total: Decimal,
}

/// Count and total for one (kind, currency) group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindBreakdown {
    /// Transaction kind.
    pub kind: TransactionKind,
    /// Currency.
    pub currency: Currency,
    /// Number of transactions.
    pub count: u64,
    /// Sum of declared amounts.
    pub total: Decimal,
}

/// Count and total for one (year, month, kind) group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyPoint {
    /// Calendar year.
    pub year: i32,
    /// Calendar month, 1-12.
    pub month: u32,
    /// Transaction kind.
    pub kind: TransactionKind,
    /// Number of transactions.
    pub count: u64,
    /// Sum of declared amounts.
    pub total: Decimal,
}

/// Per-user statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserStats {
    /// Count and total per currency.
    pub summary: Vec<CurrencyTotal>,
    /// Grouped by (kind, currency).
    pub by_type: Vec<KindBreakdown>,
    /// Grouped by (year, month, kind).
    pub monthly_trend: Vec<MonthlyPoint>,
}

/// Flow direction relative to an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// The account is the destination.
    Incoming,
    /// The account is the source.
    Outgoing,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Incoming => f.write_str("incoming"),
            Self::Outgoing => f.write_str("outgoing"),
        }
    }
}

/// Net flow for one currency over the window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetFlow {
    /// Currency.
    pub currency: Currency,
    /// Sum of incoming amounts.
    pub incoming: Decimal,
    /// Sum of outgoing amounts.
    pub outgoing: Decimal,
    /// `incoming - outgoing`.
    pub net: Decimal,
}

/// Count and total for one (direction, kind) group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectionKindBreakdown {
    /// Flow direction.
    pub direction: Direction,
    /// Transaction kind.
    pub kind: TransactionKind,
    /// Number of transactions.
    pub count: u64,
    /// Sum of declared amounts.
    pub total: Decimal,
}

/// Incoming/outgoing totals for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyPoint {
    /// Calendar day (UTC).
    pub date: NaiveDate,
    /// Sum of incoming amounts.
    pub incoming: Decimal,
    /// Sum of outgoing amounts.
    pub outgoing: Decimal,
}

/// Per-account statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountStats {
    /// Net flow per currency.
    pub net_flow: Vec<NetFlow>,
    /// Grouped by (direction, kind).
    pub by_direction_and_type: Vec<DirectionKindBreakdown>,
    /// Grouped by calendar day.
    pub daily_trend: Vec<DailyPoint>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_window_contains() {
        let from = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
        let window = TimeWindow {
            from: Some(from),
            to: Some(to),
        };

        assert!(window.contains(from));
        assert!(window.contains(Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap()));
        assert!(!window.contains(to));
        assert!(!window.contains(Utc.with_ymd_and_hms(2025, 12, 31, 23, 59, 59).unwrap()));
    }

    #[test]
    fn test_unbounded_window() {
        let window = TimeWindow::all();
        assert!(window.contains(Utc.with_ymd_and_hms(1999, 1, 1, 0, 0, 0).unwrap()));
        assert!(window.contains(Utc.with_ymd_and_hms(2099, 1, 1, 0, 0, 0).unwrap()));
    }
}
