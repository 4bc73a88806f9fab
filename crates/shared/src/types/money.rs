//! Currency support for the ledger.
//!
//! CRITICAL: Never use floating-point for money calculations. Every monetary
//! amount in the ledger is a `rust_decimal::Decimal`; this module contributes
//! the currency dimension.

use serde::{Deserialize, Serialize};

/// ISO 4217 currency codes supported by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// US Dollar
    Usd,
    /// Euro
    Eur,
    /// Pound Sterling
    Gbp,
    /// Japanese Yen
    Jpy,
    /// Canadian Dollar
    Cad,
    /// Swiss Franc
    Chf,
    /// Australian Dollar
    Aud,
    /// Chinese Yuan
    Cny,
    /// Indian Rupee
    Inr,
    /// Nigerian Naira
    Ngn,
}

impl Currency {
    /// All supported currencies.
    pub const ALL: [Self; 10] = [
        Self::Usd,
        Self::Eur,
        Self::Gbp,
        Self::Jpy,
        Self::Cad,
        Self::Chf,
        Self::Aud,
        Self::Cny,
        Self::Inr,
        Self::Ngn,
    ];

    /// The ISO 4217 alphabetic code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Usd => "USD",
            Self::Eur => "EUR",
            Self::Gbp => "GBP",
            Self::Jpy => "JPY",
            Self::Cad => "CAD",
            Self::Chf => "CHF",
            Self::Aud => "AUD",
            Self::Cny => "CNY",
            Self::Inr => "INR",
            Self::Ngn => "NGN",
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "USD" => Ok(Self::Usd),
            "EUR" => Ok(Self::Eur),
            "GBP" => Ok(Self::Gbp),
            "JPY" => Ok(Self::Jpy),
            "CAD" => Ok(Self::Cad),
            "CHF" => Ok(Self::Chf),
            "AUD" => Ok(Self::Aud),
            "CNY" => Ok(Self::Cny),
            "INR" => Ok(Self::Inr),
            "NGN" => Ok(Self::Ngn),
            _ => Err(format!("Unknown currency: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_currency_display() {
        assert_eq!(Currency::Usd.to_string(), "USD");
        assert_eq!(Currency::Gbp.to_string(), "GBP");
        assert_eq!(Currency::Ngn.to_string(), "NGN");
    }

    #[test]
    fn test_currency_from_str() {
        assert_eq!(Currency::from_str("USD").unwrap(), Currency::Usd);
        assert_eq!(Currency::from_str("usd").unwrap(), Currency::Usd);
        assert_eq!(Currency::from_str("EUR").unwrap(), Currency::Eur);
        assert_eq!(Currency::from_str("JPY").unwrap(), Currency::Jpy);
        assert_eq!(Currency::from_str("NGN").unwrap(), Currency::Ngn);

        assert!(Currency::from_str("XXX").is_err());
        assert!(Currency::from_str("").is_err());
    }

    #[test]
    fn test_currency_roundtrip_all() {
        for currency in Currency::ALL {
            assert_eq!(Currency::from_str(currency.code()).unwrap(), currency);
        }
    }

    #[test]
    fn test_currency_serde_uppercase() {
        let json = serde_json::to_string(&Currency::Usd).unwrap();
        assert_eq!(json, "\"USD\"");
        let back: Currency = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Currency::Usd);
    }
}
