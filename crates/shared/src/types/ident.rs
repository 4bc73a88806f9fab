//! Human-facing identifier mint: account numbers and transaction ids.
//!
//! Account numbers look like `ACCT-3F9A-00C2-7B1D`; transaction ids look like
//! `DEP-LX2M9K4F-8A1B2C3D` (prefix, base-36 wall-clock millis, 8 hex chars of
//! cryptographic randomness). Both are minted from `rand::thread_rng`, which
//! is a CSPRNG; collisions are statistically negligible and the journal's
//! unique index is the final arbiter.

use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Parse failure for a minted identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentError {
    /// The account number does not match `ACCT-XXXX-XXXX-XXXX`.
    #[error("Invalid account number: {0}")]
    AccountNumber(String),

    /// The transaction id does not match `PREFIX-TIME-RANDOM`.
    #[error("Invalid transaction id: {0}")]
    TransactionId(String),
}

/// Prefix tag carried by every transaction id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TxPrefix {
    /// Deposit.
    Dep,
    /// Withdrawal.
    Wdr,
    /// Transfer.
    Trf,
    /// Fee.
    Fee,
    /// Reversal.
    Rev,
    /// System provisioning.
    Sys,
    /// Any other transaction kind.
    Txn,
}

impl TxPrefix {
    /// The three-letter tag.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Dep => "DEP",
            Self::Wdr => "WDR",
            Self::Trf => "TRF",
            Self::Fee => "FEE",
            Self::Rev => "REV",
            Self::Sys => "SYS",
            Self::Txn => "TXN",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "DEP" => Some(Self::Dep),
            "WDR" => Some(Self::Wdr),
            "TRF" => Some(Self::Trf),
            "FEE" => Some(Self::Fee),
            "REV" => Some(Self::Rev),
            "SYS" => Some(Self::Sys),
            "TXN" => Some(Self::Txn),
            _ => None,
        }
    }
}

impl std::fmt::Display for TxPrefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Human-facing account number: `ACCT-{4h}-{4h}-{4h}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountNumber(String);

impl AccountNumber {
    /// Mints a fresh account number from the thread-local CSPRNG.
    #[must_use]
    pub fn mint() -> Self {
        let mut rng = rand::thread_rng();
        let groups: [u16; 3] = [rng.gen(), rng.gen(), rng.gen()];
        Self(format!(
            "ACCT-{:04X}-{:04X}-{:04X}",
            groups[0], groups[1], groups[2]
        ))
    }

    /// Parses and validates an account number.
    ///
    /// # Errors
    ///
    /// Returns `IdentError::AccountNumber` when the input does not match
    /// `ACCT-` followed by three dash-separated groups of 4 hex digits.
    pub fn parse(s: &str) -> Result<Self, IdentError> {
        let parts: Vec<&str> = s.split('-').collect();
        let well_formed = parts.len() == 4
            && parts[0] == "ACCT"
            && parts[1..]
                .iter()
                .all(|g| g.len() == 4 && g.chars().all(|c| c.is_ascii_hexdigit()));

        if well_formed {
            Ok(Self(s.to_string()))
        } else {
            Err(IdentError::AccountNumber(s.to_string()))
        }
    }

    /// The account number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for AccountNumber {
    type Err = IdentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Globally unique, prefix-tagged transaction id: `{PREFIX}-{T}-{R}`.
///
/// `T` is the base-36 upper-case encoding of wall-clock millis at mint time
/// (monotonic within a process modulo clock steps), `R` is 8 upper-case hex
/// chars of randomness.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxId(String);

impl TxId {
    /// Mints a fresh transaction id with the given prefix.
    #[must_use]
    pub fn mint(prefix: TxPrefix) -> Self {
        let millis = Utc::now().timestamp_millis().max(0) as u64;
        let random: u32 = rand::thread_rng().gen();
        Self(format!(
            "{}-{}-{:08X}",
            prefix.tag(),
            base36_upper(millis),
            random
        ))
    }

    /// Parses and validates a transaction id.
    ///
    /// # Errors
    ///
    /// Returns `IdentError::TransactionId` for an unknown prefix, a
    /// non-base-36 time component, or a random component that is not exactly
    /// 8 hex digits.
    pub fn parse(s: &str) -> Result<Self, IdentError> {
        let parts: Vec<&str> = s.split('-').collect();
        let well_formed = parts.len() == 3
            && TxPrefix::from_tag(parts[0]).is_some()
            && !parts[1].is_empty()
            && parts[1]
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
            && parts[2].len() == 8
            && parts[2]
                .chars()
                .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c));

        if well_formed {
            Ok(Self(s.to_string()))
        } else {
            Err(IdentError::TransactionId(s.to_string()))
        }
    }

    /// The prefix tag this id was minted with.
    #[must_use]
    pub fn prefix(&self) -> TxPrefix {
        // Validated at construction, so the tag is always well-formed.
        let tag = self.0.split('-').next().unwrap_or_default();
        TxPrefix::from_tag(tag).unwrap_or(TxPrefix::Txn)
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TxId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for TxId {
    type Err = IdentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Encodes a u64 as upper-case base-36.
fn base36_upper(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

    if value == 0 {
        return "0".to_string();
    }

    // 13 base-36 digits cover the full u64 range.
    let mut buf = [0_u8; 13];
    let mut at = buf.len();
    while value > 0 {
        at -= 1;
        buf[at] = DIGITS[(value % 36) as usize];
        value /= 36;
    }
    buf[at..].iter().map(|&b| char::from(b)).collect()
}
