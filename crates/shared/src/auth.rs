//! Caller identity consumed by the engine's authorization contract.
//!
//! The ledger core trusts the perimeter for authentication: callers arrive
//! already authenticated, carrying their user id and a role claim. The engine
//! enforces only the checks that belong to the core (transfer source
//! ownership, reversal privilege); everything else is the perimeter's job.

use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::types::UserId;

/// Role claim supplied by the perimeter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular account holder.
    Customer,
    /// Branch staff; may operate on customer accounts.
    Teller,
    /// May reverse transactions and act on any account.
    Admin,
}

/// An authenticated caller as seen by the ledger engine.
#[derive(Debug, Clone)]
pub struct Caller {
    /// The authenticated user.
    pub user_id: UserId,
    /// Role claim; the engine does not fetch roles itself.
    pub role: Role,
    /// Optional deadline for the operation. Expiry aborts the commit context
    /// with no partial state.
    pub deadline: Option<Instant>,
}

impl Caller {
    /// A customer caller with no deadline.
    #[must_use]
    pub const fn customer(user_id: UserId) -> Self {
        Self {
            user_id,
            role: Role::Customer,
            deadline: None,
        }
    }

    /// An admin caller with no deadline.
    #[must_use]
    pub const fn admin(user_id: UserId) -> Self {
        Self {
            user_id,
            role: Role::Admin,
            deadline: None,
        }
    }

    /// Attaches a deadline to this caller's operations.
    #[must_use]
    pub const fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Whether this caller holds the admin role.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }
}
