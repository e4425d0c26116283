//! Order status value object: the order lifecycle state machine's vocabulary.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of an order.
///
/// `Pending` is the only initial state; `Filled`, `Cancelled`, `Rejected`,
/// and `Failed` are terminal and absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Created and persisted, not yet accepted by the broker.
    Pending,
    /// Accepted by the broker, not yet confirmed working.
    Submitted,
    /// Working at the broker (open on the book).
    Open,
    /// Fully filled.
    Filled,
    /// Cancelled by the user or broker.
    Cancelled,
    /// Rejected by the validator or the broker.
    Rejected,
    /// Broker submission failed (transport or business error).
    Failed,
}

impl OrderStatus {
    /// Whether this status is terminal (no further transitions allowed).
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Filled | Self::Cancelled | Self::Rejected | Self::Failed
        )
    }

    /// Whether an order in this status is actively working at the broker.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Submitted | Self::Open)
    }

    /// Whether an order in this status can be cancelled.
    #[must_use]
    pub const fn is_cancellable(&self) -> bool {
        self.is_active()
    }

    /// Whether an order in this status can be modified.
    #[must_use]
    pub const fn is_modifiable(&self) -> bool {
        self.is_active()
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::Submitted => "SUBMITTED",
            Self::Open => "OPEN",
            Self::Filled => "FILLED",
            Self::Cancelled => "CANCELLED",
            Self::Rejected => "REJECTED",
            Self::Failed => "FAILED",
        };
        write!(f, "{s}")
    }
}
