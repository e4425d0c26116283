//! Product (margin product) value object.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The margin product an order trades under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Product {
    /// Margin intraday square-off: must be closed by end of session.
    Mis,
    /// Cash-and-carry: delivery-based, no intraday leverage.
    Cnc,
}

impl Product {
    /// Whether this product is leveraged intraday.
    #[must_use]
    pub const fn is_intraday(&self) -> bool {
        matches!(self, Self::Mis)
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Mis => "MIS",
            Self::Cnc => "CNC",
        };
        write!(f, "{s}")
    }
}
