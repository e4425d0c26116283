//! Order type value object.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The execution style of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    /// Execute immediately at the best available price.
    Market,
    /// Execute at a specified price or better.
    Limit,
    /// Stop-loss: becomes a market order once the trigger price is touched.
    #[serde(rename = "SL")]
    StopLoss,
    /// Stop-loss limit: becomes a limit order once the trigger price is touched.
    #[serde(rename = "SL_M")]
    StopLossMarket,
}

impl OrderType {
    /// Whether this order type requires a limit `price`.
    #[must_use]
    pub const fn requires_price(&self) -> bool {
        matches!(self, Self::Limit | Self::StopLoss)
    }

    /// Whether this order type requires a `trigger_price`.
    #[must_use]
    pub const fn requires_trigger_price(&self) -> bool {
        matches!(self, Self::StopLoss | Self::StopLossMarket)
    }

    /// Whether this is a market order.
    #[must_use]
    pub const fn is_market(&self) -> bool {
        matches!(self, Self::Market)
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Market => "MARKET",
            Self::Limit => "LIMIT",
            Self::StopLoss => "SL",
            Self::StopLossMarket => "SL_M",
        };
        write!(f, "{s}")
    }
}
