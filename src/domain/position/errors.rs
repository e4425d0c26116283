//! Errors for the position bounded context.

use std::fmt;

use crate::domain::shared::{Exchange, StrategyId, Symbol};

/// Errors raised while mutating a [`Position`](super::Position).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PositionError {
    /// The position is closed and may never mutate again.
    Closed {
        /// Symbol of the closed position.
        symbol: Symbol,
        /// Exchange of the closed position.
        exchange: Exchange,
        /// Strategy the position belongs to.
        strategy_id: StrategyId,
    },

    /// A reducing fill's quantity exceeds the position's open quantity.
    ReduceExceedsQuantity {
        /// Magnitude of the fill quantity.
        fill_quantity: i64,
        /// Magnitude of the position's open quantity.
        open_quantity: i64,
    },

    /// A quantity supplied to a position operation was not positive where required.
    InvalidQuantity {
        /// The offending value.
        quantity: i64,
    },
}

impl fmt::Display for PositionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed {
                symbol,
                exchange,
                strategy_id,
            } => write!(
                f,
                "position {symbol}/{exchange}/{strategy_id} is closed and cannot mutate"
            ),
            Self::ReduceExceedsQuantity {
                fill_quantity,
                open_quantity,
            } => write!(
                f,
                "reducing fill quantity {fill_quantity} exceeds open quantity {open_quantity}"
            ),
            Self::InvalidQuantity { quantity } => {
                write!(f, "invalid position quantity: {quantity}")
            }
        }
    }
}

impl std::error::Error for PositionError {}
