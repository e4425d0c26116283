//! Shared Domain Types
//!
//! Value objects and errors shared across bounded contexts.

pub mod errors;
pub mod value_objects;

pub use errors::DomainError;
pub use value_objects::{
    BrokerOrderId, BrokerTradeId, Exchange, IdSequence, KillSwitchEventId, Money, OrderId,
    PositionId, Quantity, ReconciliationIssueId, StrategyId, Symbol, Timestamp, TradeId,
};
