//! Shared Value Objects
//!
//! Immutable domain types used across bounded contexts.
//! Value objects are compared by value, not identity.

mod identifiers;
mod money;
mod quantity;
mod symbol;
mod timestamp;

pub use identifiers::{
    BrokerOrderId, BrokerTradeId, IdSequence, KillSwitchEventId, OrderId, PositionId,
    ReconciliationIssueId, StrategyId, TradeId,
};
pub use money::Money;
pub use quantity::Quantity;
pub use symbol::{Exchange, Symbol};
pub use timestamp::Timestamp;
