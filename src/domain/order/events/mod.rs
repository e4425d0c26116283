//! Lifecycle events emitted by the order and position aggregates.
//!
//! Consumers register callbacks per event kind (see
//! `application::event_registry`); emission is at-least-once and
//! non-blocking, and a failing callback is logged and swallowed rather than
//! propagated into the loop that produced the event.

use serde::{Deserialize, Serialize};

use crate::domain::shared::{BrokerOrderId, Money, OrderId, PositionId, Quantity, Symbol, Timestamp};

/// A lifecycle event, tagged by kind for routing to registered callbacks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum OrderLifecycleEvent {
    /// `order:placed` — the order was accepted for submission and persisted.
    #[serde(rename = "order:placed")]
    OrderPlaced {
        /// The placed order.
        order_id: OrderId,
        /// Symbol traded.
        symbol: Symbol,
        /// When the event occurred.
        occurred_at: Timestamp,
    },

    /// `order:filled` — the order reached a complete or partial fill update.
    #[serde(rename = "order:filled")]
    OrderFilled {
        /// The filled order.
        order_id: OrderId,
        /// Broker-assigned order id.
        broker_order_id: Option<BrokerOrderId>,
        /// Quantity filled in this update.
        filled_quantity: Quantity,
        /// Average fill price.
        average_price: Money,
        /// When the event occurred.
        occurred_at: Timestamp,
    },

    /// `order:cancelled` — the order was cancelled.
    #[serde(rename = "order:cancelled")]
    OrderCancelled {
        /// The cancelled order.
        order_id: OrderId,
        /// When the event occurred.
        occurred_at: Timestamp,
    },

    /// `order:rejected` — the order was rejected, either by the validator or the broker.
    #[serde(rename = "order:rejected")]
    OrderRejected {
        /// The rejected order.
        order_id: OrderId,
        /// Rejection reason.
        reason: String,
        /// When the event occurred.
        occurred_at: Timestamp,
    },

    /// `position:updated` — a fill changed an open position's quantity or average price.
    #[serde(rename = "position:updated")]
    PositionUpdated {
        /// The updated position.
        position_id: PositionId,
        /// Symbol traded.
        symbol: Symbol,
        /// New signed quantity.
        quantity: Quantity,
        /// When the event occurred.
        occurred_at: Timestamp,
    },

    /// `position:closed` — a position's quantity reached zero.
    #[serde(rename = "position:closed")]
    PositionClosed {
        /// The closed position.
        position_id: PositionId,
        /// Symbol traded.
        symbol: Symbol,
        /// Final realized PnL.
        realized_pnl: Money,
        /// When the event occurred.
        occurred_at: Timestamp,
    },
}

impl OrderLifecycleEvent {
    /// The event's kind string, matching the `kind` tag used in persistence
    /// and wire representations.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::OrderPlaced { .. } => "order:placed",
            Self::OrderFilled { .. } => "order:filled",
            Self::OrderCancelled { .. } => "order:cancelled",
            Self::OrderRejected { .. } => "order:rejected",
            Self::PositionUpdated { .. } => "position:updated",
            Self::PositionClosed { .. } => "position:closed",
        }
    }

    /// When the event occurred.
    #[must_use]
    pub const fn occurred_at(&self) -> Timestamp {
        match self {
            Self::OrderPlaced { occurred_at, .. }
            | Self::OrderFilled { occurred_at, .. }
            | Self::OrderCancelled { occurred_at, .. }
            | Self::OrderRejected { occurred_at, .. }
            | Self::PositionUpdated { occurred_at, .. }
            | Self::PositionClosed { occurred_at, .. } => *occurred_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts() -> Timestamp {
        Timestamp::now()
    }

    #[test]
    fn kind_strings() {
        assert_eq!(
            OrderLifecycleEvent::OrderPlaced {
                order_id: OrderId::new(1),
                symbol: Symbol::new("TCS"),
                occurred_at: ts(),
            }
            .kind(),
            "order:placed"
        );
        assert_eq!(
            OrderLifecycleEvent::OrderCancelled {
                order_id: OrderId::new(1),
                occurred_at: ts(),
            }
            .kind(),
            "order:cancelled"
        );
        assert_eq!(
            OrderLifecycleEvent::PositionClosed {
                position_id: PositionId::new(1),
                symbol: Symbol::new("TCS"),
                realized_pnl: Money::ZERO,
                occurred_at: ts(),
            }
            .kind(),
            "position:closed"
        );
    }

    #[test]
    fn occurred_at_accessor() {
        let at = ts();
        let event = OrderLifecycleEvent::OrderRejected {
            order_id: OrderId::new(2),
            reason: "stop-loss required".to_string(),
            occurred_at: at,
        };
        assert_eq!(event.occurred_at(), at);
    }

    #[test]
    fn serde_tag_roundtrip() {
        let event = OrderLifecycleEvent::OrderFilled {
            order_id: OrderId::new(3),
            broker_order_id: Some(BrokerOrderId::new("brk-1")),
            filled_quantity: Quantity::new(10),
            average_price: Money::usd(100.0),
            occurred_at: ts(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"kind\":\"order:filled\""));
        let parsed: OrderLifecycleEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.kind(), "order:filled");
    }
}
