//! Broker Port (Driven Port)
//!
//! Interface for interacting with a brokerage for order placement, lifecycle
//! polling, and position listing. Implementations must be safe under
//! concurrent calls from the poller and reconciler.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::order::value_objects::{OrderSide, OrderType, Product, Validity};
use crate::domain::shared::{BrokerOrderId, BrokerTradeId, Exchange, Money, Quantity, Symbol};
use crate::domain::trade::ChargeBreakdown;

/// Parameters for a new order submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceOrderParams {
    /// Instrument symbol.
    pub symbol: Symbol,
    /// Exchange.
    pub exchange: Exchange,
    /// Buy or sell.
    pub side: OrderSide,
    /// Quantity.
    pub quantity: Quantity,
    /// Execution style.
    pub order_type: OrderType,
    /// Margin product.
    pub product: Product,
    /// Time-in-force.
    pub validity: Validity,
    /// Limit price, required for LIMIT/SL orders.
    pub price: Option<Money>,
    /// Trigger price, required for SL/SL_M orders.
    pub trigger_price: Option<Money>,
}

/// A patch applied to a working order via `modify`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModifyOrderParams {
    /// New limit price, if changing.
    pub price: Option<Money>,
    /// New quantity, if changing.
    pub quantity: Option<Quantity>,
    /// New trigger price, if changing.
    pub trigger_price: Option<Money>,
}

/// Broker-native order status, as reported by `list_orders`.
///
/// `Unknown` carries the broker's raw string for an unrecognized status; the
/// poller maps it to `OPEN` and logs a warning, per the broker status mapping
/// contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BrokerOrderStatus {
    /// Broker is actively working the order.
    Open,
    /// Broker reports the order fully filled.
    Complete,
    /// Broker reports the order cancelled.
    Cancelled,
    /// Broker reports the order rejected.
    Rejected,
    /// An unrecognized broker status string.
    Unknown(String),
}

/// A single order's state as reported by the broker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerOrderView {
    /// Broker-assigned order identifier.
    pub broker_order_id: BrokerOrderId,
    /// Broker-native status.
    pub status: BrokerOrderStatus,
    /// Cumulative filled quantity.
    pub filled_quantity: Quantity,
    /// Volume-weighted average fill price, if any quantity has filled.
    pub average_price: Option<Money>,
    /// Broker-supplied status or rejection message.
    pub status_message: Option<String>,
    /// Per-charge breakdown, present once the order has filled.
    pub charges: Option<ChargeBreakdown>,
    /// Broker-assigned trade/fill identifier, for fill de-duplication.
    pub trade_id: Option<BrokerTradeId>,
}

/// A broker-reported position for one symbol.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BrokerPositionView {
    /// Signed quantity: positive long, negative short.
    pub quantity: Quantity,
    /// Volume-weighted average price.
    pub average_price: Money,
}

/// Broker port error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BrokerError {
    /// Transport/connection failure reaching the broker.
    #[error("broker connection error: {message}")]
    Connection {
        /// Error details.
        message: String,
    },

    /// The broker rejected the order at submission time.
    #[error("order rejected: {reason}")]
    Rejected {
        /// Rejection reason.
        reason: String,
    },

    /// No order exists under the given broker id.
    #[error("order not found: {broker_order_id}")]
    OrderNotFound {
        /// The missing broker order id.
        broker_order_id: String,
    },

    /// Cancel/modify attempted on an order already terminal at the broker.
    #[error("order is already terminal at the broker")]
    AlreadyTerminal,

    /// Any other broker-side failure.
    #[error("broker error: {message}")]
    Unknown {
        /// Error details.
        message: String,
    },
}

/// Port for broker interactions: placement, cancel/modify, and polling.
#[async_trait]
pub trait BrokerPort: Send + Sync {
    /// Submit a new order. Fails with [`BrokerError`] on transport or
    /// business rejection.
    async fn place(&self, params: PlaceOrderParams) -> Result<BrokerOrderId, BrokerError>;

    /// Cancel a working order. Fails if the order is already terminal at the broker.
    async fn cancel(&self, broker_order_id: &BrokerOrderId) -> Result<(), BrokerError>;

    /// Modify a working order. Fails if the order is already terminal at the broker.
    async fn modify(
        &self,
        broker_order_id: &BrokerOrderId,
        patch: ModifyOrderParams,
    ) -> Result<(), BrokerError>;

    /// List every order known to the broker.
    async fn list_orders(&self) -> Result<Vec<BrokerOrderView>, BrokerError>;

    /// List every open position the broker reports.
    async fn list_positions(&self) -> Result<HashMap<Symbol, BrokerPositionView>, BrokerError>;
}
