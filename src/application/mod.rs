//! Application Layer
//!
//! Orchestrates the domain layer against the `Store` and `BrokerPort` ports:
//!
//! - [`ports`]: driven-port interfaces (`BrokerPort` and its DTOs)
//! - [`event_registry`]: the shared callback-dispatch pattern for lifecycle
//!   events and risk alerts
//! - [`pre_trade_validator`]: the ten ordered pre-trade risk checks
//! - [`position_manager`]: average-cost position accounting, serialized per key
//! - [`order_manager`]: order placement/cancel/modify plus the poller and
//!   reconciler background loops
//! - [`risk_monitor`]: the account/position risk cadence loop and kill switch

pub mod event_registry;
pub mod order_manager;
pub mod ports;
pub mod position_manager;
pub mod pre_trade_validator;
pub mod risk_monitor;

pub use event_registry::{AlertRegistry, EventRegistry};
pub use order_manager::{OrderManager, ReconciliationSummary};
pub use ports::{
    BrokerError, BrokerOrderStatus, BrokerOrderView, BrokerPort, BrokerPositionView,
    ModifyOrderParams, PlaceOrderParams,
};
pub use position_manager::{PositionManager, PositionManagerError};
pub use pre_trade_validator::PreTradeValidator;
pub use risk_monitor::{PositionSnapshot, RiskMonitor, RiskSnapshot};
