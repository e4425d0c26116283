//! Application Ports (Driven)
//!
//! Ports define interfaces for interacting with external systems.
//! - **Driven Ports** (Secondary/Outbound): how our application uses the brokerage.
//!
//! The inbound side of this application has no driver port of its own: it is
//! driven by background loops (`OrderPoller`, `Reconciler`, `RiskMonitor`)
//! started from `main`, not by an inbound request/response boundary.

mod broker_port;

pub use broker_port::{
    BrokerError, BrokerOrderStatus, BrokerOrderView, BrokerPort, BrokerPositionView,
    ModifyOrderParams, PlaceOrderParams,
};
