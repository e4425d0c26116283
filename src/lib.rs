// Allow unwrap/expect in tests - tests should panic on unexpected errors
// Allow test-specific patterns and pedantic lints in test code
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Order Management System - Rust Core Library
//!
//! A deterministic order management system for an equities trading bot:
//! pre-trade risk validation, persistence, broker submission, lifecycle
//! tracking, fill accounting, average-cost position maintenance, broker
//! reconciliation, and a continuous risk monitor backed by a persistent
//! kill switch.
//!
//! # Architecture (Clean Architecture + DDD + Hexagonal)
//!
//! ## Layers (inside → outside)
//!
//! - **Domain**: Core business logic (aggregates, value objects, domain events)
//!   - `order`: the Order aggregate, its status lifecycle, and lifecycle events
//!   - `position`: average-cost position accounting and realized-PnL rules
//!   - `trade`: immutable fill records and charge breakdowns
//!   - `reconciliation`: broker/internal position drift records
//!   - `risk`: the kill switch and ephemeral risk alerts
//!
//! - **Application**: orchestration over the domain and the driven ports
//!   - `ports`: `BrokerPort` and its request/response types
//!   - `event_registry`: the shared callback-dispatch pattern
//!   - `pre_trade_validator`: the ten ordered pre-trade risk checks
//!   - `position_manager`: the only writer of `Position` rows
//!   - `order_manager`: order placement/cancel/modify, the poller, the reconciler
//!   - `risk_monitor`: the account/position risk cadence loop and kill switch
//!
//! - **Infrastructure**: Adapters (implementations)
//!   - `persistence`: `Store` implementations (in-memory today)
//!   - `broker`: `BrokerPort` implementations (a programmable mock today)

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

/// Layered configuration for risk limits, store backend, and background-loop cadence.
pub mod config;
/// Domain layer - Core business logic with no external dependencies.
pub mod domain;
/// The top-level error type surfaced at the OMS core boundary.
pub mod error;
/// Application layer - orchestration and port definitions.
pub mod application;
/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

pub use config::Config;
pub use error::OmsError;

pub use application::{
    AlertRegistry, EventRegistry, OrderManager, PositionManager, PreTradeValidator, RiskMonitor,
};
pub use domain::order::{CreateOrderCommand, Order, OrderSide, OrderStatus, OrderType};
pub use domain::position::Position;
pub use domain::shared::{Exchange, Money, OrderId, PositionId, Quantity, Symbol};
pub use infrastructure::broker::MockBrokerPort;
pub use infrastructure::persistence::InMemoryStore;
