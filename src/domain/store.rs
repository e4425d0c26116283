//! The `Store` port: the persistence abstraction every component depends on.
//!
//! `Store` is implemented by [`infrastructure::persistence::InMemoryStore`](crate::infrastructure::persistence::InMemoryStore)
//! for tests and local running, and is meant to be implemented again against a
//! durable backend without touching any caller.

use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::order::Order;
use crate::domain::position::Position;
use crate::domain::reconciliation::ReconciliationIssue;
use crate::domain::shared::{
    BrokerOrderId, Exchange, KillSwitchEventId, Money, OrderId, PositionId, ReconciliationIssueId,
    StrategyId, Symbol, TradeId,
};
use crate::domain::trade::Trade;

/// Errors surfaced by a `Store` implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The underlying backend rejected or failed a read/write.
    #[error("store backend error: {0}")]
    Backend(String),
    /// A transaction scope returned an error; the caller's error is preserved.
    #[error("transaction aborted: {0}")]
    TransactionAborted(String),
}

/// Boxed future returned by a transaction scope.
pub type TransactionFuture<'a> = Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + 'a>>;

/// A unit of work to run under [`Store::transaction`]'s scoped guard.
pub type TransactionScope<'a> = Box<dyn FnOnce() -> TransactionFuture<'a> + Send + 'a>;

/// The persistence port: orders, positions, trades, reconciliation log, and
/// kill-switch state, plus scoped transactions.
#[async_trait]
pub trait Store: Send + Sync {
    /// Allocate the next `OrderId`.
    async fn next_order_id(&self) -> Result<OrderId, StoreError>;

    /// Persist the full current state of an order (insert or overwrite).
    async fn save_order(&self, order: &Order) -> Result<(), StoreError>;

    /// Fetch an order by internal id.
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, StoreError>;

    /// Fetch an order by broker-assigned id.
    async fn get_order_by_broker_id(
        &self,
        broker_order_id: &BrokerOrderId,
    ) -> Result<Option<Order>, StoreError>;

    /// All orders not yet in a terminal status.
    async fn active_orders(&self) -> Result<Vec<Order>, StoreError>;

    /// All orders created on the current UTC calendar day.
    async fn today_orders(&self) -> Result<Vec<Order>, StoreError>;

    /// Allocate the next `PositionId`.
    async fn next_position_id(&self) -> Result<PositionId, StoreError>;

    /// Persist the full current state of a position (insert or overwrite).
    async fn save_position(&self, position: &Position) -> Result<(), StoreError>;

    /// Fetch the open position for a key, optionally narrowed to one strategy.
    async fn get_position(
        &self,
        symbol: &Symbol,
        exchange: Exchange,
        strategy_id: Option<&StrategyId>,
    ) -> Result<Option<Position>, StoreError>;

    /// Every currently open position.
    async fn all_open_positions(&self) -> Result<Vec<Position>, StoreError>;

    /// Count of currently open positions.
    async fn open_position_count(&self) -> Result<usize, StoreError>;

    /// Allocate the next `TradeId`.
    async fn next_trade_id(&self) -> Result<TradeId, StoreError>;

    /// Insert an immutable fill record.
    async fn create_trade(&self, trade: Trade) -> Result<TradeId, StoreError>;

    /// All trades recorded against an order.
    async fn trades_for_order(&self, order_id: OrderId) -> Result<Vec<Trade>, StoreError>;

    /// All trades executed on the current UTC calendar day.
    async fn today_trades(&self) -> Result<Vec<Trade>, StoreError>;

    /// Allocate the next `ReconciliationIssueId`.
    async fn next_reconciliation_issue_id(&self) -> Result<ReconciliationIssueId, StoreError>;

    /// Record a freshly detected drift between broker and internal state.
    async fn log_reconciliation_issue(
        &self,
        issue: ReconciliationIssue,
    ) -> Result<ReconciliationIssueId, StoreError>;

    /// Mark an issue resolved. Returns whether the row existed.
    async fn resolve_reconciliation_issue(
        &self,
        id: ReconciliationIssueId,
        resolution: &str,
        auto_fixed: bool,
    ) -> Result<bool, StoreError>;

    /// All issues not yet resolved.
    async fn unresolved_issues(&self) -> Result<Vec<ReconciliationIssue>, StoreError>;

    /// Sum of realized PnL across positions updated today.
    async fn today_realized_pnl(&self) -> Result<Money, StoreError>;

    /// Count of orders created today.
    async fn today_order_count(&self) -> Result<usize, StoreError>;

    /// Count of trades executed today.
    async fn today_trade_count(&self) -> Result<usize, StoreError>;

    /// `today_order_count / max(today_trade_count, 1)`, for the order-to-position ratio check.
    async fn order_to_trade_ratio(&self) -> Result<Decimal, StoreError>;

    /// Allocate the next `KillSwitchEventId`.
    async fn next_kill_switch_event_id(&self) -> Result<KillSwitchEventId, StoreError>;

    /// Whether the kill switch is currently active.
    async fn is_kill_switch_active(&self) -> Result<bool, StoreError>;

    /// Trigger the kill switch, idempotent per calendar day.
    async fn trigger_kill_switch(&self, reason: &str, by: &str) -> Result<KillSwitchEventId, StoreError>;

    /// Deactivate the active kill switch event, if any.
    async fn deactivate_kill_switch(&self, by: &str) -> Result<(), StoreError>;

    /// Run `scope` under a guard that serializes it against concurrent
    /// transactions, with the guard released on every exit path.
    async fn transaction<'a>(&'a self, scope: TransactionScope<'a>) -> Result<(), StoreError>;
}
