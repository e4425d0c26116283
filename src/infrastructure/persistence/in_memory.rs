//! In-memory `Store` implementation for testing, local running, and as a
//! template for a durable backend.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rust_decimal::Decimal;

use crate::domain::order::Order;
use crate::domain::position::Position;
use crate::domain::reconciliation::ReconciliationIssue;
use crate::domain::risk::KillSwitchEvent;
use crate::domain::shared::{
    BrokerOrderId, Exchange, IdSequence, KillSwitchEventId, Money, OrderId, PositionId,
    ReconciliationIssueId, StrategyId, Symbol, TradeId,
};
use crate::domain::store::{Store, StoreError, TransactionScope};
use crate::domain::trade::Trade;

#[derive(Default)]
struct Inner {
    orders: HashMap<i64, Order>,
    positions: HashMap<i64, Position>,
    trades: HashMap<i64, Trade>,
    reconciliation_issues: HashMap<i64, ReconciliationIssue>,
    kill_switch_events: Vec<KillSwitchEvent>,
}

/// A single in-process, lock-protected `Store`.
///
/// Suitable for tests, local runs, and as a template for a durable backend.
/// Not for production use against a real brokerage.
pub struct InMemoryStore {
    inner: Mutex<Inner>,
    order_ids: IdSequence,
    position_ids: IdSequence,
    trade_ids: IdSequence,
    issue_ids: IdSequence,
    kill_switch_ids: IdSequence,
    tx_lock: tokio::sync::Mutex<()>,
}

impl InMemoryStore {
    /// Construct an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            order_ids: IdSequence::new(),
            position_ids: IdSequence::new(),
            trade_ids: IdSequence::new(),
            issue_ids: IdSequence::new(),
            kill_switch_ids: IdSequence::new(),
            tx_lock: tokio::sync::Mutex::new(()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn is_today(ts: crate::domain::shared::Timestamp) -> bool {
    ts.as_datetime().date_naive() == Utc::now().date_naive()
}

#[async_trait]
impl Store for InMemoryStore {
    async fn next_order_id(&self) -> Result<OrderId, StoreError> {
        Ok(self.order_ids.next().into())
    }

    async fn save_order(&self, order: &Order) -> Result<(), StoreError> {
        self.inner.lock().orders.insert(order.id().value(), order.clone());
        Ok(())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        Ok(self.inner.lock().orders.get(&id.value()).cloned())
    }

    async fn get_order_by_broker_id(
        &self,
        broker_order_id: &BrokerOrderId,
    ) -> Result<Option<Order>, StoreError> {
        Ok(self
            .inner
            .lock()
            .orders
            .values()
            .find(|o| o.broker_order_id() == Some(broker_order_id))
            .cloned())
    }

    async fn active_orders(&self) -> Result<Vec<Order>, StoreError> {
        Ok(self
            .inner
            .lock()
            .orders
            .values()
            .filter(|o| !o.is_terminal())
            .cloned()
            .collect())
    }

    async fn today_orders(&self) -> Result<Vec<Order>, StoreError> {
        Ok(self
            .inner
            .lock()
            .orders
            .values()
            .filter(|o| is_today(o.created_at()))
            .cloned()
            .collect())
    }

    async fn next_position_id(&self) -> Result<PositionId, StoreError> {
        Ok(self.position_ids.next().into())
    }

    async fn save_position(&self, position: &Position) -> Result<(), StoreError> {
        self.inner
            .lock()
            .positions
            .insert(position.id().value(), position.clone());
        Ok(())
    }

    async fn get_position(
        &self,
        symbol: &Symbol,
        exchange: Exchange,
        strategy_id: Option<&StrategyId>,
    ) -> Result<Option<Position>, StoreError> {
        Ok(self
            .inner
            .lock()
            .positions
            .values()
            .find(|p| {
                !p.is_closed()
                    && p.symbol() == symbol
                    && p.exchange() == exchange
                    && strategy_id.is_none_or(|s| p.strategy_id() == s)
            })
            .cloned())
    }

    async fn all_open_positions(&self) -> Result<Vec<Position>, StoreError> {
        Ok(self
            .inner
            .lock()
            .positions
            .values()
            .filter(|p| !p.is_closed())
            .cloned()
            .collect())
    }

    async fn open_position_count(&self) -> Result<usize, StoreError> {
        Ok(self.inner.lock().positions.values().filter(|p| !p.is_closed()).count())
    }

    async fn next_trade_id(&self) -> Result<TradeId, StoreError> {
        Ok(self.trade_ids.next().into())
    }

    async fn create_trade(&self, trade: Trade) -> Result<TradeId, StoreError> {
        let id = trade.id();
        self.inner.lock().trades.insert(id.value(), trade);
        Ok(id)
    }

    async fn trades_for_order(&self, order_id: OrderId) -> Result<Vec<Trade>, StoreError> {
        Ok(self
            .inner
            .lock()
            .trades
            .values()
            .filter(|t| t.order_id() == order_id)
            .cloned()
            .collect())
    }

    async fn today_trades(&self) -> Result<Vec<Trade>, StoreError> {
        Ok(self
            .inner
            .lock()
            .trades
            .values()
            .filter(|t| is_today(t.executed_at()))
            .cloned()
            .collect())
    }

    async fn next_reconciliation_issue_id(&self) -> Result<ReconciliationIssueId, StoreError> {
        Ok(self.issue_ids.next().into())
    }

    async fn log_reconciliation_issue(
        &self,
        issue: ReconciliationIssue,
    ) -> Result<ReconciliationIssueId, StoreError> {
        let id = issue.id();
        self.inner.lock().reconciliation_issues.insert(id.value(), issue);
        Ok(id)
    }

    async fn resolve_reconciliation_issue(
        &self,
        id: ReconciliationIssueId,
        resolution: &str,
        auto_fixed: bool,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock();
        match inner.reconciliation_issues.get_mut(&id.value()) {
            Some(issue) => {
                issue.resolve(resolution, auto_fixed);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn unresolved_issues(&self) -> Result<Vec<ReconciliationIssue>, StoreError> {
        Ok(self
            .inner
            .lock()
            .reconciliation_issues
            .values()
            .filter(|i| !i.is_resolved())
            .cloned()
            .collect())
    }

    async fn today_realized_pnl(&self) -> Result<Money, StoreError> {
        let inner = self.inner.lock();
        Ok(inner
            .positions
            .values()
            .filter(|p| is_today(p.updated_at()))
            .fold(Money::ZERO, |acc, p| acc + p.realized_pnl()))
    }

    async fn today_order_count(&self) -> Result<usize, StoreError> {
        let inner = self.inner.lock();
        Ok(inner.orders.values().filter(|o| is_today(o.created_at())).count())
    }

    async fn today_trade_count(&self) -> Result<usize, StoreError> {
        let inner = self.inner.lock();
        Ok(inner.trades.values().filter(|t| is_today(t.executed_at())).count())
    }

    async fn order_to_trade_ratio(&self) -> Result<Decimal, StoreError> {
        let orders = self.today_order_count().await?;
        let trades = self.today_trade_count().await?.max(1);
        Ok(Decimal::from(orders) / Decimal::from(trades))
    }

    async fn next_kill_switch_event_id(&self) -> Result<KillSwitchEventId, StoreError> {
        Ok(self.kill_switch_ids.next().into())
    }

    async fn is_kill_switch_active(&self) -> Result<bool, StoreError> {
        Ok(self
            .inner
            .lock()
            .kill_switch_events
            .iter()
            .any(KillSwitchEvent::is_active))
    }

    async fn trigger_kill_switch(&self, reason: &str, by: &str) -> Result<KillSwitchEventId, StoreError> {
        {
            let inner = self.inner.lock();
            if let Some(active) = inner.kill_switch_events.iter().find(|e| e.is_active()) {
                return Ok(active.id());
            }
        }
        let id = self.kill_switch_ids.next().into();
        let event = KillSwitchEvent::trigger(id, reason, by);
        self.inner.lock().kill_switch_events.push(event);
        Ok(id)
    }

    async fn deactivate_kill_switch(&self, by: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        if let Some(active) = inner.kill_switch_events.iter_mut().find(|e| e.is_active()) {
            active.deactivate(by);
        }
        Ok(())
    }

    async fn transaction<'a>(&'a self, scope: TransactionScope<'a>) -> Result<(), StoreError> {
        let _guard = self.tx_lock.lock().await;
        scope().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::value_objects::{OrderSide, OrderType, Product, Validity};
    use crate::domain::order::{CreateOrderCommand, OrderStatus};
    use crate::domain::shared::Quantity;

    fn command() -> CreateOrderCommand {
        CreateOrderCommand {
            symbol: Symbol::new("RELIANCE"),
            exchange: Exchange::Nse,
            side: OrderSide::Buy,
            quantity: Quantity::new(10),
            order_type: OrderType::Market,
            price: None,
            trigger_price: None,
            product: Product::Mis,
            validity: Validity::Day,
            strategy_id: StrategyId::new("momentum"),
            stop_loss: None,
            take_profit: None,
        }
    }

    #[tokio::test]
    async fn save_and_get_order() {
        let store = InMemoryStore::new();
        let id = store.next_order_id().await.unwrap();
        let order = Order::new(id, command(), None, None, None);
        store.save_order(&order).await.unwrap();

        let found = store.get_order(id).await.unwrap().unwrap();
        assert_eq!(found.status(), OrderStatus::Pending);
    }

    #[tokio::test]
    async fn active_orders_excludes_terminal() {
        let store = InMemoryStore::new();
        let id1 = store.next_order_id().await.unwrap();
        let mut order1 = Order::new(id1, command(), None, None, None);
        order1.reject("bad").unwrap();
        store.save_order(&order1).await.unwrap();

        let id2 = store.next_order_id().await.unwrap();
        let order2 = Order::new(id2, command(), None, None, None);
        store.save_order(&order2).await.unwrap();

        let active = store.active_orders().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id(), id2);
    }

    #[tokio::test]
    async fn get_order_by_broker_id() {
        let store = InMemoryStore::new();
        let id = store.next_order_id().await.unwrap();
        let mut order = Order::new(id, command(), None, None, None);
        order.mark_submitted(BrokerOrderId::new("brk-1")).unwrap();
        store.save_order(&order).await.unwrap();

        let found = store
            .get_order_by_broker_id(&BrokerOrderId::new("brk-1"))
            .await
            .unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn kill_switch_trigger_is_idempotent_same_day() {
        let store = InMemoryStore::new();
        assert!(!store.is_kill_switch_active().await.unwrap());

        let first = store.trigger_kill_switch("daily loss", "risk_monitor").await.unwrap();
        let second = store.trigger_kill_switch("daily loss again", "risk_monitor").await.unwrap();
        assert_eq!(first, second);
        assert!(store.is_kill_switch_active().await.unwrap());

        store.deactivate_kill_switch("ops").await.unwrap();
        assert!(!store.is_kill_switch_active().await.unwrap());
    }

    #[tokio::test]
    async fn position_round_trip() {
        let store = InMemoryStore::new();
        let id = store.next_position_id().await.unwrap();
        let pos = Position::open(
            id,
            Symbol::new("RELIANCE"),
            Exchange::Nse,
            StrategyId::new("momentum"),
            Product::Mis,
            Quantity::new(10),
            Money::usd(100.0),
            OrderId::new(1),
            None,
            None,
        );
        store.save_position(&pos).await.unwrap();

        let found = store
            .get_position(&Symbol::new("RELIANCE"), Exchange::Nse, None)
            .await
            .unwrap();
        assert!(found.is_some());
        assert_eq!(store.open_position_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn transaction_runs_scope_once() {
        let store = InMemoryStore::new();
        let id = store.next_order_id().await.unwrap();
        store
            .transaction(Box::new(|| {
                Box::pin(async {
                    let order = Order::new(id, command(), None, None, None);
                    store.save_order(&order).await
                })
            }))
            .await
            .unwrap();

        assert!(store.get_order(id).await.unwrap().is_some());
    }
}
