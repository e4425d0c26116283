//! End-to-end scenarios driving `OrderManager`/`PositionManager`/`RiskMonitor`
//! together against the in-memory store and the mock broker.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use rust_decimal_macros::dec;

use oms_core::application::{
    AlertRegistry, EventRegistry, OrderManager, PositionManager, PositionSnapshot,
    PreTradeValidator, RiskMonitor, RiskSnapshot,
};
use oms_core::config::{MonitorConfig, PollerConfig, ReconcilerConfig, RiskConfig};
use oms_core::domain::order::{CreateOrderCommand, OrderSide, OrderStatus, OrderType, Product, Validity};
use oms_core::domain::reconciliation::{IssueKind, Severity};
use oms_core::domain::risk::RiskAlert;
use oms_core::domain::shared::{Exchange, Money, Quantity, StrategyId, Symbol};
use oms_core::error::OmsError;
use oms_core::infrastructure::broker::MockBrokerPort;
use oms_core::infrastructure::persistence::InMemoryStore;
use oms_core::application::ports::BrokerPositionView;

const BALANCE: rust_decimal::Decimal = dec!(100_000);

fn fast_poller() -> PollerConfig {
    PollerConfig {
        interval_ms: 20,
        backoff_empty_ms: 20,
        backoff_error_ms: 20,
    }
}

fn fast_reconciler() -> ReconcilerConfig {
    ReconcilerConfig {
        interval_ms: 20,
        backoff_error_ms: 20,
    }
}

fn fast_monitor() -> MonitorConfig {
    MonitorConfig {
        cadence_ms: 20,
        ..MonitorConfig::default()
    }
}

fn command(symbol: &str, side: OrderSide, quantity: i64, price: rust_decimal::Decimal) -> CreateOrderCommand {
    CreateOrderCommand {
        symbol: Symbol::new(symbol),
        exchange: Exchange::Nse,
        side,
        quantity: Quantity::new(quantity),
        order_type: OrderType::Limit,
        price: Some(Money::new(price)),
        trigger_price: None,
        product: Product::Mis,
        validity: Validity::Day,
        strategy_id: StrategyId::new("momentum"),
        stop_loss: None,
        take_profit: None,
    }
}

struct Harness {
    store: Arc<InMemoryStore>,
    broker: Arc<MockBrokerPort>,
    order_manager: Arc<OrderManager>,
}

impl Harness {
    fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let broker = Arc::new(MockBrokerPort::new());
        let events = Arc::new(EventRegistry::new());
        let positions = Arc::new(PositionManager::new(store.clone(), events.clone()));
        let validator = Arc::new(PreTradeValidator::new(store.clone(), RiskConfig::default()));
        let order_manager = Arc::new(OrderManager::new(
            store.clone(),
            broker.clone(),
            Some(validator),
            positions,
            events,
            fast_poller(),
            fast_reconciler(),
        ));
        Self { store, broker, order_manager }
    }

    async fn settle(&self) {
        tokio::time::sleep(Duration::from_millis(80)).await;
    }
}

#[tokio::test]
async fn happy_path_buy_then_sell_realizes_profit() {
    let harness = Harness::new();
    harness.order_manager.start();

    let buy_id = harness
        .order_manager
        .place(
            command("RELIANCE", OrderSide::Buy, 10, dec!(2450.50))
                .tap_stop_loss(dec!(2430.00))
                .tap_take_profit(dec!(2491.50)),
            Money::new(BALANCE),
            None,
        )
        .await
        .unwrap();

    let buy_order = harness.store.get_order(buy_id).await.unwrap().unwrap();
    let buy_broker_id = buy_order.broker_order_id().unwrap().clone();
    harness.broker.fill(&buy_broker_id, Quantity::new(10), Money::new(dec!(2450.50)));
    harness.settle().await;

    let position = harness
        .store
        .all_open_positions()
        .await
        .unwrap()
        .into_iter()
        .find(|p| p.symbol() == &Symbol::new("RELIANCE"))
        .unwrap();
    assert_eq!(position.quantity(), Quantity::new(10));
    assert_eq!(position.average_price(), Money::new(dec!(2450.50)));

    let sell_id = harness
        .order_manager
        .place(
            command("RELIANCE", OrderSide::Sell, 10, dec!(2465.00)).tap_stop_loss(dec!(2480.00)),
            Money::new(BALANCE),
            None,
        )
        .await
        .unwrap();

    let sell_order = harness.store.get_order(sell_id).await.unwrap().unwrap();
    let sell_broker_id = sell_order.broker_order_id().unwrap().clone();
    harness.broker.fill(&sell_broker_id, Quantity::new(10), Money::new(dec!(2465.00)));
    harness.settle().await;

    let open_positions = harness.store.all_open_positions().await.unwrap();
    assert!(open_positions.iter().all(|p| p.symbol() != &Symbol::new("RELIANCE")));

    let realized = harness.store.today_realized_pnl().await.unwrap();
    assert_eq!(realized, Money::new(dec!(145.00)));

    harness.order_manager.stop().await;
}

#[tokio::test]
async fn reject_missing_stop_loss() {
    let harness = Harness::new();
    let cmd = command("TCS", OrderSide::Buy, 10, dec!(3500.00));

    let err = harness
        .order_manager
        .place(cmd, Money::new(BALANCE), None)
        .await
        .unwrap_err();

    match err {
        OmsError::OrderRejected { reason, failed_check } => {
            assert_eq!(reason, "Stop-loss is required");
            assert_eq!(failed_check, "stop_loss_required");
        }
        other => panic!("expected OrderRejected, got {other:?}"),
    }

    let orders = harness.store.today_orders().await.unwrap();
    let rejected = orders
        .into_iter()
        .find(|o| o.symbol() == &Symbol::new("TCS"))
        .unwrap();
    assert_eq!(rejected.status(), OrderStatus::Rejected);
}

#[tokio::test]
async fn reject_excessive_risk() {
    let harness = Harness::new();
    let cmd = command("INFY", OrderSide::Buy, 100, dec!(1450.00)).tap_stop_loss(dec!(1420.00));

    let err = harness
        .order_manager
        .place(cmd, Money::new(BALANCE), None)
        .await
        .unwrap_err();

    match err {
        OmsError::OrderRejected { failed_check, reason } => {
            assert_eq!(failed_check, "risk_per_trade");
            assert!(reason.contains("3000") || reason.contains("3,000"));
        }
        other => panic!("expected OrderRejected, got {other:?}"),
    }
}

#[tokio::test]
async fn daily_loss_breach_triggers_kill_switch_and_blocks_further_orders() {
    let harness = Harness::new();
    harness.order_manager.start();

    let buy_id = harness
        .order_manager
        .place(
            command("RELIANCE", OrderSide::Buy, 100, dec!(2500.00)).tap_stop_loss(dec!(2485.00)),
            Money::new(BALANCE),
            None,
        )
        .await
        .unwrap();
    let buy_order = harness.store.get_order(buy_id).await.unwrap().unwrap();
    harness.broker.fill(buy_order.broker_order_id().unwrap(), Quantity::new(100), Money::new(dec!(2500.00)));
    harness.settle().await;

    let sell_id = harness
        .order_manager
        .place(
            command("RELIANCE", OrderSide::Sell, 100, dec!(2430.00)).tap_stop_loss(dec!(2445.00)),
            Money::new(BALANCE),
            None,
        )
        .await
        .unwrap();
    let sell_order = harness.store.get_order(sell_id).await.unwrap().unwrap();
    harness.broker.fill(sell_order.broker_order_id().unwrap(), Quantity::new(100), Money::new(dec!(2430.00)));
    harness.settle().await;

    let realized = harness.store.today_realized_pnl().await.unwrap();
    assert_eq!(realized, Money::new(dec!(-7_000.00)));

    let alerts = Arc::new(AlertRegistry::new());
    let captured: Arc<Mutex<Vec<RiskAlert>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = captured.clone();
    alerts.register(move |alert: &RiskAlert| sink.lock().unwrap().push(alert.clone()));

    let monitor = Arc::new(
        RiskMonitor::new(harness.store.clone(), alerts, fast_monitor(), dec!(0.06), dec!(0.15))
            .await
            .unwrap(),
    );
    let store_for_snapshot = harness.store.clone();
    monitor.start(move || {
        let store = store_for_snapshot.clone();
        async move {
            let today_realized = store.today_realized_pnl().await?;
            Ok::<RiskSnapshot, oms_core::domain::store::StoreError>(RiskSnapshot {
                balance: Money::new(BALANCE),
                today_realized,
                positions: Vec::<(Symbol, PositionSnapshot)>::new(),
            })
        }
    });

    tokio::time::sleep(Duration::from_millis(80)).await;
    monitor.stop().await;

    assert!(monitor.is_kill_switch_active());
    assert!(harness.store.is_kill_switch_active().await.unwrap());
    let fired = captured.lock().unwrap();
    assert!(fired.iter().any(|a| a.kind == "kill_switch_triggered" && a.message.contains("7.00%")));
    drop(fired);

    let next_order = command("RELIANCE", OrderSide::Buy, 1, dec!(2400.00)).tap_stop_loss(dec!(2390.00));
    let err = harness
        .order_manager
        .place(next_order, Money::new(BALANCE), None)
        .await
        .unwrap_err();
    assert!(matches!(err, OmsError::OrderRejected { ref failed_check, .. } if failed_check == "circuit_breaker"));

    harness.order_manager.stop().await;
}

#[tokio::test]
async fn reconciler_logs_unknown_position_without_auto_adopting() {
    let harness = Harness::new();
    harness.order_manager.start();

    harness.broker.seed_position(
        Symbol::new("INFY"),
        BrokerPositionView {
            quantity: Quantity::new(20),
            average_price: Money::new(dec!(1800.00)),
        },
    );

    harness.settle().await;

    let issues = harness.store.unresolved_issues().await.unwrap();
    let issue = issues
        .iter()
        .find(|i| i.symbol() == &Symbol::new("INFY"))
        .expect("expected an unresolved UNKNOWN_POSITION issue for INFY");
    assert_eq!(issue.kind(), IssueKind::UnknownPosition);
    assert_eq!(issue.severity(), Severity::Critical);

    let internal = harness
        .store
        .all_open_positions()
        .await
        .unwrap()
        .into_iter()
        .find(|p| p.symbol() == &Symbol::new("INFY"));
    assert!(internal.is_none(), "unknown positions must not be auto-adopted");

    harness.order_manager.stop().await;
}

#[tokio::test]
async fn reconciler_repairs_quantity_mismatch() {
    let harness = Harness::new();
    harness.order_manager.start();

    let buy_id = harness
        .order_manager
        .place(
            command("RELIANCE", OrderSide::Buy, 10, dec!(2450.50)).tap_stop_loss(dec!(2430.00)),
            Money::new(BALANCE),
            None,
        )
        .await
        .unwrap();
    let buy_order = harness.store.get_order(buy_id).await.unwrap().unwrap();
    harness.broker.fill(buy_order.broker_order_id().unwrap(), Quantity::new(10), Money::new(dec!(2450.50)));
    harness.settle().await;

    harness.broker.seed_position(
        Symbol::new("RELIANCE"),
        BrokerPositionView {
            quantity: Quantity::new(8),
            average_price: Money::new(dec!(2450.50)),
        },
    );

    harness.settle().await;

    let issues = harness.store.unresolved_issues().await.unwrap();
    let issue = issues
        .iter()
        .find(|i| i.kind() == IssueKind::QuantityMismatch)
        .expect("expected a QUANTITY_MISMATCH issue");
    assert_eq!(issue.severity(), Severity::Critical);

    let position = harness
        .store
        .all_open_positions()
        .await
        .unwrap()
        .into_iter()
        .find(|p| p.symbol() == &Symbol::new("RELIANCE"))
        .unwrap();
    assert_eq!(position.quantity(), Quantity::new(8));

    harness.order_manager.stop().await;
}

trait CommandTap {
    fn tap_stop_loss(self, value: rust_decimal::Decimal) -> Self;
    fn tap_take_profit(self, value: rust_decimal::Decimal) -> Self;
}

impl CommandTap for CreateOrderCommand {
    fn tap_stop_loss(mut self, value: rust_decimal::Decimal) -> Self {
        self.stop_loss = Some(Money::new(value));
        self
    }

    fn tap_take_profit(mut self, value: rust_decimal::Decimal) -> Self {
        self.take_profit = Some(Money::new(value));
        self
    }
}
