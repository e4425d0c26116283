//! Owns the authoritative order lifecycle: placement, cancellation,
//! modification, and the two background loops that keep internal state in
//! sync with the broker.
//!
//! All broker calls funnel through here; nothing else in this crate talks to
//! a [`BrokerPort`] directly.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex as SyncMutex;
use rust_decimal::Decimal;
use tokio::sync::{Mutex as AsyncMutex, broadcast};
use tokio::task::JoinHandle;

use crate::application::event_registry::EventRegistry;
use crate::application::ports::{
    BrokerError, BrokerOrderStatus, BrokerOrderView, BrokerPort, ModifyOrderParams,
    PlaceOrderParams,
};
use crate::application::position_manager::PositionManager;
use crate::application::pre_trade_validator::PreTradeValidator;
use crate::config::{PollerConfig, ReconcilerConfig};
use crate::domain::order::value_objects::OrderStatus;
use crate::domain::order::{CreateOrderCommand, Order, ValidationReport};
use crate::domain::reconciliation::{IssueKind, ReconciliationIssue, Severity};
use crate::domain::shared::{Exchange, Money, OrderId, Quantity, Timestamp};
use crate::domain::trade::{ChargeBreakdown, Trade};
use crate::domain::store::Store;
use crate::error::OmsError;

/// Outcome of a single reconciliation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciliationSummary {
    /// Whether no drift was detected this pass.
    pub all_clear: bool,
    /// Number of quantity mismatches found and auto-repaired.
    pub mismatches: usize,
    /// Number of broker positions with no internal counterpart.
    pub unknown_positions: usize,
    /// When the pass completed.
    pub timestamp: Timestamp,
}

fn risk_snapshot(cmd: &CreateOrderCommand) -> (Option<Money>, Option<Decimal>) {
    let (Some(price), Some(stop_loss)) = (cmd.price, cmd.stop_loss) else {
        return (None, None);
    };
    let risk = (price.amount() - stop_loss.amount()).abs();
    let risk_amount = Some(Money::new(risk * Decimal::from(cmd.quantity.value())));
    let risk_reward_ratio = cmd.take_profit.map(|tp| {
        if risk.is_zero() {
            Decimal::ZERO
        } else {
            (tp.amount() - price.amount()).abs() / risk
        }
    });
    (risk_amount, risk_reward_ratio)
}

/// Orchestrates order placement/cancel/modify and the `OrderPoller` and
/// `Reconciler` background loops.
pub struct OrderManager {
    store: Arc<dyn Store>,
    broker: Arc<dyn BrokerPort>,
    validator: Option<Arc<PreTradeValidator>>,
    positions: Arc<PositionManager>,
    events: Arc<EventRegistry>,
    poller_config: PollerConfig,
    reconciler_config: ReconcilerConfig,
    order_locks: SyncMutex<HashMap<i64, Arc<AsyncMutex<()>>>>,
    shutdown_tx: broadcast::Sender<()>,
    tasks: SyncMutex<Vec<JoinHandle<()>>>,
}

impl OrderManager {
    /// Construct a manager. Pass `validator = None` to skip pre-trade validation
    /// (used in tests exercising the broker/store plumbing in isolation).
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn Store>,
        broker: Arc<dyn BrokerPort>,
        validator: Option<Arc<PreTradeValidator>>,
        positions: Arc<PositionManager>,
        events: Arc<EventRegistry>,
        poller_config: PollerConfig,
        reconciler_config: ReconcilerConfig,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(4);
        Self {
            store,
            broker,
            validator,
            positions,
            events,
            poller_config,
            reconciler_config,
            order_locks: SyncMutex::new(HashMap::new()),
            shutdown_tx,
            tasks: SyncMutex::new(Vec::new()),
        }
    }

    fn lock_for(&self, order_id: OrderId) -> Arc<AsyncMutex<()>> {
        let mut locks = self.order_locks.lock();
        locks
            .entry(order_id.value())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Validate, persist, and submit a new order.
    ///
    /// # Errors
    ///
    /// Returns [`OmsError::OrderRejected`] if validation fails (the order is
    /// still persisted, `REJECTED`), [`OmsError::SubmissionFailed`] if the
    /// broker refuses or the transport fails (persisted `FAILED`), or a
    /// [`OmsError::StoreError`] on a persistence failure.
    pub async fn place(
        &self,
        cmd: CreateOrderCommand,
        account_balance: Money,
        ltp: Option<Money>,
    ) -> Result<OrderId, OmsError> {
        if let Err(err) = cmd.validate() {
            return self.reject_new(cmd, ValidationReport::failed("command_validation", err.to_string())).await;
        }

        let report = if let Some(validator) = &self.validator {
            validator.validate(&cmd, account_balance, ltp).await?
        } else {
            ValidationReport::passed()
        };

        if !report.is_valid {
            return self.reject_new(cmd, report).await;
        }

        let (risk_amount, risk_reward_ratio) = risk_snapshot(&cmd);
        let id = self.store.next_order_id().await?;
        let mut order = Order::new(id, cmd.clone(), risk_amount, risk_reward_ratio, Some(report));
        self.store.save_order(&order).await?;

        let params = PlaceOrderParams {
            symbol: cmd.symbol,
            exchange: cmd.exchange,
            side: cmd.side,
            quantity: cmd.quantity,
            order_type: cmd.order_type,
            product: cmd.product,
            validity: cmd.validity,
            price: cmd.price,
            trigger_price: cmd.trigger_price,
        };

        match self.broker.place(params).await {
            Ok(broker_order_id) => {
                order.mark_submitted(broker_order_id)?;
                self.store.save_order(&order).await?;
                self.dispatch_events(&mut order);
                Ok(order.id())
            }
            Err(err) => {
                order.mark_failed(err.to_string())?;
                self.store.save_order(&order).await?;
                Err(OmsError::SubmissionFailed { cause: err.to_string() })
            }
        }
    }

    async fn reject_new(&self, cmd: CreateOrderCommand, report: ValidationReport) -> Result<OrderId, OmsError> {
        let id = self.store.next_order_id().await?;
        let reason = report.reason.clone().unwrap_or_default();
        let failed_check = report.failed_check.clone().unwrap_or_default();
        let mut order = Order::new(id, cmd, None, None, Some(report));
        order.reject(reason.clone())?;
        self.store.save_order(&order).await?;
        self.dispatch_events(&mut order);
        Err(OmsError::OrderRejected { reason, failed_check })
    }

    fn dispatch_events(&self, order: &mut Order) {
        for event in order.drain_events() {
            self.events.dispatch(&event);
        }
    }

    /// Cancel a working order.
    ///
    /// # Errors
    ///
    /// [`OmsError::NotFound`] if no such order exists, [`OmsError::NotCancellable`]
    /// if its status is not `SUBMITTED`/`OPEN`, or a broker/store error.
    pub async fn cancel(&self, order_id: OrderId) -> Result<(), OmsError> {
        let lock = self.lock_for(order_id);
        let _guard = lock.lock().await;

        let Some(mut order) = self.store.get_order(order_id).await? else {
            return Err(OmsError::NotFound);
        };
        if !matches!(order.status(), OrderStatus::Submitted | OrderStatus::Open) {
            return Err(OmsError::NotCancellable { status: order.status() });
        }
        let Some(broker_order_id) = order.broker_order_id().cloned() else {
            return Err(OmsError::NotCancellable { status: order.status() });
        };

        self.broker.cancel(&broker_order_id).await?;
        order.cancel()?;
        self.store.save_order(&order).await?;
        self.dispatch_events(&mut order);
        Ok(())
    }

    /// Modify a working order's price, quantity, or trigger price.
    ///
    /// # Errors
    ///
    /// Same preconditions as [`Self::cancel`].
    pub async fn modify(&self, order_id: OrderId, patch: ModifyOrderParams) -> Result<(), OmsError> {
        let lock = self.lock_for(order_id);
        let _guard = lock.lock().await;

        let Some(mut order) = self.store.get_order(order_id).await? else {
            return Err(OmsError::NotFound);
        };
        if !matches!(order.status(), OrderStatus::Submitted | OrderStatus::Open) {
            return Err(OmsError::NotModifiable { status: order.status() });
        }
        let Some(broker_order_id) = order.broker_order_id().cloned() else {
            return Err(OmsError::NotModifiable { status: order.status() });
        };

        self.broker.modify(&broker_order_id, patch.clone()).await?;
        order.apply_modify(patch.price, patch.quantity, patch.trigger_price)?;
        self.store.save_order(&order).await?;
        Ok(())
    }

    /// Spawn the `OrderPoller` and `Reconciler` background loops.
    pub fn start(self: &Arc<Self>) {
        let poller = {
            let mgr = Arc::clone(self);
            let shutdown_rx = mgr.shutdown_tx.subscribe();
            tokio::spawn(async move { mgr.run_poller(shutdown_rx).await })
        };
        let reconciler = {
            let mgr = Arc::clone(self);
            let shutdown_rx = mgr.shutdown_tx.subscribe();
            tokio::spawn(async move { mgr.run_reconciler(shutdown_rx).await })
        };
        self.tasks.lock().extend([poller, reconciler]);
    }

    /// Broadcast shutdown and await both background loops, mirroring the
    /// connection-monitor shutdown idiom used elsewhere in this crate.
    pub async fn stop(&self) {
        let _ = self.shutdown_tx.send(());
        let handles: Vec<_> = self.tasks.lock().drain(..).collect();
        for handle in handles {
            let _ = handle.await;
        }
    }

    async fn run_poller(self: Arc<Self>, mut shutdown_rx: broadcast::Receiver<()>) {
        tracing::info!(interval_ms = self.poller_config.interval_ms, "OrderPoller started");
        let mut delay = Duration::from_millis(self.poller_config.interval_ms);
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("OrderPoller shutting down");
                    break;
                }
                () = tokio::time::sleep(delay) => {
                    match self.poll_once().await {
                        Ok(true) => delay = Duration::from_millis(self.poller_config.interval_ms),
                        Ok(false) => delay = Duration::from_millis(self.poller_config.backoff_empty_ms),
                        Err(err) => {
                            tracing::error!(error = %err, "OrderPoller cycle failed");
                            delay = Duration::from_millis(self.poller_config.backoff_error_ms);
                        }
                    }
                }
            }
        }
    }

    async fn run_reconciler(self: Arc<Self>, mut shutdown_rx: broadcast::Receiver<()>) {
        tracing::info!(interval_ms = self.reconciler_config.interval_ms, "Reconciler started");
        let mut delay = Duration::from_millis(self.reconciler_config.interval_ms);
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Reconciler shutting down");
                    break;
                }
                () = tokio::time::sleep(delay) => {
                    match self.reconcile_once().await {
                        Ok(summary) => {
                            if !summary.all_clear {
                                tracing::warn!(
                                    mismatches = summary.mismatches,
                                    unknown_positions = summary.unknown_positions,
                                    "Reconciliation pass found drift"
                                );
                            }
                            delay = Duration::from_millis(self.reconciler_config.interval_ms);
                        }
                        Err(err) => {
                            tracing::error!(error = %err, "Reconciler cycle failed");
                            delay = Duration::from_millis(self.reconciler_config.backoff_error_ms);
                        }
                    }
                }
            }
        }
    }

    /// Run one poll cycle. Returns `Ok(true)` if there were active orders to
    /// check, `Ok(false)` if the active set was empty (signals the caller to
    /// back off).
    async fn poll_once(&self) -> Result<bool, OmsError> {
        let active = self.store.active_orders().await?;
        if active.is_empty() {
            return Ok(false);
        }

        let views = self.broker.list_orders().await.map_err(|err| OmsError::SubmissionFailed { cause: err.to_string() })?;
        let by_broker_id: HashMap<_, _> = views
            .iter()
            .map(|view| (view.broker_order_id.clone(), view))
            .collect();

        for mut order in active {
            let Some(broker_order_id) = order.broker_order_id().cloned() else {
                continue;
            };
            let Some(view) = by_broker_id.get(&broker_order_id) else {
                continue;
            };
            let lock = self.lock_for(order.id());
            let _guard = lock.lock().await;
            self.apply_broker_view(&mut order, view).await?;
        }

        Ok(true)
    }

    async fn apply_broker_view(&self, order: &mut Order, view: &BrokerOrderView) -> Result<(), OmsError> {
        match &view.status {
            BrokerOrderStatus::Open => {
                if order.status() == OrderStatus::Submitted {
                    order.mark_open()?;
                }
                self.apply_fill_update(order, view).await?;
                self.store.save_order(order).await?;
                self.dispatch_events(order);
            }
            BrokerOrderStatus::Complete => {
                self.apply_fill_update(order, view).await?;
                self.store.save_order(order).await?;
                self.dispatch_events(order);
            }
            BrokerOrderStatus::Cancelled => {
                if !order.is_terminal() {
                    order.cancel()?;
                    self.store.save_order(order).await?;
                    self.dispatch_events(order);
                }
            }
            BrokerOrderStatus::Rejected => {
                if !order.is_terminal() {
                    order.reject(view.status_message.clone().unwrap_or_else(|| "rejected by broker".to_string()))?;
                    self.store.save_order(order).await?;
                    self.dispatch_events(order);
                }
            }
            BrokerOrderStatus::Unknown(raw) => {
                tracing::warn!(status = %raw, order_id = %order.id(), "unrecognized broker status, treating as OPEN");
                if order.status() == OrderStatus::Submitted {
                    order.mark_open()?;
                    self.store.save_order(order).await?;
                    self.dispatch_events(order);
                }
            }
        }
        Ok(())
    }

    async fn apply_fill_update(&self, order: &mut Order, view: &BrokerOrderView) -> Result<(), OmsError> {
        let Some(new_average_price) = view.average_price else {
            return Ok(());
        };
        if view.filled_quantity.value() <= 0 {
            return Ok(());
        }

        let prior_cumulative = order.filled_quantity();
        let prior_average = order.average_price();

        let changed = order.apply_fill(view.filled_quantity, new_average_price)?;
        if !changed {
            return Ok(());
        }

        let delta = view.filled_quantity.value() - prior_cumulative.value();
        if delta <= 0 {
            return Ok(());
        }
        let delta_qty = Quantity::new(delta);

        let marginal_price = match prior_average {
            Some(prior_average) if prior_cumulative.value() > 0 => {
                let numerator = Decimal::from(view.filled_quantity.value()) * new_average_price.amount()
                    - Decimal::from(prior_cumulative.value()) * prior_average.amount();
                Money::new(numerator / Decimal::from(delta))
            }
            _ => new_average_price,
        };

        let trade_id = self.store.next_trade_id().await?;
        let charges = view.charges.unwrap_or_default();
        let trade = Trade::new(
            trade_id,
            order.id(),
            None,
            view.trade_id.clone(),
            order.symbol().clone(),
            order.exchange(),
            order.side(),
            delta_qty,
            marginal_price,
            charges,
            Timestamp::now(),
        );
        self.store.create_trade(trade).await?;
        self.positions.apply_fill(order, delta_qty, marginal_price).await.map_err(|err| {
            OmsError::ReconciliationError { cause: err.to_string() }
        })?;

        Ok(())
    }

    /// Run one reconciliation pass: compare broker positions against internal
    /// state, logging and auto-repairing drift.
    ///
    /// # Errors
    ///
    /// [`OmsError::ReconciliationError`] if the broker's position list could
    /// not be retrieved, or a store error.
    pub async fn reconcile_once(&self) -> Result<ReconciliationSummary, OmsError> {
        let broker_positions = self
            .broker
            .list_positions()
            .await
            .map_err(|err| OmsError::ReconciliationError { cause: err.to_string() })?;
        let internal_positions = self.store.all_open_positions().await?;

        let mut mismatches = 0usize;
        let mut unknown = 0usize;

        for (symbol, view) in &broker_positions {
            let internal = internal_positions.iter().find(|position| position.symbol() == symbol);
            match internal {
                None => {
                    unknown += 1;
                    let id = self.store.next_reconciliation_issue_id().await?;
                    let issue = ReconciliationIssue::new(
                        id,
                        symbol.clone(),
                        Exchange::default_for_reconciliation(),
                        IssueKind::UnknownPosition,
                        Severity::Critical,
                        None,
                        Some(view.quantity),
                        None,
                        Some(view.average_price),
                    );
                    self.store.log_reconciliation_issue(issue).await?;
                    tracing::error!(symbol = %symbol, "UNKNOWN_POSITION detected during reconciliation");
                }
                Some(position) => {
                    if position.quantity() != view.quantity {
                        mismatches += 1;
                        let id = self.store.next_reconciliation_issue_id().await?;
                        let issue = ReconciliationIssue::new(
                            id,
                            symbol.clone(),
                            position.exchange(),
                            IssueKind::QuantityMismatch,
                            Severity::Critical,
                            Some(position.quantity()),
                            Some(view.quantity),
                            Some(position.average_price()),
                            Some(view.average_price),
                        );
                        self.store.log_reconciliation_issue(issue).await?;
                        tracing::error!(
                            symbol = %symbol,
                            internal = position.quantity().value(),
                            broker = view.quantity.value(),
                            "QUANTITY_MISMATCH detected during reconciliation"
                        );
                        self.positions
                            .force_quantity(symbol, position.exchange(), view.quantity, "RECONCILIATION_FIX")
                            .await
                            .map_err(|err| OmsError::ReconciliationError { cause: err.to_string() })?;
                    }
                }
            }
        }

        for position in &internal_positions {
            if !broker_positions.contains_key(position.symbol()) {
                let id = self.store.next_reconciliation_issue_id().await?;
                let issue = ReconciliationIssue::new(
                    id,
                    position.symbol().clone(),
                    position.exchange(),
                    IssueKind::PhantomPosition,
                    Severity::Critical,
                    Some(position.quantity()),
                    None,
                    Some(position.average_price()),
                    None,
                );
                self.store.log_reconciliation_issue(issue).await?;
                tracing::error!(symbol = %position.symbol(), "PHANTOM_POSITION detected during reconciliation");
                self.positions
                    .force_close(position.symbol(), position.exchange(), "RECONCILIATION_FIX")
                    .await
                    .map_err(|err| OmsError::ReconciliationError { cause: err.to_string() })?;
            }
        }

        Ok(ReconciliationSummary {
            all_clear: mismatches == 0 && unknown == 0,
            mismatches,
            unknown_positions: unknown,
            timestamp: Timestamp::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{OrderSide, OrderType, Product, Validity};
    use crate::domain::shared::{Quantity, StrategyId, Symbol};
    use crate::infrastructure::broker::mock::MockBrokerPort;
    use crate::infrastructure::persistence::InMemoryStore;
    use rust_decimal_macros::dec;

    fn command() -> CreateOrderCommand {
        CreateOrderCommand {
            symbol: Symbol::new("RELIANCE"),
            exchange: Exchange::Nse,
            side: OrderSide::Buy,
            quantity: Quantity::new(10),
            order_type: OrderType::Limit,
            price: Some(Money::new(dec!(2450.50))),
            trigger_price: None,
            product: Product::Mis,
            validity: Validity::Day,
            strategy_id: StrategyId::new("strat-1"),
            stop_loss: Some(Money::new(dec!(2430.00))),
            take_profit: Some(Money::new(dec!(2491.00))),
        }
    }

    fn manager() -> (OrderManager, Arc<InMemoryStore>, Arc<MockBrokerPort>) {
        let store = Arc::new(InMemoryStore::new());
        let broker = Arc::new(MockBrokerPort::new());
        let events = Arc::new(EventRegistry::new());
        let positions = Arc::new(PositionManager::new(store.clone(), events.clone()));
        let mgr = OrderManager::new(
            store.clone(),
            broker.clone(),
            None,
            positions,
            events,
            PollerConfig::default(),
            ReconcilerConfig::default(),
        );
        (mgr, store, broker)
    }

    #[tokio::test]
    async fn place_without_validator_submits_and_marks_pending_then_submitted() {
        let (mgr, store, _broker) = manager();
        let id = mgr.place(command(), Money::new(dec!(100_000)), None).await.unwrap();
        let order = store.get_order(id).await.unwrap().unwrap();
        assert_eq!(order.status(), OrderStatus::Submitted);
    }

    #[tokio::test]
    async fn cancel_requires_active_status() {
        let (mgr, _store, _broker) = manager();
        let id = mgr.place(command(), Money::new(dec!(100_000)), None).await.unwrap();
        mgr.cancel(id).await.unwrap();
        let err = mgr.cancel(id).await.unwrap_err();
        assert!(matches!(err, OmsError::NotCancellable { .. }));
    }

    #[tokio::test]
    async fn poller_applies_fill_and_opens_position() {
        let (mgr, store, broker) = manager();
        let id = mgr.place(command(), Money::new(dec!(100_000)), None).await.unwrap();
        let order = store.get_order(id).await.unwrap().unwrap();
        let broker_order_id = order.broker_order_id().unwrap().clone();

        broker.fill(&broker_order_id, Quantity::new(10), Money::new(dec!(2450.50)));
        let had_active = mgr.poll_once().await.unwrap();
        assert!(had_active);

        let order = store.get_order(id).await.unwrap().unwrap();
        assert_eq!(order.status(), OrderStatus::Filled);

        let positions = store.all_open_positions().await.unwrap();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].quantity(), Quantity::new(10));
    }

    #[tokio::test]
    async fn reconcile_logs_unknown_position() {
        let (mgr, _store, broker) = manager();
        broker.seed_position(
            Symbol::new("INFY"),
            crate::application::ports::BrokerPositionView {
                quantity: Quantity::new(20),
                average_price: Money::new(dec!(1800.00)),
            },
        );
        let summary = mgr.reconcile_once().await.unwrap();
        assert!(!summary.all_clear);
        assert_eq!(summary.unknown_positions, 1);
    }

    #[tokio::test]
    async fn reconcile_repairs_quantity_mismatch() {
        let (mgr, store, broker) = manager();
        let id = mgr.place(command(), Money::new(dec!(100_000)), None).await.unwrap();
        let order = store.get_order(id).await.unwrap().unwrap();
        let broker_order_id = order.broker_order_id().unwrap().clone();
        broker.fill(&broker_order_id, Quantity::new(10), Money::new(dec!(2450.50)));
        mgr.poll_once().await.unwrap();

        broker.seed_position(
            Symbol::new("RELIANCE"),
            crate::application::ports::BrokerPositionView {
                quantity: Quantity::new(8),
                average_price: Money::new(dec!(2450.50)),
            },
        );

        let summary = mgr.reconcile_once().await.unwrap();
        assert_eq!(summary.mismatches, 1);

        let positions = store.all_open_positions().await.unwrap();
        assert_eq!(positions[0].quantity(), Quantity::new(8));
    }
}
