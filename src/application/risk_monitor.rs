//! Continuous account and position risk evaluation. Owns the kill switch,
//! the crate's single global circuit breaker.
//!
//! The monitor's in-memory `kill_switch_active` flag is the fast read path
//! for [`crate::application::pre_trade_validator::PreTradeValidator`]'s
//! circuit-breaker check; the Store remains the tiebreaker across restarts.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex as SyncMutex;
use rust_decimal::Decimal;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::application::event_registry::AlertRegistry;
use crate::config::MonitorConfig;
use crate::domain::reconciliation::Severity;
use crate::domain::risk::RiskAlert;
use crate::domain::shared::{Money, Symbol};
use crate::domain::store::{Store, StoreError};

/// A point-in-time price/unrealized-PnL snapshot for one open position,
/// supplied by the caller's account/price provider each tick.
#[derive(Debug, Clone, Copy)]
pub struct PositionSnapshot {
    /// This position's realized PnL.
    pub realized: Money,
    /// This position's unrealized PnL at the current mark.
    pub unrealized: Money,
    /// Whether the position carries a stop-loss.
    pub has_stop_loss: bool,
}

/// Everything the monitor needs to evaluate one cycle: the account balance
/// and a mark-to-market snapshot of every open position.
#[derive(Debug, Clone)]
pub struct RiskSnapshot {
    /// Current account balance (excluding unrealized PnL).
    pub balance: Money,
    /// Today's realized PnL across all positions.
    pub today_realized: Money,
    /// Per-position snapshots, keyed by symbol for alert detail.
    pub positions: Vec<(Symbol, PositionSnapshot)>,
}

impl RiskSnapshot {
    fn total_unrealized(&self) -> Money {
        self.positions
            .iter()
            .fold(Money::ZERO, |acc, (_, p)| acc + p.unrealized)
    }
}

/// Evaluates [`RiskSnapshot`]s on a cadence, maintaining the account
/// high-water mark and the kill switch.
pub struct RiskMonitor {
    store: Arc<dyn Store>,
    alerts: Arc<AlertRegistry>,
    config: MonitorConfig,
    max_daily_loss: Decimal,
    max_drawdown: Decimal,
    account_peak: SyncMutex<Money>,
    kill_switch_active: AtomicBool,
    shutdown_tx: broadcast::Sender<()>,
    task: SyncMutex<Option<JoinHandle<()>>>,
}

impl RiskMonitor {
    /// Construct a monitor, reading the kill switch's initial state from `store`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the initial kill-switch read fails.
    pub async fn new(
        store: Arc<dyn Store>,
        alerts: Arc<AlertRegistry>,
        config: MonitorConfig,
        max_daily_loss: Decimal,
        max_drawdown: Decimal,
    ) -> Result<Self, StoreError> {
        let active = store.is_kill_switch_active().await?;
        let (shutdown_tx, _) = broadcast::channel(4);
        Ok(Self {
            store,
            alerts,
            config,
            max_daily_loss,
            max_drawdown,
            account_peak: SyncMutex::new(Money::ZERO),
            kill_switch_active: AtomicBool::new(active),
            shutdown_tx,
            task: SyncMutex::new(None),
        })
    }

    /// Whether the kill switch is currently active, per the in-process flag.
    #[must_use]
    pub fn is_kill_switch_active(&self) -> bool {
        self.kill_switch_active.load(Ordering::SeqCst)
    }

    /// Trigger the kill switch: persist, latch the in-memory flag, and alert.
    /// A no-op beyond re-emitting the alert if already active.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if persisting the event fails.
    pub async fn trigger_kill_switch(&self, reason: &str) -> Result<(), StoreError> {
        self.store.trigger_kill_switch(reason, "risk_monitor").await?;
        self.kill_switch_active.store(true, Ordering::SeqCst);
        self.alerts.dispatch(
            &RiskAlert::new(Severity::Critical, "kill_switch_triggered", reason.to_string())
                .with_detail("reason", reason),
        );
        tracing::error!(reason, "kill switch triggered");
        Ok(())
    }

    /// Deactivate the kill switch on behalf of `by` (an operator identity).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if persisting the deactivation fails.
    pub async fn deactivate(&self, by: &str) -> Result<(), StoreError> {
        self.store.deactivate_kill_switch(by).await?;
        self.kill_switch_active.store(false, Ordering::SeqCst);
        self.alerts.dispatch(&RiskAlert::new(
            Severity::Warning,
            "kill_switch_deactivated",
            format!("kill switch deactivated by {by}"),
        ));
        tracing::warn!(by, "kill switch deactivated");
        Ok(())
    }

    /// Evaluate one cycle against `snapshot`. A no-op, beyond peak tracking,
    /// if the kill switch is already active.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if a triggered kill switch could not be persisted.
    pub async fn tick(&self, snapshot: &RiskSnapshot) -> Result<(), StoreError> {
        let equity = snapshot.balance + snapshot.today_realized + snapshot.total_unrealized();
        let peak = {
            let mut peak = self.account_peak.lock();
            if equity > *peak {
                *peak = equity;
            }
            *peak
        };

        if self.is_kill_switch_active() {
            return Ok(());
        }

        let balance = snapshot.balance.amount();
        let total_pnl = snapshot.today_realized + snapshot.total_unrealized();

        let daily_floor = -(self.max_daily_loss * balance);
        if total_pnl.amount() < daily_floor {
            let pct = if balance.is_zero() {
                Decimal::ZERO
            } else {
                (total_pnl.amount().abs() / balance) * Decimal::from(100)
            };
            self.trigger_kill_switch(&format!(
                "daily loss {total_pnl} breaches {:.2}% of balance (limit {pct_limit:.2}%)",
                pct,
                pct_limit = self.max_daily_loss * Decimal::from(100)
            ))
            .await?;
            return Ok(());
        }

        if !peak.is_zero() {
            let drawdown_fraction = (peak - equity).amount() / peak.amount();
            if drawdown_fraction > self.max_drawdown {
                self.trigger_kill_switch(&format!(
                    "drawdown {:.2}% from peak {peak} exceeds max_drawdown {:.2}%",
                    drawdown_fraction * Decimal::from(100),
                    self.max_drawdown * Decimal::from(100)
                ))
                .await?;
                return Ok(());
            }

            if drawdown_fraction > self.max_drawdown * Decimal::new(8, 1) {
                self.alerts.dispatch(&RiskAlert::new(
                    Severity::Warning,
                    "drawdown_approaching_limit",
                    format!("drawdown {:.2}% is approaching max_drawdown", drawdown_fraction * Decimal::from(100)),
                ));
            }
        }

        let warn_floor = daily_floor * Decimal::new(8, 1);
        if total_pnl.amount() < warn_floor {
            self.alerts.dispatch(&RiskAlert::new(
                Severity::Warning,
                "daily_loss_approaching_limit",
                format!("today's pnl {total_pnl} is approaching the daily loss limit"),
            ));
        }

        for (symbol, position) in &snapshot.positions {
            let position_pnl = position.realized + position.unrealized;
            let position_floor = -(self.config.max_position_loss_pct * balance);
            if position_pnl.amount() < position_floor {
                self.alerts.dispatch(
                    &RiskAlert::new(
                        Severity::Critical,
                        "position_loss_limit",
                        format!("position {symbol} pnl {position_pnl} breaches per-position loss limit"),
                    )
                    .with_detail("symbol", symbol.as_str()),
                );
            }
            if !position.has_stop_loss {
                self.alerts.dispatch(
                    &RiskAlert::new(Severity::Warning, "position_missing_stop_loss", format!("position {symbol} has no stop-loss"))
                        .with_detail("symbol", symbol.as_str()),
                );
            }
        }

        Ok(())
    }

    /// Spawn the cadence loop, calling `snapshot_fn` each tick to obtain the
    /// current account/position state.
    pub fn start<F, Fut>(self: &Arc<Self>, snapshot_fn: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<RiskSnapshot, StoreError>> + Send,
    {
        let monitor = Arc::clone(self);
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let handle = tokio::spawn(async move {
            tracing::info!(cadence_ms = monitor.config.cadence_ms, "RiskMonitor started");
            let mut interval = tokio::time::interval(Duration::from_millis(monitor.config.cadence_ms));
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        tracing::info!("RiskMonitor shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        match snapshot_fn().await {
                            Ok(snapshot) => {
                                if let Err(err) = monitor.tick(&snapshot).await {
                                    tracing::error!(error = %err, "RiskMonitor cycle failed to persist");
                                }
                            }
                            Err(err) => tracing::error!(error = %err, "RiskMonitor snapshot provider failed"),
                        }
                    }
                }
            }
        });
        *self.task.lock() = Some(handle);
    }

    /// Broadcast shutdown and await the cadence loop.
    pub async fn stop(&self) {
        let _ = self.shutdown_tx.send(());
        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::persistence::InMemoryStore;
    use rust_decimal_macros::dec;

    fn snapshot(balance: Money, realized: Money) -> RiskSnapshot {
        RiskSnapshot {
            balance,
            today_realized: realized,
            positions: Vec::new(),
        }
    }

    async fn monitor() -> (RiskMonitor, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let alerts = Arc::new(AlertRegistry::new());
        let monitor = RiskMonitor::new(store.clone(), alerts, MonitorConfig::default(), dec!(0.06), dec!(0.15))
            .await
            .unwrap();
        (monitor, store)
    }

    #[tokio::test]
    async fn starts_inactive_when_store_has_no_event() {
        let (monitor, _store) = monitor().await;
        assert!(!monitor.is_kill_switch_active());
    }

    #[tokio::test]
    async fn daily_loss_breach_triggers_kill_switch() {
        let (monitor, store) = monitor().await;
        let snap = snapshot(Money::new(dec!(100_000)), Money::new(dec!(-7_000)));
        monitor.tick(&snap).await.unwrap();
        assert!(monitor.is_kill_switch_active());
        assert!(store.is_kill_switch_active().await.unwrap());
    }

    #[tokio::test]
    async fn within_limits_does_not_trigger() {
        let (monitor, _store) = monitor().await;
        let snap = snapshot(Money::new(dec!(100_000)), Money::new(dec!(-1_000)));
        monitor.tick(&snap).await.unwrap();
        assert!(!monitor.is_kill_switch_active());
    }

    #[tokio::test]
    async fn deactivate_clears_flag() {
        let (monitor, _store) = monitor().await;
        monitor.trigger_kill_switch("test").await.unwrap();
        assert!(monitor.is_kill_switch_active());
        monitor.deactivate("ops").await.unwrap();
        assert!(!monitor.is_kill_switch_active());
    }

    #[tokio::test]
    async fn once_active_further_ticks_are_noop() {
        let (monitor, _store) = monitor().await;
        monitor.trigger_kill_switch("test").await.unwrap();
        let snap = snapshot(Money::new(dec!(100_000)), Money::ZERO);
        monitor.tick(&snap).await.unwrap();
        assert!(monitor.is_kill_switch_active());
    }
}
