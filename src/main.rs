//! Order Management System Binary
//!
//! Wires the in-memory `Store`, the mock broker, and every application
//! component into a running process: the `OrderManager`'s poller and
//! reconciler loops, and the `RiskMonitor`'s cadence loop.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin oms-core
//! ```
//!
//! # Environment Variables
//!
//! - `OMS_CONFIG`: path to a YAML config file (default: `config.yaml`, missing is fine)
//! - `OMS_ACCOUNT_BALANCE`: starting account balance (default: `100000`)
//! - `RUST_LOG`: log level (default: info)

use std::sync::Arc;

use anyhow::Context;
use rust_decimal::Decimal;
use tokio::signal;

use oms_core::application::{
    AlertRegistry, EventRegistry, OrderManager, PositionManager, PositionSnapshot,
    PreTradeValidator, RiskMonitor, RiskSnapshot,
};
use oms_core::domain::order::OrderLifecycleEvent;
use oms_core::domain::reconciliation::Severity;
use oms_core::domain::risk::RiskAlert;
use oms_core::domain::shared::Money;
use oms_core::infrastructure::broker::MockBrokerPort;
use oms_core::infrastructure::persistence::InMemoryStore;
use oms_core::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if dotenvy::dotenv().is_err() {
        load_dotenv_from_ancestors();
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("oms_core=info".parse().context("invalid log directive")?),
        )
        .init();

    tracing::info!("starting OMS core");

    let config_path = std::env::var("OMS_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());
    let config = Config::load(&config_path).context("failed to load configuration")?;

    let account_balance: Decimal = std::env::var("OMS_ACCOUNT_BALANCE")
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or_else(|| Decimal::from(100_000));

    let store = Arc::new(InMemoryStore::new());
    let broker = Arc::new(MockBrokerPort::new());
    let events = Arc::new(EventRegistry::new());
    let alerts = Arc::new(AlertRegistry::new());

    events.register(log_lifecycle_event);
    alerts.register(log_risk_alert);

    let positions = Arc::new(PositionManager::new(store.clone(), events.clone()));
    let validator = Arc::new(PreTradeValidator::new(store.clone(), config.risk));

    let order_manager = Arc::new(OrderManager::new(
        store.clone(),
        broker.clone(),
        Some(validator),
        positions.clone(),
        events.clone(),
        config.poller,
        config.reconciler,
    ));
    order_manager.start();

    let risk_monitor = Arc::new(
        RiskMonitor::new(
            store.clone(),
            alerts.clone(),
            config.monitor,
            config.risk.max_daily_loss,
            config.risk.max_drawdown,
        )
        .await
        .context("failed to initialize risk monitor")?,
    );

    let snapshot_store = store.clone();
    risk_monitor.start(move || {
        let store = snapshot_store.clone();
        async move { build_risk_snapshot(&store, Money::new(account_balance)).await }
    });

    tracing::info!("OMS core ready");
    shutdown_signal().await;

    tracing::info!("shutting down background loops");
    order_manager.stop().await;
    risk_monitor.stop().await;
    tracing::info!("OMS core stopped");

    Ok(())
}

async fn build_risk_snapshot(
    store: &Arc<InMemoryStore>,
    balance: Money,
) -> Result<RiskSnapshot, oms_core::domain::store::StoreError> {
    let today_realized = store.today_realized_pnl().await?;
    let open_positions = store.all_open_positions().await?;
    let positions = open_positions
        .into_iter()
        .map(|position| {
            let snapshot = PositionSnapshot {
                realized: position.realized_pnl(),
                unrealized: position.unrealized_pnl(),
                has_stop_loss: position.stop_loss().is_some(),
            };
            (position.symbol().clone(), snapshot)
        })
        .collect();

    Ok(RiskSnapshot {
        balance,
        today_realized,
        positions,
    })
}

fn log_lifecycle_event(event: &OrderLifecycleEvent) {
    tracing::info!(kind = event.kind(), occurred_at = %event.occurred_at(), "order lifecycle event");
}

fn log_risk_alert(alert: &RiskAlert) {
    match alert.severity {
        Severity::Critical => tracing::error!(kind = %alert.kind, message = %alert.message, "risk alert"),
        Severity::Warning => tracing::warn!(kind = %alert.kind, message = %alert.message, "risk alert"),
        Severity::Info => tracing::info!(kind = %alert.kind, message = %alert.message, "risk alert"),
    }
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv_from_ancestors() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        #[allow(clippy::expect_used)]
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        #[allow(clippy::expect_used)]
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, initiating shutdown");
        }
    }
}
