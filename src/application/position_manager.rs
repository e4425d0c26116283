//! Average-cost position accounting, serialized per `(symbol, exchange, strategy_id)`.
//!
//! `PositionManager` is the only writer of `Position` rows. Callers funnel
//! every fill, mark, and reconciliation correction through it so that
//! concurrent fills for the same key are strictly ordered.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex as SyncMutex;
use tokio::sync::Mutex as AsyncMutex;

use crate::application::event_registry::EventRegistry;
use crate::domain::order::Order;
use crate::domain::order::OrderLifecycleEvent;
use crate::domain::position::{Position, PositionError};
use crate::domain::shared::{Exchange, Money, Quantity, StrategyId, Symbol, Timestamp};
use crate::domain::store::{Store, StoreError};

type PositionKey = (Symbol, Exchange, StrategyId);

/// Errors raised while applying a fill or a reconciliation correction.
#[derive(Debug, thiserror::Error)]
pub enum PositionManagerError {
    /// The underlying domain invariant was violated.
    #[error("position error: {0}")]
    Position(#[from] PositionError),
    /// The store could not read or persist the position.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Serializes position mutation per `(symbol, exchange, strategy_id)` key and
/// applies the average-cost accounting rules against the `Store`.
pub struct PositionManager {
    store: Arc<dyn Store>,
    events: Arc<EventRegistry>,
    locks: SyncMutex<HashMap<PositionKey, Arc<AsyncMutex<()>>>>,
}

impl PositionManager {
    /// Construct a manager over `store`, dispatching lifecycle events through `events`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, events: Arc<EventRegistry>) -> Self {
        Self {
            store,
            events,
            locks: SyncMutex::new(HashMap::new()),
        }
    }

    fn lock_for(&self, key: &PositionKey) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock();
        locks.entry(key.clone()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
    }

    /// Apply a fill of `qty` (always positive) at `price` against `order`'s position key.
    ///
    /// Dispatches to the same-direction-add, partial-close, exact-close, or
    /// reversal rule per the relationship between the fill's sign and the
    /// existing position's sign.
    pub async fn apply_fill(
        &self,
        order: &Order,
        qty: Quantity,
        price: Money,
    ) -> Result<(), PositionManagerError> {
        let key = (order.symbol().clone(), order.exchange(), order.strategy_id().clone());
        let guard = self.lock_for(&key);
        let _permit = guard.lock().await;

        let signed = Quantity::new(order.side().sign() * qty.value());

        let existing = self
            .store
            .get_position(&key.0, key.1, Some(&key.2))
            .await?;

        match existing {
            None => {
                let id = self.store.next_position_id().await?;
                let position = Position::open(
                    id,
                    key.0.clone(),
                    key.1,
                    key.2.clone(),
                    order.product(),
                    signed,
                    price,
                    order.id(),
                    order.stop_loss(),
                    order.take_profit(),
                );
                let position_id = id;
                self.store.save_position(&position).await?;
                self.events.dispatch(&OrderLifecycleEvent::PositionUpdated {
                    position_id,
                    symbol: key.0,
                    quantity: signed,
                    occurred_at: Timestamp::now(),
                });
                Ok(())
            }
            Some(mut position) => {
                let same_direction = (position.is_long() && order.side().sign() > 0)
                    || (!position.is_long() && order.side().sign() < 0);

                if same_direction {
                    position.add_same_direction(qty, price, order.id())?;
                    let position_id = position.id();
                    let quantity = position.quantity();
                    self.store.save_position(&position).await?;
                    self.events.dispatch(&OrderLifecycleEvent::PositionUpdated {
                        position_id,
                        symbol: key.0,
                        quantity,
                        occurred_at: Timestamp::now(),
                    });
                    return Ok(());
                }

                let open_magnitude = position.quantity().abs();

                if qty.value() < open_magnitude.value() {
                    position.reduce(qty, price, order.id())?;
                    let position_id = position.id();
                    let quantity = position.quantity();
                    self.store.save_position(&position).await?;
                    self.events.dispatch(&OrderLifecycleEvent::PositionUpdated {
                        position_id,
                        symbol: key.0,
                        quantity,
                        occurred_at: Timestamp::now(),
                    });
                } else if qty.value() == open_magnitude.value() {
                    position.reduce(qty, price, order.id())?;
                    let position_id = position.id();
                    let realized_pnl = position.realized_pnl();
                    self.store.save_position(&position).await?;
                    self.events.dispatch(&OrderLifecycleEvent::PositionClosed {
                        position_id,
                        symbol: key.0,
                        realized_pnl,
                        occurred_at: Timestamp::now(),
                    });
                } else {
                    position.reduce(open_magnitude, price, order.id())?;
                    let closed_id = position.id();
                    let realized_pnl = position.realized_pnl();
                    self.store.save_position(&position).await?;
                    self.events.dispatch(&OrderLifecycleEvent::PositionClosed {
                        position_id: closed_id,
                        symbol: key.0.clone(),
                        realized_pnl,
                        occurred_at: Timestamp::now(),
                    });

                    let remainder = Quantity::new(qty.value() - open_magnitude.value());
                    let remainder_signed = Quantity::new(order.side().sign() * remainder.value());
                    let id = self.store.next_position_id().await?;
                    let new_position = Position::open(
                        id,
                        key.0.clone(),
                        key.1,
                        key.2.clone(),
                        order.product(),
                        remainder_signed,
                        price,
                        order.id(),
                        order.stop_loss(),
                        order.take_profit(),
                    );
                    self.store.save_position(&new_position).await?;
                    self.events.dispatch(&OrderLifecycleEvent::PositionUpdated {
                        position_id: id,
                        symbol: key.0,
                        quantity: remainder_signed,
                        occurred_at: Timestamp::now(),
                    });
                }
                Ok(())
            }
        }
    }

    /// Mark the open position for `(symbol, exchange)` to `price`, recomputing
    /// unrealized PnL and drawdown watermarks. A no-op if no open position exists.
    ///
    /// When multiple strategies hold positions in the same symbol/exchange,
    /// every matching open position is marked.
    pub async fn mark(&self, symbol: &Symbol, exchange: Exchange, price: Money) -> Result<(), PositionManagerError> {
        for mut position in self.store.all_open_positions().await? {
            if position.symbol() == symbol && position.exchange() == exchange {
                position.mark(price);
                self.store.save_position(&position).await?;
            }
        }
        Ok(())
    }

    /// Mark every open position against a symbol → price snapshot.
    pub async fn mark_all(&self, prices: &HashMap<Symbol, Money>) -> Result<(), PositionManagerError> {
        for mut position in self.store.all_open_positions().await? {
            if let Some(price) = prices.get(position.symbol()) {
                position.mark(*price);
                self.store.save_position(&position).await?;
            }
        }
        Ok(())
    }

    /// Force the open position for `(symbol, exchange)` to `quantity`, used by the
    /// Reconciler when the broker's reported quantity disagrees with ours.
    pub async fn force_quantity(
        &self,
        symbol: &Symbol,
        exchange: Exchange,
        quantity: Quantity,
        reason: impl Into<String> + Clone,
    ) -> Result<(), PositionManagerError> {
        for mut position in self.store.all_open_positions().await? {
            if position.symbol() == symbol && position.exchange() == exchange {
                position.force_quantity(quantity, reason.clone());
                let position_id = position.id();
                let new_quantity = position.quantity();
                self.store.save_position(&position).await?;
                self.events.dispatch(&OrderLifecycleEvent::PositionUpdated {
                    position_id,
                    symbol: symbol.clone(),
                    quantity: new_quantity,
                    occurred_at: Timestamp::now(),
                });
            }
        }
        Ok(())
    }

    /// Force-close the open position for `(symbol, exchange)`, used by the
    /// Reconciler when the broker reports no corresponding position at all.
    pub async fn force_close(
        &self,
        symbol: &Symbol,
        exchange: Exchange,
        reason: impl Into<String> + Clone,
    ) -> Result<(), PositionManagerError> {
        for mut position in self.store.all_open_positions().await? {
            if position.symbol() == symbol && position.exchange() == exchange {
                position.force_close(reason.clone());
                let position_id = position.id();
                let realized_pnl = position.realized_pnl();
                self.store.save_position(&position).await?;
                self.events.dispatch(&OrderLifecycleEvent::PositionClosed {
                    position_id,
                    symbol: symbol.clone(),
                    realized_pnl,
                    occurred_at: Timestamp::now(),
                });
            }
        }
        Ok(())
    }
}
