//! The Position aggregate: average-cost accounting for one open or closed position.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::order::value_objects::Product;
use crate::domain::position::errors::PositionError;
use crate::domain::shared::{Exchange, Money, OrderId, PositionId, Quantity, StrategyId, Symbol, Timestamp};

/// A position keyed by `(symbol, exchange, strategy_id)`; at most one open
/// position exists per key at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    id: PositionId,
    symbol: Symbol,
    exchange: Exchange,
    strategy_id: StrategyId,
    product: Product,
    quantity: Quantity,
    average_price: Money,
    realized_pnl: Money,
    unrealized_pnl: Money,
    stop_loss: Option<Money>,
    take_profit: Option<Money>,
    highest_price: Option<Money>,
    lowest_price: Option<Money>,
    max_drawdown: Option<Money>,
    entry_order_ids: Vec<OrderId>,
    exit_order_ids: Vec<OrderId>,
    force_reason: Option<String>,
    opened_at: Timestamp,
    updated_at: Timestamp,
    closed_at: Option<Timestamp>,
}

impl Position {
    /// Open a new position from the first fill on a `(symbol, exchange, strategy_id)` key.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn open(
        id: PositionId,
        symbol: Symbol,
        exchange: Exchange,
        strategy_id: StrategyId,
        product: Product,
        signed_quantity: Quantity,
        price: Money,
        entry_order_id: OrderId,
        stop_loss: Option<Money>,
        take_profit: Option<Money>,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id,
            symbol,
            exchange,
            strategy_id,
            product,
            quantity: signed_quantity,
            average_price: price,
            realized_pnl: Money::ZERO,
            unrealized_pnl: Money::ZERO,
            stop_loss,
            take_profit,
            highest_price: Some(price),
            lowest_price: Some(price),
            max_drawdown: None,
            entry_order_ids: vec![entry_order_id],
            exit_order_ids: Vec::new(),
            force_reason: None,
            opened_at: now,
            updated_at: now,
            closed_at: None,
        }
    }

    /// Position identifier.
    #[must_use]
    pub const fn id(&self) -> PositionId {
        self.id
    }

    /// Instrument symbol.
    #[must_use]
    pub const fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Exchange.
    #[must_use]
    pub const fn exchange(&self) -> Exchange {
        self.exchange
    }

    /// Owning strategy.
    #[must_use]
    pub const fn strategy_id(&self) -> &StrategyId {
        &self.strategy_id
    }

    /// Margin product.
    #[must_use]
    pub const fn product(&self) -> Product {
        self.product
    }

    /// Signed quantity: positive long, negative short, zero closed.
    #[must_use]
    pub const fn quantity(&self) -> Quantity {
        self.quantity
    }

    /// Volume-weighted average entry price.
    #[must_use]
    pub const fn average_price(&self) -> Money {
        self.average_price
    }

    /// Cumulative realized PnL across all reducing/closing fills.
    #[must_use]
    pub const fn realized_pnl(&self) -> Money {
        self.realized_pnl
    }

    /// Unrealized PnL as of the last mark.
    #[must_use]
    pub const fn unrealized_pnl(&self) -> Money {
        self.unrealized_pnl
    }

    /// Stop-loss, if any.
    #[must_use]
    pub const fn stop_loss(&self) -> Option<Money> {
        self.stop_loss
    }

    /// Take-profit, if any.
    #[must_use]
    pub const fn take_profit(&self) -> Option<Money> {
        self.take_profit
    }

    /// Highest mark price observed.
    #[must_use]
    pub const fn highest_price(&self) -> Option<Money> {
        self.highest_price
    }

    /// Lowest mark price observed.
    #[must_use]
    pub const fn lowest_price(&self) -> Option<Money> {
        self.lowest_price
    }

    /// Largest adverse excursion observed since open.
    #[must_use]
    pub const fn max_drawdown(&self) -> Option<Money> {
        self.max_drawdown
    }

    /// Orders that opened or added to this position.
    #[must_use]
    pub fn entry_order_ids(&self) -> &[OrderId] {
        &self.entry_order_ids
    }

    /// Orders that reduced or closed this position.
    #[must_use]
    pub fn exit_order_ids(&self) -> &[OrderId] {
        &self.exit_order_ids
    }

    /// Reason recorded by the reconciler for a forced mutation, if any.
    #[must_use]
    pub fn force_reason(&self) -> Option<&str> {
        self.force_reason.as_deref()
    }

    /// When the position was opened.
    #[must_use]
    pub const fn opened_at(&self) -> Timestamp {
        self.opened_at
    }

    /// When the position was last updated.
    #[must_use]
    pub const fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    /// When the position was closed, if it is.
    #[must_use]
    pub const fn closed_at(&self) -> Option<Timestamp> {
        self.closed_at
    }

    /// Whether the position is closed.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed_at.is_some()
    }

    /// Whether the position is long.
    #[must_use]
    pub const fn is_long(&self) -> bool {
        self.quantity.is_positive()
    }

    fn ensure_open(&self) -> Result<(), PositionError> {
        if self.is_closed() {
            return Err(PositionError::Closed {
                symbol: self.symbol.clone(),
                exchange: self.exchange,
                strategy_id: self.strategy_id.clone(),
            });
        }
        Ok(())
    }

    /// Add to the position in the same direction it is already held,
    /// recomputing the cost-weighted average price.
    ///
    /// # Errors
    ///
    /// Returns [`PositionError::Closed`] if already closed, or
    /// [`PositionError::InvalidQuantity`] if `qty` is not positive.
    pub fn add_same_direction(
        &mut self,
        qty: Quantity,
        price: Money,
        order_id: OrderId,
    ) -> Result<(), PositionError> {
        self.ensure_open()?;
        if qty.value() <= 0 {
            return Err(PositionError::InvalidQuantity {
                quantity: qty.value(),
            });
        }

        let existing_abs = Decimal::from(self.quantity.value().abs());
        let added = Decimal::from(qty.value());
        let numerator = existing_abs * self.average_price.amount() + added * price.amount();
        let denominator = existing_abs + added;
        self.average_price = Money::new(numerator / denominator);

        let sign = if self.is_long() { 1 } else { -1 };
        self.quantity = Quantity::new(self.quantity.value() + sign * qty.value());
        self.entry_order_ids.push(order_id);
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Reduce the position by `qty` (a positive magnitude) against an
    /// opposite-direction fill, realizing PnL on the reduced portion. If
    /// `qty` equals the full open quantity the position closes.
    ///
    /// # Errors
    ///
    /// Returns [`PositionError::Closed`] if already closed,
    /// [`PositionError::InvalidQuantity`] if `qty` is not positive, or
    /// [`PositionError::ReduceExceedsQuantity`] if `qty` exceeds the open quantity.
    pub fn reduce(
        &mut self,
        qty: Quantity,
        price: Money,
        order_id: OrderId,
    ) -> Result<Money, PositionError> {
        self.ensure_open()?;
        if qty.value() <= 0 {
            return Err(PositionError::InvalidQuantity {
                quantity: qty.value(),
            });
        }
        let open_abs = self.quantity.value().abs();
        if qty.value() > open_abs {
            return Err(PositionError::ReduceExceedsQuantity {
                fill_quantity: qty.value(),
                open_quantity: open_abs,
            });
        }

        let qty_d = Decimal::from(qty.value());
        let delta = if self.is_long() {
            Money::new(qty_d * (price.amount() - self.average_price.amount()))
        } else {
            Money::new(qty_d * (self.average_price.amount() - price.amount()))
        };
        self.realized_pnl = self.realized_pnl + delta;

        let sign = if self.is_long() { -1 } else { 1 };
        self.quantity = Quantity::new(self.quantity.value() + sign * qty.value());
        self.exit_order_ids.push(order_id);

        let now = Timestamp::now();
        self.updated_at = now;
        if self.quantity.is_zero() {
            self.closed_at = Some(now);
        }
        Ok(delta)
    }

    /// Mark the position to a current price, updating unrealized PnL,
    /// high/low watermarks, and max drawdown.
    pub fn mark(&mut self, price: Money) {
        if self.is_closed() {
            return;
        }
        let qty_abs = Decimal::from(self.quantity.value().abs());
        self.unrealized_pnl = if self.is_long() {
            Money::new(qty_abs * (price.amount() - self.average_price.amount()))
        } else {
            Money::new(qty_abs * (self.average_price.amount() - price.amount()))
        };

        self.highest_price = Some(match self.highest_price {
            Some(h) if h.amount() >= price.amount() => h,
            _ => price,
        });
        self.lowest_price = Some(match self.lowest_price {
            Some(l) if l.amount() <= price.amount() => l,
            _ => price,
        });

        let drawdown = if self.is_long() {
            self.highest_price.map(|h| h - price)
        } else {
            self.lowest_price.map(|l| price - l)
        };
        if let Some(drawdown) = drawdown {
            self.max_drawdown = Some(match self.max_drawdown {
                Some(existing) if existing.amount() >= drawdown.amount() => existing,
                _ => drawdown,
            });
        }
        self.updated_at = Timestamp::now();
    }

    /// Force the internal quantity to match the broker's reported quantity,
    /// used only by the reconciler. Zeroing the quantity closes the position.
    pub fn force_quantity(&mut self, quantity: Quantity, reason: impl Into<String>) {
        let now = Timestamp::now();
        self.quantity = quantity;
        self.force_reason = Some(reason.into());
        self.updated_at = now;
        if quantity.is_zero() {
            self.closed_at = Some(now);
        }
    }

    /// Force-close a position the broker no longer reports, used only by the reconciler.
    pub fn force_close(&mut self, reason: impl Into<String>) {
        let now = Timestamp::now();
        self.quantity = Quantity::ZERO;
        self.force_reason = Some(reason.into());
        self.updated_at = now;
        self.closed_at = Some(now);
    }
}
