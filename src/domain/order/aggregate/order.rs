//! The Order aggregate: a single equities order and its lifecycle.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::order::errors::OrderError;
use crate::domain::order::events::OrderLifecycleEvent;
use crate::domain::order::services::OrderStateMachine;
use crate::domain::order::value_objects::{
    OrderSide, OrderStatus, OrderType, Product, ValidationReport, Validity,
};
use crate::domain::shared::{BrokerOrderId, Exchange, Money, OrderId, Quantity, StrategyId, Symbol, Timestamp};

/// The intrinsic parameters of a new order, supplied by the caller of
/// `OrderManager::place`.
#[derive(Debug, Clone)]
pub struct CreateOrderCommand {
    /// Instrument symbol.
    pub symbol: Symbol,
    /// Exchange the order trades on.
    pub exchange: Exchange,
    /// Buy or sell.
    pub side: OrderSide,
    /// Order quantity; must be positive.
    pub quantity: Quantity,
    /// Execution style.
    pub order_type: OrderType,
    /// Limit price, required for LIMIT/SL orders.
    pub price: Option<Money>,
    /// Trigger price, required for SL/SL_M orders.
    pub trigger_price: Option<Money>,
    /// Margin product.
    pub product: Product,
    /// Time-in-force.
    pub validity: Validity,
    /// Originating strategy.
    pub strategy_id: StrategyId,
    /// Stop-loss level, if any.
    pub stop_loss: Option<Money>,
    /// Take-profit level, if any.
    pub take_profit: Option<Money>,
}

impl CreateOrderCommand {
    /// Validate the command's intrinsic invariants, independent of account
    /// state or risk configuration (those are the pre-trade validator's job).
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::InvalidParameters`] if quantity is not
    /// positive, or if a required price field is missing for the order
    /// type.
    pub fn validate(&self) -> Result<(), OrderError> {
        if self.quantity.value() <= 0 {
            return Err(OrderError::InvalidParameters {
                field: "quantity".to_string(),
                message: "order quantity must be positive".to_string(),
            });
        }

        if self.order_type.requires_price() && self.price.is_none() {
            return Err(OrderError::InvalidParameters {
                field: "price".to_string(),
                message: format!("{} orders require a price", self.order_type),
            });
        }

        if self.order_type.requires_trigger_price() && self.trigger_price.is_none() {
            return Err(OrderError::InvalidParameters {
                field: "trigger_price".to_string(),
                message: format!("{} orders require a trigger_price", self.order_type),
            });
        }

        Ok(())
    }
}

/// A single order and its full lifecycle state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    broker_order_id: Option<BrokerOrderId>,
    strategy_id: StrategyId,
    symbol: Symbol,
    exchange: Exchange,
    side: OrderSide,
    quantity: Quantity,
    order_type: OrderType,
    price: Option<Money>,
    trigger_price: Option<Money>,
    product: Product,
    validity: Validity,
    stop_loss: Option<Money>,
    take_profit: Option<Money>,
    risk_amount: Option<Money>,
    risk_reward_ratio: Option<Decimal>,
    status: OrderStatus,
    status_message: Option<String>,
    filled_quantity: Quantity,
    average_price: Option<Money>,
    validation_report: Option<ValidationReport>,
    created_at: Timestamp,
    submitted_at: Option<Timestamp>,
    updated_at: Option<Timestamp>,
    filled_at: Option<Timestamp>,
    cancelled_at: Option<Timestamp>,
    #[serde(skip)]
    events: Vec<OrderLifecycleEvent>,
}

impl Order {
    /// Construct a new order in `PENDING` status.
    ///
    /// `id` is assigned by the Store before construction, matching the
    /// `create_order` contract which always materializes a row first.
    #[must_use]
    pub fn new(
        id: OrderId,
        cmd: CreateOrderCommand,
        risk_amount: Option<Money>,
        risk_reward_ratio: Option<Decimal>,
        validation_report: Option<ValidationReport>,
    ) -> Self {
        Self {
            id,
            broker_order_id: None,
            strategy_id: cmd.strategy_id,
            symbol: cmd.symbol,
            exchange: cmd.exchange,
            side: cmd.side,
            quantity: cmd.quantity,
            order_type: cmd.order_type,
            price: cmd.price,
            trigger_price: cmd.trigger_price,
            product: cmd.product,
            validity: cmd.validity,
            stop_loss: cmd.stop_loss,
            take_profit: cmd.take_profit,
            risk_amount,
            risk_reward_ratio,
            status: OrderStatus::Pending,
            status_message: None,
            filled_quantity: Quantity::ZERO,
            average_price: None,
            validation_report,
            created_at: Timestamp::now(),
            submitted_at: None,
            updated_at: None,
            filled_at: None,
            cancelled_at: None,
            events: Vec::new(),
        }
    }

    /// Rebuild an order from persisted state, with no event generation.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn reconstitute(
        id: OrderId,
        broker_order_id: Option<BrokerOrderId>,
        strategy_id: StrategyId,
        symbol: Symbol,
        exchange: Exchange,
        side: OrderSide,
        quantity: Quantity,
        order_type: OrderType,
        price: Option<Money>,
        trigger_price: Option<Money>,
        product: Product,
        validity: Validity,
        stop_loss: Option<Money>,
        take_profit: Option<Money>,
        risk_amount: Option<Money>,
        risk_reward_ratio: Option<Decimal>,
        status: OrderStatus,
        status_message: Option<String>,
        filled_quantity: Quantity,
        average_price: Option<Money>,
        validation_report: Option<ValidationReport>,
        created_at: Timestamp,
        submitted_at: Option<Timestamp>,
        updated_at: Option<Timestamp>,
        filled_at: Option<Timestamp>,
        cancelled_at: Option<Timestamp>,
    ) -> Self {
        Self {
            id,
            broker_order_id,
            strategy_id,
            symbol,
            exchange,
            side,
            quantity,
            order_type,
            price,
            trigger_price,
            product,
            validity,
            stop_loss,
            take_profit,
            risk_amount,
            risk_reward_ratio,
            status,
            status_message,
            filled_quantity,
            average_price,
            validation_report,
            created_at,
            submitted_at,
            updated_at,
            filled_at,
            cancelled_at,
            events: Vec::new(),
        }
    }

    /// Internal order identifier.
    #[must_use]
    pub const fn id(&self) -> OrderId {
        self.id
    }

    /// Broker-assigned identifier, set once submission succeeds.
    #[must_use]
    pub const fn broker_order_id(&self) -> Option<&BrokerOrderId> {
        self.broker_order_id.as_ref()
    }

    /// Originating strategy.
    #[must_use]
    pub const fn strategy_id(&self) -> &StrategyId {
        &self.strategy_id
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

    /// Buy or sell.
    #[must_use]
    pub const fn side(&self) -> OrderSide {
        self.side
    }

    /// Requested quantity.
    #[must_use]
    pub const fn quantity(&self) -> Quantity {
        self.quantity
    }

    /// Execution style.
    #[must_use]
    pub const fn order_type(&self) -> OrderType {
        self.order_type
    }

    /// Limit price, if any.
    #[must_use]
    pub const fn price(&self) -> Option<Money> {
        self.price
    }

    /// Trigger price, if any.
    #[must_use]
    pub const fn trigger_price(&self) -> Option<Money> {
        self.trigger_price
    }

    /// Margin product.
    #[must_use]
    pub const fn product(&self) -> Product {
        self.product
    }

    /// Time-in-force.
    #[must_use]
    pub const fn validity(&self) -> Validity {
        self.validity
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

    /// Snapshot of risk amount at creation.
    #[must_use]
    pub const fn risk_amount(&self) -> Option<Money> {
        self.risk_amount
    }

    /// Snapshot of risk-reward ratio at creation.
    #[must_use]
    pub const fn risk_reward_ratio(&self) -> Option<Decimal> {
        self.risk_reward_ratio
    }

    /// Current lifecycle status.
    #[must_use]
    pub const fn status(&self) -> OrderStatus {
        self.status
    }

    /// Status message, e.g. a rejection or failure reason.
    #[must_use]
    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    /// Cumulative filled quantity.
    #[must_use]
    pub const fn filled_quantity(&self) -> Quantity {
        self.filled_quantity
    }

    /// Volume-weighted average fill price, set once `filled_quantity > 0`.
    #[must_use]
    pub const fn average_price(&self) -> Option<Money> {
        self.average_price
    }

    /// The embedded pre-trade validation outcome.
    #[must_use]
    pub const fn validation_report(&self) -> Option<&ValidationReport> {
        self.validation_report.as_ref()
    }

    /// When the order row was created.
    #[must_use]
    pub const fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// When the order was accepted by the broker.
    #[must_use]
    pub const fn submitted_at(&self) -> Option<Timestamp> {
        self.submitted_at
    }

    /// When the order was last updated.
    #[must_use]
    pub const fn updated_at(&self) -> Option<Timestamp> {
        self.updated_at
    }

    /// When the order was fully filled.
    #[must_use]
    pub const fn filled_at(&self) -> Option<Timestamp> {
        self.filled_at
    }

    /// When the order was cancelled.
    #[must_use]
    pub const fn cancelled_at(&self) -> Option<Timestamp> {
        self.cancelled_at
    }

    /// Whether the order is in a terminal state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Remove and return all accumulated events, leaving none pending.
    pub fn drain_events(&mut self) -> Vec<OrderLifecycleEvent> {
        std::mem::take(&mut self.events)
    }

    /// Events accumulated since the last drain, without consuming them.
    #[must_use]
    pub fn pending_events(&self) -> &[OrderLifecycleEvent] {
        &self.events
    }

    /// Record that the broker accepted submission, transitioning to `SUBMITTED`.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::InvalidStateTransition`] if not currently `PENDING`.
    pub fn mark_submitted(&mut self, broker_order_id: BrokerOrderId) -> Result<(), OrderError> {
        OrderStateMachine::validate_transition(self.status, OrderStatus::Submitted)?;
        let now = Timestamp::now();
        self.broker_order_id = Some(broker_order_id);
        self.status = OrderStatus::Submitted;
        self.submitted_at = Some(now);
        self.updated_at = Some(now);
        self.events.push(OrderLifecycleEvent::OrderPlaced {
            order_id: self.id,
            symbol: self.symbol.clone(),
            occurred_at: now,
        });
        Ok(())
    }

    /// Record that the broker is now working the order, transitioning to `OPEN`.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::InvalidStateTransition`] if not currently `SUBMITTED`.
    pub fn mark_open(&mut self) -> Result<(), OrderError> {
        OrderStateMachine::validate_transition(self.status, OrderStatus::Open)?;
        self.status = OrderStatus::Open;
        self.updated_at = Some(Timestamp::now());
        Ok(())
    }

    /// Record broker submission failure, transitioning to `FAILED`.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::InvalidStateTransition`] if not currently `PENDING`.
    pub fn mark_failed(&mut self, message: impl Into<String>) -> Result<(), OrderError> {
        OrderStateMachine::validate_transition(self.status, OrderStatus::Failed)?;
        self.status = OrderStatus::Failed;
        self.status_message = Some(message.into());
        self.updated_at = Some(Timestamp::now());
        Ok(())
    }

    /// Apply a fill report from the broker, idempotently.
    ///
    /// `cumulative_filled_quantity` and `average_price` are cumulative values
    /// as reported by the broker; applying the same update twice is a no-op
    /// beyond refreshing `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::FillExceedsRemaining`] if the reported fill
    /// exceeds the order's total quantity, or
    /// [`OrderError::InvalidStateTransition`] if the order is already terminal
    /// and the fill would change its state.
    pub fn apply_fill(
        &mut self,
        cumulative_filled_quantity: Quantity,
        average_price: Money,
    ) -> Result<bool, OrderError> {
        if cumulative_filled_quantity.value() > self.quantity.value() {
            return Err(OrderError::FillExceedsRemaining {
                fill_quantity: cumulative_filled_quantity.value(),
                remaining_quantity: self.quantity.value() - self.filled_quantity.value(),
            });
        }

        if cumulative_filled_quantity.value() <= self.filled_quantity.value()
            && self.average_price == Some(average_price)
        {
            return Ok(false);
        }

        let now = Timestamp::now();
        self.filled_quantity = cumulative_filled_quantity;
        self.average_price = Some(average_price);
        self.updated_at = Some(now);

        let became_filled = cumulative_filled_quantity.value() == self.quantity.value();
        if became_filled && self.status != OrderStatus::Filled {
            OrderStateMachine::validate_transition(self.status, OrderStatus::Filled)?;
            self.status = OrderStatus::Filled;
            self.filled_at = Some(now);

            self.events.push(OrderLifecycleEvent::OrderFilled {
                order_id: self.id,
                broker_order_id: self.broker_order_id.clone(),
                filled_quantity: cumulative_filled_quantity,
                average_price,
                occurred_at: now,
            });
        }
        Ok(true)
    }

    /// Cancel the order.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::NotCancellable`] if the order is not currently
    /// `SUBMITTED` or `OPEN`.
    pub fn cancel(&mut self) -> Result<(), OrderError> {
        if !self.status.is_cancellable() {
            return Err(OrderError::NotCancellable {
                status: self.status,
            });
        }
        OrderStateMachine::validate_transition(self.status, OrderStatus::Cancelled)?;
        let now = Timestamp::now();
        self.status = OrderStatus::Cancelled;
        self.cancelled_at = Some(now);
        self.updated_at = Some(now);
        self.events.push(OrderLifecycleEvent::OrderCancelled {
            order_id: self.id,
            occurred_at: now,
        });
        Ok(())
    }

    /// Reject the order, either at validation time (from `PENDING`) or as a
    /// late broker rejection (from `SUBMITTED`/`OPEN`).
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::InvalidStateTransition`] if the order is already terminal.
    pub fn reject(&mut self, reason: impl Into<String>) -> Result<(), OrderError> {
        OrderStateMachine::validate_transition(self.status, OrderStatus::Rejected)?;
        let reason = reason.into();
        let now = Timestamp::now();
        self.status = OrderStatus::Rejected;
        self.status_message = Some(reason.clone());
        self.updated_at = Some(now);
        self.events.push(OrderLifecycleEvent::OrderRejected {
            order_id: self.id,
            reason,
            occurred_at: now,
        });
        Ok(())
    }

    /// Apply a field patch for `modify`, restricted to orders that are still modifiable.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::NotModifiable`] if the order is not currently
    /// `SUBMITTED` or `OPEN`.
    pub fn apply_modify(
        &mut self,
        price: Option<Money>,
        quantity: Option<Quantity>,
        trigger_price: Option<Money>,
    ) -> Result<(), OrderError> {
        if !self.status.is_modifiable() {
            return Err(OrderError::NotModifiable {
                status: self.status,
            });
        }
        if let Some(price) = price {
            self.price = Some(price);
        }
        if let Some(quantity) = quantity {
            self.quantity = quantity;
        }
        if let Some(trigger_price) = trigger_price {
            self.trigger_price = Some(trigger_price);
        }
        self.updated_at = Some(Timestamp::now());
        Ok(())
    }
}
