//! An in-memory `BrokerPort` double for tests and local running.
//!
//! Orders are accepted immediately and sit `Open` until a test (or an
//! automation script driving local runs) calls [`MockBrokerPort::fill`],
//! [`MockBrokerPort::reject`], or [`MockBrokerPort::cancel_at_broker`] to move
//! them. Every call is also recorded for assertions.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::application::ports::{
    BrokerError, BrokerOrderStatus, BrokerOrderView, BrokerPort, BrokerPositionView,
    ModifyOrderParams, PlaceOrderParams,
};
use crate::domain::shared::{BrokerOrderId, Money, Quantity, Symbol};

struct MockOrder {
    params: PlaceOrderParams,
    status: BrokerOrderStatus,
    filled_quantity: Quantity,
    average_price: Option<Money>,
    status_message: Option<String>,
}

#[derive(Default)]
struct Inner {
    orders: HashMap<BrokerOrderId, MockOrder>,
    positions: HashMap<Symbol, BrokerPositionView>,
    next_id: u64,
    place_calls: u64,
    cancel_calls: u64,
    modify_calls: u64,
}

/// A programmable, call-recording stand-in for a real brokerage.
pub struct MockBrokerPort {
    inner: Mutex<Inner>,
}

impl MockBrokerPort {
    /// Construct an empty mock broker.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Mark an order filled at `price` for `quantity`, crediting the
    /// position table.
    pub fn fill(&self, broker_order_id: &BrokerOrderId, quantity: Quantity, price: Money) {
        let mut inner = self.inner.lock();
        let Some(order) = inner.orders.get_mut(broker_order_id) else {
            return;
        };
        order.status = BrokerOrderStatus::Complete;
        order.filled_quantity = quantity;
        order.average_price = Some(price);
        let symbol = order.params.symbol.clone();
        let signed = Quantity::new(order.params.side.sign() * quantity.value());

        match inner.positions.get(&symbol) {
            None => {
                inner.positions.insert(
                    symbol,
                    BrokerPositionView {
                        quantity: signed,
                        average_price: price,
                    },
                );
            }
            Some(existing) => {
                let same_direction = (existing.quantity.is_positive() && signed.value() > 0)
                    || (existing.quantity.is_negative() && signed.value() < 0);
                let new_quantity = Quantity::new(existing.quantity.value() + signed.value());

                if same_direction {
                    let old_magnitude = existing.quantity.abs().value();
                    let add_magnitude = signed.abs().value();
                    let new_avg = (existing.average_price.amount()
                        * rust_decimal::Decimal::from(old_magnitude)
                        + price.amount() * rust_decimal::Decimal::from(add_magnitude))
                        / rust_decimal::Decimal::from(old_magnitude + add_magnitude);
                    inner.positions.insert(
                        symbol,
                        BrokerPositionView {
                            quantity: new_quantity,
                            average_price: Money::new(new_avg),
                        },
                    );
                } else if new_quantity.is_zero() {
                    inner.positions.remove(&symbol);
                } else {
                    inner.positions.insert(
                        symbol,
                        BrokerPositionView {
                            quantity: new_quantity,
                            average_price: price,
                        },
                    );
                }
            }
        }
    }

    /// Mark an order rejected with `reason`.
    pub fn reject(&self, broker_order_id: &BrokerOrderId, reason: &str) {
        let mut inner = self.inner.lock();
        if let Some(order) = inner.orders.get_mut(broker_order_id) {
            order.status = BrokerOrderStatus::Rejected;
            order.status_message = Some(reason.to_string());
        }
    }

    /// Mark an order cancelled, as if the broker expired or cancelled it.
    pub fn cancel_at_broker(&self, broker_order_id: &BrokerOrderId) {
        let mut inner = self.inner.lock();
        if let Some(order) = inner.orders.get_mut(broker_order_id) {
            order.status = BrokerOrderStatus::Cancelled;
        }
    }

    /// Seed a broker-reported position, as if it existed before this process started.
    pub fn seed_position(&self, symbol: Symbol, view: BrokerPositionView) {
        self.inner.lock().positions.insert(symbol, view);
    }

    /// Number of times `place` has been called.
    #[must_use]
    pub fn place_call_count(&self) -> u64 {
        self.inner.lock().place_calls
    }

    /// Number of times `cancel` has been called.
    #[must_use]
    pub fn cancel_call_count(&self) -> u64 {
        self.inner.lock().cancel_calls
    }

    /// Number of times `modify` has been called.
    #[must_use]
    pub fn modify_call_count(&self) -> u64 {
        self.inner.lock().modify_calls
    }
}

impl Default for MockBrokerPort {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrokerPort for MockBrokerPort {
    async fn place(&self, params: PlaceOrderParams) -> Result<BrokerOrderId, BrokerError> {
        let mut inner = self.inner.lock();
        inner.place_calls += 1;
        inner.next_id += 1;
        let broker_order_id = BrokerOrderId::new(format!("mock-{}", inner.next_id));
        inner.orders.insert(
            broker_order_id.clone(),
            MockOrder {
                params,
                status: BrokerOrderStatus::Open,
                filled_quantity: Quantity::new(0),
                average_price: None,
                status_message: None,
            },
        );
        Ok(broker_order_id)
    }

    async fn cancel(&self, broker_order_id: &BrokerOrderId) -> Result<(), BrokerError> {
        let mut inner = self.inner.lock();
        inner.cancel_calls += 1;
        let order = inner
            .orders
            .get_mut(broker_order_id)
            .ok_or_else(|| BrokerError::OrderNotFound {
                broker_order_id: broker_order_id.to_string(),
            })?;
        if order.status != BrokerOrderStatus::Open {
            return Err(BrokerError::AlreadyTerminal);
        }
        order.status = BrokerOrderStatus::Cancelled;
        Ok(())
    }

    async fn modify(
        &self,
        broker_order_id: &BrokerOrderId,
        patch: ModifyOrderParams,
    ) -> Result<(), BrokerError> {
        let mut inner = self.inner.lock();
        inner.modify_calls += 1;
        let order = inner
            .orders
            .get_mut(broker_order_id)
            .ok_or_else(|| BrokerError::OrderNotFound {
                broker_order_id: broker_order_id.to_string(),
            })?;
        if order.status != BrokerOrderStatus::Open {
            return Err(BrokerError::AlreadyTerminal);
        }
        if let Some(price) = patch.price {
            order.params.price = Some(price);
        }
        if let Some(quantity) = patch.quantity {
            order.params.quantity = quantity;
        }
        if let Some(trigger_price) = patch.trigger_price {
            order.params.trigger_price = Some(trigger_price);
        }
        Ok(())
    }

    async fn list_orders(&self) -> Result<Vec<BrokerOrderView>, BrokerError> {
        let inner = self.inner.lock();
        Ok(inner
            .orders
            .iter()
            .map(|(id, order)| BrokerOrderView {
                broker_order_id: id.clone(),
                status: order.status.clone(),
                filled_quantity: order.filled_quantity,
                average_price: order.average_price,
                status_message: order.status_message.clone(),
                charges: None,
                trade_id: None,
            })
            .collect())
    }

    async fn list_positions(&self) -> Result<HashMap<Symbol, BrokerPositionView>, BrokerError> {
        Ok(self.inner.lock().positions.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::value_objects::{OrderSide, OrderType, Product, Validity};
    use crate::domain::shared::Exchange;

    fn params() -> PlaceOrderParams {
        PlaceOrderParams {
            symbol: Symbol::new("RELIANCE"),
            exchange: Exchange::Nse,
            side: OrderSide::Buy,
            quantity: Quantity::new(10),
            order_type: OrderType::Market,
            product: Product::Mis,
            validity: Validity::Day,
            price: None,
            trigger_price: None,
        }
    }

    #[tokio::test]
    async fn place_then_fill_reflects_in_list_orders() {
        let broker = MockBrokerPort::new();
        let id = broker.place(params()).await.unwrap();
        broker.fill(&id, Quantity::new(10), Money::usd(2450.0));

        let orders = broker.list_orders().await.unwrap();
        let view = orders.iter().find(|o| o.broker_order_id == id).unwrap();
        assert_eq!(view.status, BrokerOrderStatus::Complete);
        assert_eq!(view.filled_quantity, Quantity::new(10));
    }

    #[tokio::test]
    async fn cancel_open_order_succeeds() {
        let broker = MockBrokerPort::new();
        let id = broker.place(params()).await.unwrap();
        broker.cancel(&id).await.unwrap();
        assert_eq!(broker.cancel_call_count(), 1);
    }

    #[tokio::test]
    async fn cancel_terminal_order_fails() {
        let broker = MockBrokerPort::new();
        let id = broker.place(params()).await.unwrap();
        broker.reject(&id, "margin exceeded");
        let err = broker.cancel(&id).await.unwrap_err();
        assert!(matches!(err, BrokerError::AlreadyTerminal));
    }

    #[tokio::test]
    async fn cancel_unknown_order_not_found() {
        let broker = MockBrokerPort::new();
        let err = broker
            .cancel(&BrokerOrderId::new("missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, BrokerError::OrderNotFound { .. }));
    }

    #[tokio::test]
    async fn modify_updates_price() {
        let broker = MockBrokerPort::new();
        let id = broker.place(params()).await.unwrap();
        broker
            .modify(
                &id,
                ModifyOrderParams {
                    price: Some(Money::usd(2500.0)),
                    quantity: None,
                    trigger_price: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(broker.modify_call_count(), 1);
    }

    #[tokio::test]
    async fn list_positions_returns_seeded_positions() {
        let broker = MockBrokerPort::new();
        let symbol = Symbol::new("RELIANCE");
        broker.seed_position(
            symbol.clone(),
            BrokerPositionView {
                quantity: Quantity::new(10),
                average_price: Money::usd(2450.0),
            },
        );
        let positions = broker.list_positions().await.unwrap();
        assert_eq!(positions.get(&symbol).unwrap().quantity, Quantity::new(10));
    }
}
