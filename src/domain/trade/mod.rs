//! The trade bounded context: immutable fill records.

use serde::{Deserialize, Serialize};

use crate::domain::order::value_objects::OrderSide;
use crate::domain::shared::{
    BrokerTradeId, Exchange, Money, OrderId, PositionId, Quantity, Symbol, Timestamp, TradeId,
};

/// Per-fill charge breakdown, as reported (or estimated) by the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChargeBreakdown {
    /// Broker commission.
    pub brokerage: Money,
    /// Securities transaction tax.
    pub stt: Money,
    /// Exchange transaction charge.
    pub exchange_txn: Money,
    /// Goods and services tax on brokerage and exchange charges.
    pub gst: Money,
    /// Stamp duty.
    pub stamp_duty: Money,
    /// SEBI turnover fee.
    pub sebi: Money,
}

impl ChargeBreakdown {
    /// Sum of every charge component.
    #[must_use]
    pub fn total(&self) -> Money {
        self.brokerage + self.stt + self.exchange_txn + self.gst + self.stamp_duty + self.sebi
    }
}

/// An immutable record of a single broker fill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    id: TradeId,
    order_id: OrderId,
    position_id: Option<PositionId>,
    broker_trade_id: Option<BrokerTradeId>,
    symbol: Symbol,
    exchange: Exchange,
    side: OrderSide,
    quantity: Quantity,
    price: Money,
    charges: ChargeBreakdown,
    executed_at: Timestamp,
}

impl Trade {
    /// Construct a new trade record, computing the gross/net values from
    /// quantity, price, and charges.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        id: TradeId,
        order_id: OrderId,
        position_id: Option<PositionId>,
        broker_trade_id: Option<BrokerTradeId>,
        symbol: Symbol,
        exchange: Exchange,
        side: OrderSide,
        quantity: Quantity,
        price: Money,
        charges: ChargeBreakdown,
        executed_at: Timestamp,
    ) -> Self {
        Self {
            id,
            order_id,
            position_id,
            broker_trade_id,
            symbol,
            exchange,
            side,
            quantity,
            price,
            charges,
            executed_at,
        }
    }

    /// Trade identifier.
    #[must_use]
    pub const fn id(&self) -> TradeId {
        self.id
    }

    /// The order this fill belongs to.
    #[must_use]
    pub const fn order_id(&self) -> OrderId {
        self.order_id
    }

    /// The position this fill affected, if one existed.
    #[must_use]
    pub const fn position_id(&self) -> Option<PositionId> {
        self.position_id
    }

    /// Broker-assigned trade/fill identifier, if the broker supplied one.
    #[must_use]
    pub const fn broker_trade_id(&self) -> Option<&BrokerTradeId> {
        self.broker_trade_id.as_ref()
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

    /// Fill quantity, always positive.
    #[must_use]
    pub const fn quantity(&self) -> Quantity {
        self.quantity
    }

    /// Fill price.
    #[must_use]
    pub const fn price(&self) -> Money {
        self.price
    }

    /// Per-charge breakdown.
    #[must_use]
    pub const fn charges(&self) -> ChargeBreakdown {
        self.charges
    }

    /// Sum of all charge components.
    #[must_use]
    pub fn total_charges(&self) -> Money {
        self.charges.total()
    }

    /// `quantity * price`, before charges.
    #[must_use]
    pub fn gross_value(&self) -> Money {
        Money::new(rust_decimal::Decimal::from(self.quantity.value()) * self.price.amount())
    }

    /// Gross value adjusted for charges: charges reduce proceeds on a SELL
    /// and increase cost on a BUY.
    #[must_use]
    pub fn net_value(&self) -> Money {
        let gross = self.gross_value();
        let charges = self.total_charges();
        match self.side {
            OrderSide::Buy => gross + charges,
            OrderSide::Sell => gross - charges,
        }
    }

    /// When the fill was executed.
    #[must_use]
    pub const fn executed_at(&self) -> Timestamp {
        self.executed_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn charges() -> ChargeBreakdown {
        ChargeBreakdown {
            brokerage: Money::usd(20.0),
            stt: Money::usd(5.0),
            exchange_txn: Money::usd(1.0),
            gst: Money::usd(3.0),
            stamp_duty: Money::usd(1.0),
            sebi: Money::usd(0.10),
        }
    }

    fn trade(side: OrderSide) -> Trade {
        Trade::new(
            TradeId::new(1),
            OrderId::new(1),
            Some(PositionId::new(1)),
            None,
            Symbol::new("RELIANCE"),
            Exchange::Nse,
            side,
            Quantity::new(10),
            Money::usd(2450.50),
            charges(),
            Timestamp::now(),
        )
    }

    #[test]
    fn total_charges_sums_components() {
        let c = charges();
        assert_eq!(c.total(), Money::usd(30.10));
    }

    #[test]
    fn gross_value_is_qty_times_price() {
        let t = trade(OrderSide::Buy);
        assert_eq!(t.gross_value(), Money::usd(24505.0));
    }

    #[test]
    fn net_value_adds_charges_on_buy() {
        let t = trade(OrderSide::Buy);
        assert_eq!(t.net_value(), Money::usd(24505.0) + Money::usd(30.10));
    }

    #[test]
    fn net_value_subtracts_charges_on_sell() {
        let t = trade(OrderSide::Sell);
        assert_eq!(t.net_value(), Money::usd(24505.0) - Money::usd(30.10));
    }

    #[test]
    fn accessors() {
        let t = trade(OrderSide::Buy);
        assert_eq!(t.order_id(), OrderId::new(1));
        assert_eq!(t.position_id(), Some(PositionId::new(1)));
        assert!(t.broker_trade_id().is_none());
        assert_eq!(t.quantity(), Quantity::new(10));
    }

    #[test]
    fn serde_roundtrip() {
        let t = trade(OrderSide::Sell);
        let json = serde_json::to_string(&t).unwrap();
        let parsed: Trade = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, t);
    }
}
