//! Ten ordered, short-circuiting pre-trade risk checks.
//!
//! Stateless given an `account_balance` snapshot, the `Config`'s `risk`
//! section, an optional last-traded price, and the `Store` for position and
//! order counts. Running the same inputs against the same store snapshot
//! always produces the same [`ValidationReport`]; there are no side effects.

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::config::RiskConfig;
use crate::domain::order::{CreateOrderCommand, ValidationReport};
use crate::domain::shared::Money;
use crate::domain::store::{Store, StoreError};

/// Runs the ten ordered pre-trade checks against a command and a market/account snapshot.
pub struct PreTradeValidator {
    store: Arc<dyn Store>,
    config: RiskConfig,
}

impl PreTradeValidator {
    /// Construct a validator over `store`, enforcing the limits in `config`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, config: RiskConfig) -> Self {
        Self { store, config }
    }

    /// Evaluate `cmd` against `account_balance` and, when available, `ltp`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if a required store read (position count,
    /// today's realized PnL, active order count, kill-switch state) fails.
    pub async fn validate(
        &self,
        cmd: &CreateOrderCommand,
        account_balance: Money,
        ltp: Option<Money>,
    ) -> Result<ValidationReport, StoreError> {
        let qty = Decimal::from(cmd.quantity.value());
        let balance = account_balance.amount();

        // 1. Balance: notional / leverage <= balance. MARKET orders without a
        // supplied price have no notional to evaluate and fail by design.
        let Some(price) = cmd.price else {
            return Ok(ValidationReport::failed(
                "balance",
                "order price is required to evaluate notional against account balance",
            ));
        };
        let leverage = Decimal::from(self.config.mis_leverage.max(1));
        let notional = qty * price.amount();
        if notional / leverage > balance {
            return Ok(ValidationReport::failed(
                "balance",
                format!(
                    "required margin {} exceeds available balance {}",
                    notional / leverage,
                    balance
                ),
            ));
        }

        // 2. Position limit: only gates opening a new symbol.
        let existing_position = self
            .store
            .get_position(&cmd.symbol, cmd.exchange, Some(&cmd.strategy_id))
            .await?;
        if existing_position.is_none() {
            let open_positions = self.store.open_position_count().await?;
            if open_positions >= self.config.max_positions as usize {
                return Ok(ValidationReport::failed(
                    "position_limit",
                    format!(
                        "open position count {open_positions} would exceed max_positions {}",
                        self.config.max_positions
                    ),
                ));
            }
        }

        // 3. Risk per trade: |price - SL| * qty <= max_risk_per_trade * balance.
        if let Some(stop_loss) = cmd.stop_loss {
            let risk_amount = (price.amount() - stop_loss.amount()).abs() * qty;
            let cap = self.config.max_risk_per_trade * balance;
            if risk_amount > cap {
                let pct = if balance.is_zero() {
                    Decimal::ZERO
                } else {
                    risk_amount / balance * Decimal::from(100)
                };
                return Ok(ValidationReport::failed(
                    "risk_per_trade",
                    format!(
                        "risk amount {risk_amount} exceeds max_risk_per_trade limit of {cap} ({pct:.2}% of balance)"
                    ),
                ));
            }
        }

        // 4. Daily loss: today_realized_pnl >= -max_daily_loss * balance.
        let today_realized = self.store.today_realized_pnl().await?;
        let daily_floor = -(self.config.max_daily_loss * balance);
        if today_realized.amount() < daily_floor {
            return Ok(ValidationReport::failed(
                "daily_loss",
                format!(
                    "today's realized pnl {} breaches daily loss floor {daily_floor}",
                    today_realized.amount()
                ),
            ));
        }

        // 5. Stop-loss required, with correct directionality.
        let Some(stop_loss) = cmd.stop_loss else {
            return Ok(ValidationReport::failed(
                "stop_loss_required",
                "Stop-loss is required",
            ));
        };
        let direction_ok = match cmd.side {
            crate::domain::order::OrderSide::Buy => stop_loss.amount() < price.amount(),
            crate::domain::order::OrderSide::Sell => stop_loss.amount() > price.amount(),
        };
        if !direction_ok {
            return Ok(ValidationReport::failed(
                "stop_loss_required",
                format!("stop-loss {} is not on the correct side of price {}", stop_loss.amount(), price.amount()),
            ));
        }

        // 6. Risk-reward: if take-profit set, reward/risk >= min_risk_reward.
        if let Some(take_profit) = cmd.take_profit {
            let risk = (price.amount() - stop_loss.amount()).abs();
            let reward = (take_profit.amount() - price.amount()).abs();
            if risk.is_zero() || reward / risk < self.config.min_risk_reward {
                return Ok(ValidationReport::failed(
                    "risk_reward",
                    format!(
                        "reward/risk ratio {} is below min_risk_reward {}",
                        if risk.is_zero() { Decimal::ZERO } else { reward / risk },
                        self.config.min_risk_reward
                    ),
                ));
            }
        }

        // 7. Price sanity: only when an LTP is available.
        if let Some(ltp) = ltp {
            if !ltp.amount().is_zero() {
                let deviation = (price.amount() - ltp.amount()).abs() / ltp.amount();
                if deviation > self.config.max_price_deviation_pct {
                    return Ok(ValidationReport::failed(
                        "price_sanity",
                        format!(
                            "price {} deviates {deviation} from ltp {}, exceeding max_price_deviation_pct {}",
                            price.amount(),
                            ltp.amount(),
                            self.config.max_price_deviation_pct
                        ),
                    ));
                }
            }
        }

        // 8. Quantity limits.
        if cmd.quantity.value() < 1 || cmd.quantity.value() > self.config.max_quantity_per_order {
            return Ok(ValidationReport::failed(
                "quantity_limits",
                format!(
                    "quantity {} is outside the allowed range [1, {}]",
                    cmd.quantity.value(),
                    self.config.max_quantity_per_order
                ),
            ));
        }

        // 9. Order-to-position ratio.
        let active_orders = self.store.active_orders().await?.len();
        let open_positions = self.store.open_position_count().await?;
        let ratio = self.config.max_order_to_position_ratio as usize;
        let max_active = ratio.max(open_positions * ratio);
        if active_orders > max_active {
            return Ok(ValidationReport::failed(
                "order_to_position_ratio",
                format!("active order count {active_orders} exceeds allowed {max_active}"),
            ));
        }

        // 10. Circuit breaker.
        if self.store.is_kill_switch_active().await? {
            return Ok(ValidationReport::failed(
                "circuit_breaker",
                "the kill switch is active; trading is halted",
            ));
        }

        Ok(ValidationReport::passed())
    }
}
