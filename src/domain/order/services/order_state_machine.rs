//! Order lifecycle transition rules.

use crate::domain::order::errors::OrderError;
use crate::domain::order::value_objects::OrderStatus;

/// Validates and enumerates legal order status transitions.
pub struct OrderStateMachine;

impl OrderStateMachine {
    /// Whether `from -> to` is a legal transition.
    #[must_use]
    pub const fn is_valid_transition(from: OrderStatus, to: OrderStatus) -> bool {
        use OrderStatus::{Cancelled, Failed, Filled, Open, Pending, Rejected, Submitted};
        matches!(
            (from, to),
            (Pending, Submitted)
                | (Pending, Rejected)
                | (Pending, Failed)
                | (Submitted, Open)
                | (Submitted, Filled)
                | (Submitted, Cancelled)
                | (Submitted, Rejected)
                | (Open, Filled)
                | (Open, Cancelled)
                | (Open, Rejected)
        )
    }

    /// Validate a transition, returning a descriptive error when illegal.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::InvalidStateTransition`] if the transition is
    /// not in the allowed set.
    pub fn validate_transition(from: OrderStatus, to: OrderStatus) -> Result<(), OrderError> {
        if Self::is_valid_transition(from, to) {
            Ok(())
        } else {
            Err(OrderError::InvalidStateTransition {
                from,
                to,
                reason: Self::transition_error_reason(from, to),
            })
        }
    }

    /// A human-readable reason a transition was rejected.
    #[must_use]
    pub fn transition_error_reason(from: OrderStatus, to: OrderStatus) -> String {
        match from {
            OrderStatus::Filled => "order is already filled".to_string(),
            OrderStatus::Cancelled => "order is cancelled".to_string(),
            OrderStatus::Rejected => "order was rejected".to_string(),
            OrderStatus::Failed => "order submission failed".to_string(),
            _ => format!("invalid transition from {from} to {to}"),
        }
    }

    /// The set of statuses reachable in one step from `from`.
    #[must_use]
    pub fn valid_next_states(from: OrderStatus) -> Vec<OrderStatus> {
        use OrderStatus::{Cancelled, Failed, Filled, Open, Pending, Rejected, Submitted};
        match from {
            Pending => vec![Submitted, Rejected, Failed],
            Submitted => vec![Open, Filled, Cancelled, Rejected],
            Open => vec![Filled, Cancelled, Rejected],
            Filled | Cancelled | Rejected | Failed => vec![],
        }
    }
}
