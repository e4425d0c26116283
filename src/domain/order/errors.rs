//! Errors for the order bounded context.

use std::fmt;

use crate::domain::order::value_objects::OrderStatus;
use crate::domain::shared::OrderId;

/// Errors raised while constructing or transitioning an [`Order`](super::aggregate::Order).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    /// The requested status transition is not legal from the order's current status.
    InvalidStateTransition {
        /// Current status.
        from: OrderStatus,
        /// Attempted status.
        to: OrderStatus,
        /// Reason the transition is rejected.
        reason: String,
    },

    /// A fill was reported that would push `filled_quantity` past `quantity`.
    FillExceedsRemaining {
        /// Quantity in the fill.
        fill_quantity: i64,
        /// Quantity still outstanding on the order.
        remaining_quantity: i64,
    },

    /// A required or mutually-exclusive parameter was invalid for the order type.
    InvalidParameters {
        /// Field name.
        field: String,
        /// Error message.
        message: String,
    },

    /// No order exists with the given id.
    NotFound {
        /// The id that was looked up.
        order_id: OrderId,
    },

    /// The order is not in a cancellable status.
    NotCancellable {
        /// Current status.
        status: OrderStatus,
    },

    /// The order is not in a modifiable status.
    NotModifiable {
        /// Current status.
        status: OrderStatus,
    },
}

impl fmt::Display for OrderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidStateTransition { from, to, reason } => {
                write!(f, "invalid order transition {from} -> {to}: {reason}")
            }
            Self::FillExceedsRemaining {
                fill_quantity,
                remaining_quantity,
            } => {
                write!(
                    f,
                    "fill quantity {fill_quantity} exceeds remaining quantity {remaining_quantity}"
                )
            }
            Self::InvalidParameters { field, message } => {
                write!(f, "invalid value for '{field}': {message}")
            }
            Self::NotFound { order_id } => write!(f, "order not found: {order_id}"),
            Self::NotCancellable { status } => {
                write!(f, "order cannot be cancelled from status {status}")
            }
            Self::NotModifiable { status } => {
                write!(f, "order cannot be modified from status {status}")
            }
        }
    }
}

impl std::error::Error for OrderError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_state_transition_display() {
        let err = OrderError::InvalidStateTransition {
            from: OrderStatus::Filled,
            to: OrderStatus::Open,
            reason: "order is already filled".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("FILLED"));
        assert!(msg.contains("OPEN"));
    }

    #[test]
    fn fill_exceeds_remaining_display() {
        let err = OrderError::FillExceedsRemaining {
            fill_quantity: 20,
            remaining_quantity: 10,
        };
        let msg = format!("{err}");
        assert!(msg.contains("20"));
        assert!(msg.contains("10"));
    }

    #[test]
    fn invalid_parameters_display() {
        let err = OrderError::InvalidParameters {
            field: "price".to_string(),
            message: "required for LIMIT orders".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("price"));
    }

    #[test]
    fn not_found_display() {
        let err = OrderError::NotFound {
            order_id: OrderId::new(7),
        };
        assert!(format!("{err}").contains('7'));
    }

    #[test]
    fn not_cancellable_display() {
        let err = OrderError::NotCancellable {
            status: OrderStatus::Filled,
        };
        assert!(format!("{err}").contains("FILLED"));
    }

    #[test]
    fn not_modifiable_display() {
        let err = OrderError::NotModifiable {
            status: OrderStatus::Rejected,
        };
        assert!(format!("{err}").contains("REJECTED"));
    }

    #[test]
    fn is_std_error() {
        let err: Box<dyn std::error::Error> = Box::new(OrderError::NotFound {
            order_id: OrderId::new(1),
        });
        assert!(!err.to_string().is_empty());
    }
}
