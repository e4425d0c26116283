//! The top-level error type surfaced at the OMS core boundary.

use thiserror::Error;

use crate::application::ports::BrokerError;
use crate::domain::order::OrderError;
use crate::domain::order::value_objects::OrderStatus;
use crate::domain::position::PositionError;
use crate::domain::store::StoreError;

/// Errors surfaced by `OrderManager`, `PositionManager`, and the Reconciler.
///
/// Validation outcomes are *reported*, not exceptional: a rejected order is
/// still persisted with status `REJECTED` and a recorded reason. Transport
/// and store errors *propagate*; background loops catch and log them instead
/// of dying.
#[derive(Debug, Error)]
pub enum OmsError {
    /// The pre-trade validator refused the request. The order row exists
    /// with status `REJECTED` carrying the same reason.
    #[error("order rejected: {reason} (failed check: {failed_check})")]
    OrderRejected {
        /// Human-readable rejection reason.
        reason: String,
        /// The name of the failed validator check.
        failed_check: String,
    },

    /// The broker refused the order or the submission transport failed. The
    /// order row exists with status `FAILED` carrying the same cause.
    #[error("order submission failed: {cause}")]
    SubmissionFailed {
        /// The underlying cause.
        cause: String,
    },

    /// No order exists under the given id.
    #[error("order not found")]
    NotFound,

    /// The order is not in a cancellable status.
    #[error("order is not cancellable in its current status: {status}")]
    NotCancellable {
        /// The order's current status.
        status: OrderStatus,
    },

    /// The order is not in a modifiable status.
    #[error("order is not modifiable in its current status: {status}")]
    NotModifiable {
        /// The order's current status.
        status: OrderStatus,
    },

    /// The reconciler could not retrieve broker positions for a pass.
    #[error("reconciliation failed: {cause}")]
    ReconciliationError {
        /// The underlying cause.
        cause: String,
    },

    /// An underlying persistence failure.
    #[error("store error: {0}")]
    StoreError(#[from] StoreError),
}

impl From<OrderError> for OmsError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::NotCancellable { status } => Self::NotCancellable { status },
            OrderError::NotModifiable { status } => Self::NotModifiable { status },
            other => Self::SubmissionFailed {
                cause: other.to_string(),
            },
        }
    }
}

impl From<PositionError> for OmsError {
    fn from(err: PositionError) -> Self {
        Self::ReconciliationError {
            cause: err.to_string(),
        }
    }
}

impl From<BrokerError> for OmsError {
    fn from(err: BrokerError) -> Self {
        Self::SubmissionFailed {
            cause: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_rejected_display() {
        let err = OmsError::OrderRejected {
            reason: "Stop-loss is required".to_string(),
            failed_check: "stop_loss_required".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Stop-loss is required"));
        assert!(msg.contains("stop_loss_required"));
    }

    #[test]
    fn not_cancellable_display() {
        let err = OmsError::NotCancellable {
            status: OrderStatus::Filled,
        };
        assert!(err.to_string().contains("FILLED") || err.to_string().contains("Filled"));
    }

    #[test]
    fn order_error_not_cancellable_converts() {
        let err: OmsError = OrderError::NotCancellable {
            status: OrderStatus::Cancelled,
        }
        .into();
        assert!(matches!(err, OmsError::NotCancellable { .. }));
    }

    #[test]
    fn broker_error_converts_to_submission_failed() {
        let err: OmsError = BrokerError::Connection {
            message: "timeout".to_string(),
        }
        .into();
        assert!(matches!(err, OmsError::SubmissionFailed { .. }));
    }
}
