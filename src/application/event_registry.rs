//! A registry of callbacks invoked on lifecycle events and risk alerts.
//!
//! Both the `OrderManager`'s lifecycle events and the `RiskMonitor`'s alerts
//! are dispatched through the same discipline: every registered callback
//! runs in order; a callback that panics is logged and swallowed rather than
//! propagated into the loop that produced the event.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::domain::order::OrderLifecycleEvent;
use crate::domain::risk::RiskAlert;

/// A callback invoked once per dispatched event of type `E`.
pub type Callback<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// A registry of callbacks for one event type, dispatched at-least-once and
/// non-blocking: a panicking callback never stops the others from running.
pub struct CallbackRegistry<E> {
    callbacks: Mutex<Vec<Callback<E>>>,
}

impl<E> CallbackRegistry<E> {
    /// Construct an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            callbacks: Mutex::new(Vec::new()),
        }
    }

    /// Register a callback, run for every event dispatched from now on.
    pub fn register(&self, callback: impl Fn(&E) + Send + Sync + 'static) {
        self.callbacks.lock().push(Arc::new(callback));
    }

    /// Number of registered callbacks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.callbacks.lock().len()
    }

    /// Whether no callbacks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.callbacks.lock().is_empty()
    }

    /// Dispatch `event` to every registered callback. A callback that panics
    /// is caught, logged, and does not stop subsequent callbacks from running.
    pub fn dispatch(&self, event: &E) {
        let callbacks = self.callbacks.lock().clone();
        for callback in callbacks {
            if catch_unwind(AssertUnwindSafe(|| callback(event))).is_err() {
                tracing::error!("event callback panicked; continuing");
            }
        }
    }
}

impl<E> Default for CallbackRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry of callbacks for order/position lifecycle events.
pub type EventRegistry = CallbackRegistry<OrderLifecycleEvent>;

/// Registry of callbacks for risk alerts.
pub type AlertRegistry = CallbackRegistry<RiskAlert>;
