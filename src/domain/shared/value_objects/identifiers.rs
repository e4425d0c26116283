//! Strongly-typed identifiers for domain entities.
//!
//! These prevent mixing up IDs from different contexts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

macro_rules! define_dense_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wrap a raw value assigned by the Store.
            #[must_use]
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            /// Get the raw integer value.
            #[must_use]
            pub const fn value(&self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_dense_id!(OrderId, "Dense, monotonically assigned order identifier.");
define_dense_id!(PositionId, "Dense, monotonically assigned position identifier.");
define_dense_id!(TradeId, "Dense, monotonically assigned trade (fill) identifier.");
define_dense_id!(
    ReconciliationIssueId,
    "Dense, monotonically assigned reconciliation issue identifier."
);
define_dense_id!(
    KillSwitchEventId,
    "Dense, monotonically assigned kill-switch event identifier."
);

/// A simple process-local sequence for assigning dense ids.
///
/// The Store owns identity assignment; this is the building block an
/// in-process Store implementation uses to hand out monotonic values.
#[derive(Debug, Default)]
pub struct IdSequence(AtomicI64);

impl IdSequence {
    /// Start a sequence whose first `next()` call returns 1.
    #[must_use]
    pub const fn new() -> Self {
        Self(AtomicI64::new(0))
    }

    /// Allocate the next value in the sequence.
    pub fn next(&self) -> i64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }
}

macro_rules! define_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new identifier from a string.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Get the inner string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

define_id!(
    BrokerOrderId,
    "Broker-assigned opaque order identifier, set after submission."
);
define_id!(BrokerTradeId, "Broker-assigned opaque trade/fill identifier.");
define_id!(StrategyId, "Identifier for the strategy that originated an order.");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_id_display_and_value() {
        let id = OrderId::new(42);
        assert_eq!(id.value(), 42);
        assert_eq!(format!("{id}"), "42");
    }

    #[test]
    fn order_id_ordering() {
        assert!(OrderId::new(1) < OrderId::new(2));
    }

    #[test]
    fn id_sequence_monotonic() {
        let seq = IdSequence::new();
        assert_eq!(seq.next(), 1);
        assert_eq!(seq.next(), 2);
        assert_eq!(seq.next(), 3);
    }

    #[test]
    fn broker_order_id_new_and_display() {
        let id = BrokerOrderId::new("nse-ord-abc123");
        assert_eq!(id.as_str(), "nse-ord-abc123");
        assert_eq!(format!("{id}"), "nse-ord-abc123");
    }

    #[test]
    fn broker_order_id_from_conversions() {
        let id: BrokerOrderId = "abc".into();
        assert_eq!(id.as_str(), "abc");

        let id2: BrokerOrderId = String::from("def").into();
        assert_eq!(id2.as_str(), "def");
    }

    #[test]
    fn broker_order_id_equality() {
        assert_eq!(BrokerOrderId::new("a"), BrokerOrderId::new("a"));
        assert_ne!(BrokerOrderId::new("a"), BrokerOrderId::new("b"));
    }

    #[test]
    fn strategy_id_roundtrip() {
        let id = StrategyId::new("momentum-v2");
        let json = serde_json::to_string(&id).unwrap();
        let parsed: StrategyId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn dense_id_serde_roundtrip() {
        let id = PositionId::new(7);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "7");
        let parsed: PositionId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn dense_id_from_i64() {
        let id: TradeId = 9i64.into();
        let raw: i64 = id.into();
        assert_eq!(raw, 9);
    }

    #[test]
    fn hash_works_for_collections() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(OrderId::new(1));
        set.insert(OrderId::new(2));
        set.insert(OrderId::new(1));
        assert_eq!(set.len(), 2);
    }
}
