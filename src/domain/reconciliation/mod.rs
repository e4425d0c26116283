//! The reconciliation bounded context: broker/internal position drift records.

use serde::{Deserialize, Serialize};

use crate::domain::shared::{Exchange, Money, Quantity, ReconciliationIssueId, Symbol, Timestamp};

/// The kind of drift detected between broker and internal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueKind {
    /// The broker reports a position with no internal counterpart.
    UnknownPosition,
    /// Internal and broker quantities for the same symbol disagree.
    QuantityMismatch,
    /// An internal open position has no counterpart at the broker.
    PhantomPosition,
    /// Internal and broker average prices for the same symbol disagree.
    PriceMismatch,
}

/// Severity of a reconciliation issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    /// Informational, no action needed.
    Info,
    /// Worth operator attention.
    Warning,
    /// Requires immediate attention; may trigger an automatic repair.
    Critical,
}

/// A single detected drift between broker and internal state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationIssue {
    id: ReconciliationIssueId,
    symbol: Symbol,
    exchange: Exchange,
    kind: IssueKind,
    severity: Severity,
    internal_quantity: Option<Quantity>,
    broker_quantity: Option<Quantity>,
    internal_average_price: Option<Money>,
    broker_average_price: Option<Money>,
    resolved: bool,
    resolution: Option<String>,
    auto_fixed: bool,
    detected_at: Timestamp,
    resolved_at: Option<Timestamp>,
}

impl ReconciliationIssue {
    /// Construct a new, unresolved issue.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        id: ReconciliationIssueId,
        symbol: Symbol,
        exchange: Exchange,
        kind: IssueKind,
        severity: Severity,
        internal_quantity: Option<Quantity>,
        broker_quantity: Option<Quantity>,
        internal_average_price: Option<Money>,
        broker_average_price: Option<Money>,
    ) -> Self {
        Self {
            id,
            symbol,
            exchange,
            kind,
            severity,
            internal_quantity,
            broker_quantity,
            internal_average_price,
            broker_average_price,
            resolved: false,
            resolution: None,
            auto_fixed: false,
            detected_at: Timestamp::now(),
            resolved_at: None,
        }
    }

    /// Issue identifier.
    #[must_use]
    pub const fn id(&self) -> ReconciliationIssueId {
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

    /// The kind of drift detected.
    #[must_use]
    pub const fn kind(&self) -> IssueKind {
        self.kind
    }

    /// Severity.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        self.severity
    }

    /// Whether the issue has been resolved.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// Whether the repair was applied automatically by the reconciler.
    #[must_use]
    pub const fn is_auto_fixed(&self) -> bool {
        self.auto_fixed
    }

    /// When the issue was detected.
    #[must_use]
    pub const fn detected_at(&self) -> Timestamp {
        self.detected_at
    }

    /// When the issue was resolved, if it has been.
    #[must_use]
    pub const fn resolved_at(&self) -> Option<Timestamp> {
        self.resolved_at
    }

    /// Mark the issue resolved, optionally noting that the reconciler applied an automatic fix.
    pub fn resolve(&mut self, resolution: impl Into<String>, auto_fixed: bool) {
        self.resolved = true;
        self.resolution = Some(resolution.into());
        self.auto_fixed = auto_fixed;
        self.resolved_at = Some(Timestamp::now());
    }
}
