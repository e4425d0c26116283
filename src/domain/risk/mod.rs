//! The risk bounded context: the kill switch and ephemeral risk alerts.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::reconciliation::Severity;
use crate::domain::shared::{KillSwitchEventId, Timestamp};

/// A persisted kill-switch activation/deactivation record.
///
/// At most one active (`deactivated_at = None`) event exists per calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KillSwitchEvent {
    id: KillSwitchEventId,
    triggered_at: Timestamp,
    reason: String,
    triggered_by: String,
    deactivated_at: Option<Timestamp>,
    deactivated_by: Option<String>,
}

impl KillSwitchEvent {
    /// Construct a newly triggered event.
    #[must_use]
    pub fn trigger(id: KillSwitchEventId, reason: impl Into<String>, triggered_by: impl Into<String>) -> Self {
        Self {
            id,
            triggered_at: Timestamp::now(),
            reason: reason.into(),
            triggered_by: triggered_by.into(),
            deactivated_at: None,
            deactivated_by: None,
        }
    }

    /// Event identifier.
    #[must_use]
    pub const fn id(&self) -> KillSwitchEventId {
        self.id
    }

    /// When the switch was triggered.
    #[must_use]
    pub const fn triggered_at(&self) -> Timestamp {
        self.triggered_at
    }

    /// Why the switch was triggered.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Who or what triggered the switch (e.g. `"risk_monitor"`, an operator name).
    #[must_use]
    pub fn triggered_by(&self) -> &str {
        &self.triggered_by
    }

    /// Whether the switch is still active.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.deactivated_at.is_none()
    }

    /// Deactivate the switch.
    pub fn deactivate(&mut self, by: impl Into<String>) {
        self.deactivated_at = Some(Timestamp::now());
        self.deactivated_by = Some(by.into());
    }
}

/// An ephemeral risk alert emitted by the [`RiskMonitor`](crate::application::risk_monitor::RiskMonitor).
///
/// Alerts are not persisted; they are delivered to registered callbacks and logged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAlert {
    /// Severity of the alert.
    pub severity: Severity,
    /// A short machine-readable alert kind, e.g. `"daily_loss_limit"`.
    pub kind: String,
    /// Human-readable message.
    pub message: String,
    /// Structured supporting details.
    pub details: HashMap<String, String>,
    /// When the alert was raised.
    pub timestamp: Timestamp,
}

impl RiskAlert {
    /// Construct a new alert with no structured details.
    #[must_use]
    pub fn new(severity: Severity, kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            kind: kind.into(),
            message: message.into(),
            details: HashMap::new(),
            timestamp: Timestamp::now(),
        }
    }

    /// Attach a structured detail key/value pair.
    #[must_use]
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_is_active() {
        let event = KillSwitchEvent::trigger(KillSwitchEventId::new(1), "daily loss exceeded", "risk_monitor");
        assert!(event.is_active());
        assert_eq!(event.reason(), "daily loss exceeded");
    }

    #[test]
    fn deactivate_clears_active() {
        let mut event = KillSwitchEvent::trigger(KillSwitchEventId::new(1), "daily loss exceeded", "risk_monitor");
        event.deactivate("ops-user");
        assert!(!event.is_active());
    }

    #[test]
    fn alert_with_details() {
        let alert = RiskAlert::new(Severity::Critical, "daily_loss_limit", "daily loss exceeded 6%")
            .with_detail("realized", "-7000.00")
            .with_detail("limit_pct", "6.00");
        assert_eq!(alert.details.len(), 2);
        assert_eq!(alert.kind, "daily_loss_limit");
    }

    #[test]
    fn kill_switch_serde_roundtrip() {
        let event = KillSwitchEvent::trigger(KillSwitchEventId::new(2), "drawdown", "risk_monitor");
        let json = serde_json::to_string(&event).unwrap();
        let parsed: KillSwitchEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }
}
