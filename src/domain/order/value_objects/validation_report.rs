//! Validation report produced by the pre-trade validator and embedded on orders.

use serde::{Deserialize, Serialize};

/// The outcome of running the ten ordered pre-trade checks against an order request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Whether every check passed.
    pub is_valid: bool,
    /// The identifier of the first failing check, if any.
    pub failed_check: Option<String>,
    /// A human-readable reason for the failure, if any.
    pub reason: Option<String>,
    /// Advisory warnings that never block submission.
    pub warnings: Vec<String>,
}

impl ValidationReport {
    /// A report for a request that passed every check.
    #[must_use]
    pub const fn passed() -> Self {
        Self {
            is_valid: true,
            failed_check: None,
            reason: None,
            warnings: Vec::new(),
        }
    }

    /// A report for a request that failed a specific check.
    #[must_use]
    pub fn failed(check: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            failed_check: Some(check.into()),
            reason: Some(reason.into()),
            warnings: Vec::new(),
        }
    }

    /// Attach an advisory warning.
    #[must_use]
    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passed_report() {
        let report = ValidationReport::passed();
        assert!(report.is_valid);
        assert!(report.failed_check.is_none());
    }

    #[test]
    fn failed_report() {
        let report = ValidationReport::failed("stop_loss_required", "Stop-loss is required");
        assert!(!report.is_valid);
        assert_eq!(report.failed_check.as_deref(), Some("stop_loss_required"));
        assert_eq!(report.reason.as_deref(), Some("Stop-loss is required"));
    }

    #[test]
    fn warnings_accumulate() {
        let report = ValidationReport::passed()
            .with_warning("price deviates from LTP")
            .with_warning("approaching daily loss limit");
        assert_eq!(report.warnings.len(), 2);
    }

    #[test]
    fn serde_roundtrip() {
        let report = ValidationReport::failed("max_positions", "too many open positions");
        let json = serde_json::to_string(&report).unwrap();
        let parsed: ValidationReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, report);
    }
}
