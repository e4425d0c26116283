//! Order validity (time-in-force) value object.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How long an order remains working before the broker expires it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Validity {
    /// Valid for the current trading session only.
    Day,
    /// Immediate-or-cancel: fill what's available now, cancel the rest.
    Ioc,
}

impl Validity {
    /// Whether unfilled quantity is cancelled immediately rather than left working.
    #[must_use]
    pub const fn is_immediate(&self) -> bool {
        matches!(self, Self::Ioc)
    }
}

impl Default for Validity {
    fn default() -> Self {
        Self::Day
    }
}

impl fmt::Display for Validity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Day => "DAY",
            Self::Ioc => "IOC",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_immediate() {
        assert!(!Validity::Day.is_immediate());
        assert!(Validity::Ioc.is_immediate());
    }

    #[test]
    fn default_is_day() {
        assert_eq!(Validity::default(), Validity::Day);
    }

    #[test]
    fn display() {
        assert_eq!(format!("{}", Validity::Day), "DAY");
        assert_eq!(format!("{}", Validity::Ioc), "IOC");
    }

    #[test]
    fn serde_roundtrip() {
        let json = serde_json::to_string(&Validity::Ioc).unwrap();
        assert_eq!(json, "\"IOC\"");
        let parsed: Validity = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, Validity::Ioc);
    }
}
