//! Quantity value object for order and position sizes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Neg, Sub};

use crate::domain::shared::DomainError;

/// A signed share quantity.
///
/// Positive values represent long exposure or a BUY fill; negative values
/// represent short exposure. Orders always carry a positive quantity; a
/// position's quantity carries the sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(i64);

impl Quantity {
    /// Zero quantity.
    pub const ZERO: Self = Self(0);

    /// Create a new Quantity from a signed integer.
    #[must_use]
    pub const fn new(amount: i64) -> Self {
        Self(amount)
    }

    /// Get the raw integer value.
    #[must_use]
    pub const fn value(&self) -> i64 {
        self.0
    }

    /// Returns true if this quantity is positive (long).
    #[must_use]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Returns true if this quantity is negative (short).
    #[must_use]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns true if this quantity is zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Get the absolute value.
    #[must_use]
    pub const fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    /// Validate quantity for order submission: must be strictly positive.
    ///
    /// # Errors
    ///
    /// Returns error if quantity is zero or negative. Order-specific upper
    /// bounds (`max_quantity_per_order`) are enforced by the pre-trade
    /// validator, not here.
    pub fn validate_for_order(&self) -> Result<(), DomainError> {
        if self.0 <= 0 {
            return Err(DomainError::InvalidValue {
                field: "quantity".to_string(),
                message: "Order quantity must be positive".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Add for Quantity {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Quantity {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Neg for Quantity {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

impl From<i64> for Quantity {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Quantity> for i64 {
    fn from(value: Quantity) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantity_new_and_display() {
        let q = Quantity::new(100);
        assert_eq!(format!("{q}"), "100");
    }

    #[test]
    fn quantity_negative_display() {
        let q = Quantity::new(-50);
        assert_eq!(format!("{q}"), "-50");
    }

    #[test]
    fn quantity_zero() {
        assert!(Quantity::ZERO.is_zero());
        assert!(!Quantity::ZERO.is_positive());
        assert!(!Quantity::ZERO.is_negative());
    }

    #[test]
    fn quantity_positive_negative() {
        let pos = Quantity::new(100);
        let neg = Quantity::new(-50);

        assert!(pos.is_positive());
        assert!(!pos.is_negative());

        assert!(!neg.is_positive());
        assert!(neg.is_negative());
    }

    #[test]
    fn quantity_abs() {
        let neg = Quantity::new(-100);
        assert_eq!(neg.abs(), Quantity::new(100));
    }

    #[test]
    fn quantity_arithmetic() {
        let a = Quantity::new(100);
        let b = Quantity::new(30);

        assert_eq!(a + b, Quantity::new(130));
        assert_eq!(a - b, Quantity::new(70));
        assert_eq!(-a, Quantity::new(-100));
    }

    #[test]
    fn quantity_ordering() {
        let a = Quantity::new(100);
        let b = Quantity::new(50);

        assert!(a > b);
        assert!(b < a);
    }

    #[test]
    fn quantity_validate_for_order_zero() {
        assert!(Quantity::ZERO.validate_for_order().is_err());
    }

    #[test]
    fn quantity_validate_for_order_negative() {
        assert!(Quantity::new(-10).validate_for_order().is_err());
    }

    #[test]
    fn quantity_validate_for_order_valid() {
        assert!(Quantity::new(100).validate_for_order().is_ok());
    }

    #[test]
    fn quantity_serde_roundtrip() {
        let q = Quantity::new(100);
        let json = serde_json::to_string(&q).unwrap();
        assert_eq!(json, "100");
        let parsed: Quantity = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, q);
    }

    #[test]
    fn quantity_from_conversions() {
        let q: Quantity = 100i64.into();
        assert_eq!(q, Quantity::new(100));

        let raw: i64 = q.into();
        assert_eq!(raw, 100);
    }

    #[test]
    fn quantity_default() {
        assert_eq!(Quantity::default(), Quantity::ZERO);
    }
}
