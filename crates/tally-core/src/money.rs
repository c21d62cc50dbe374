//! Exact monetary arithmetic in integer minor units.
//!
//! Every amount in the crate is a [`Money`]: a signed count of minor units
//! (cents for EUR) tagged with a [`Currency`]. Floating point is never used.
//! Addition and subtraction are checked in two ways: mixing currencies fails
//! with [`MoneyError::CurrencyMismatch`], and minor-unit overflow fails with
//! [`MoneyError::Overflow`] rather than wrapping.
//!
//! # Rounding
//!
//! The only rounding boundary is [`Money::percentage`], which truncates
//! toward zero. All other operations are exact.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from monetary arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum MoneyError {
    /// Two amounts with different currencies were combined.
    ///
    /// This indicates a data-integrity bug upstream and is never coerced.
    #[error("currency mismatch: {left} vs {right}")]
    CurrencyMismatch {
        /// Currency of the left operand.
        left: Currency,
        /// Currency of the right operand.
        right: Currency,
    },

    /// The minor-unit amount overflowed `i64`.
    #[error("monetary amount overflow")]
    Overflow,
}

/// A currency: ISO-style code plus minor-unit exponent.
///
/// Two currencies are interchangeable only if both the code and the
/// exponent match. `EUR` with exponent 2 means amounts are counted in
/// cents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Currency {
    /// Currency code, e.g. `"EUR"`.
    pub code: String,
    /// Number of minor-unit digits per major unit (2 for cents).
    pub exponent: u32,
}

impl Currency {
    /// Creates a currency from a code and minor-unit exponent.
    #[must_use]
    pub fn new(code: impl Into<String>, exponent: u32) -> Self {
        Self {
            code: code.into(),
            exponent,
        }
    }

    /// Euro with two minor-unit digits, the deployment default.
    #[must_use]
    pub fn eur() -> Self {
        Self::new("EUR", 2)
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.code, self.exponent)
    }
}

/// A signed monetary amount in minor units of one currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Signed amount in minor units.
    pub minor: i64,
    /// The currency the amount is denominated in.
    pub currency: Currency,
}

impl Money {
    /// Creates an amount of `minor` minor units in `currency`.
    #[must_use]
    pub const fn new(minor: i64, currency: Currency) -> Self {
        Self { minor, currency }
    }

    /// The zero amount in `currency`.
    #[must_use]
    pub const fn zero(currency: Currency) -> Self {
        Self::new(0, currency)
    }

    /// Returns `true` if the amount is strictly negative.
    #[must_use]
    pub const fn is_negative(&self) -> bool {
        self.minor < 0
    }

    /// Returns `true` if the amount is zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.minor == 0
    }

    /// Checked addition.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::CurrencyMismatch`] if the currencies differ and
    /// [`MoneyError::Overflow`] on `i64` overflow.
    pub fn checked_add(&self, other: &Self) -> Result<Self, MoneyError> {
        self.combine(other, i64::checked_add)
    }

    /// Checked subtraction.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::CurrencyMismatch`] if the currencies differ and
    /// [`MoneyError::Overflow`] on `i64` overflow.
    pub fn checked_sub(&self, other: &Self) -> Result<Self, MoneyError> {
        self.combine(other, i64::checked_sub)
    }

    /// Checked multiplication by an integer scalar.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Overflow`] on `i64` overflow.
    pub fn checked_mul(&self, factor: i64) -> Result<Self, MoneyError> {
        let minor = self.minor.checked_mul(factor).ok_or(MoneyError::Overflow)?;
        Ok(Self::new(minor, self.currency.clone()))
    }

    /// The additive inverse of this amount.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Overflow`] for `i64::MIN`.
    pub fn negated(&self) -> Result<Self, MoneyError> {
        let minor = self.minor.checked_neg().ok_or(MoneyError::Overflow)?;
        Ok(Self::new(minor, self.currency.clone()))
    }

    /// Takes an integer percentage of this amount, truncating toward zero.
    ///
    /// This is the one defined rounding boundary; it exists for splitting a
    /// fine amount off a deficit.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Overflow`] if the intermediate product
    /// overflows `i64`.
    pub fn percentage(&self, percent: u32) -> Result<Self, MoneyError> {
        let product = self
            .minor
            .checked_mul(i64::from(percent))
            .ok_or(MoneyError::Overflow)?;
        Ok(Self::new(product / 100, self.currency.clone()))
    }

    /// Verifies that `other` is denominated like `self`.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::CurrencyMismatch`] if code or exponent differ.
    pub fn require_same_currency(&self, other: &Self) -> Result<(), MoneyError> {
        if self.currency == other.currency {
            Ok(())
        } else {
            Err(MoneyError::CurrencyMismatch {
                left: self.currency.clone(),
                right: other.currency.clone(),
            })
        }
    }

    fn combine(
        &self,
        other: &Self,
        op: impl FnOnce(i64, i64) -> Option<i64>,
    ) -> Result<Self, MoneyError> {
        self.require_same_currency(other)?;
        let minor = op(self.minor, other.minor).ok_or(MoneyError::Overflow)?;
        Ok(Self::new(minor, self.currency.clone()))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.minor, self.currency.code)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn eur(minor: i64) -> Money {
        Money::new(minor, Currency::eur())
    }

    #[test]
    fn test_checked_add_same_currency() {
        let sum = eur(250).checked_add(&eur(-100)).unwrap();
        assert_eq!(sum, eur(150));
    }

    #[test]
    fn test_checked_add_currency_mismatch() {
        let usd = Money::new(100, Currency::new("USD", 2));
        let result = eur(100).checked_add(&usd);
        assert!(matches!(result, Err(MoneyError::CurrencyMismatch { .. })));
    }

    #[test]
    fn test_mismatch_on_exponent_alone() {
        // Same code with a different exponent is a different currency.
        let coarse = Money::new(100, Currency::new("EUR", 0));
        let result = eur(100).checked_add(&coarse);
        assert!(matches!(result, Err(MoneyError::CurrencyMismatch { .. })));
    }

    #[test]
    fn test_checked_add_overflow() {
        let result = eur(i64::MAX).checked_add(&eur(1));
        assert_eq!(result, Err(MoneyError::Overflow));
    }

    #[test]
    fn test_checked_sub() {
        assert_eq!(eur(100).checked_sub(&eur(350)).unwrap(), eur(-250));
    }

    #[test]
    fn test_checked_mul() {
        assert_eq!(eur(-150).checked_mul(3).unwrap(), eur(-450));
        assert_eq!(eur(i64::MAX).checked_mul(2), Err(MoneyError::Overflow));
    }

    #[test]
    fn test_percentage_truncates_toward_zero() {
        assert_eq!(eur(999).percentage(20).unwrap(), eur(199));
        assert_eq!(eur(-999).percentage(20).unwrap(), eur(-199));
        assert_eq!(eur(600).percentage(20).unwrap(), eur(120));
    }

    #[test]
    fn test_negated() {
        assert_eq!(eur(-500).negated().unwrap(), eur(500));
        assert_eq!(eur(i64::MIN).negated(), Err(MoneyError::Overflow));
    }

    proptest! {
        #[test]
        fn prop_add_sub_round_trip(a in -1_000_000_000i64..1_000_000_000, b in -1_000_000_000i64..1_000_000_000) {
            let sum = eur(a).checked_add(&eur(b)).unwrap();
            let back = sum.checked_sub(&eur(b)).unwrap();
            prop_assert_eq!(back, eur(a));
        }

        #[test]
        fn prop_percentage_bounded_by_input(a in 0i64..10_000_000, pct in 0u32..=100) {
            let part = eur(a).percentage(pct).unwrap();
            prop_assert!(part.minor >= 0);
            prop_assert!(part.minor <= a);
        }
    }
}
