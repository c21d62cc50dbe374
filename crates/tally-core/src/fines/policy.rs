//! The fine tier policy.
//!
//! Tier boundaries are deployment configuration (`[fines]` in the TOML
//! document), not code. The computation itself is a pure function of a
//! single balance: a user is in fineable debt strictly below minus the
//! threshold, and the fine is a percentage of the whole deficit, capped.

use serde::{Deserialize, Serialize};

use crate::money::{Currency, Money, MoneyError};

/// Debt threshold and fine computation parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinePolicy {
    /// Users are fine-eligible with a balance strictly below minus this
    /// (positive) amount.
    debt_threshold: Money,
    /// Percentage of the deficit charged as fine.
    deficit_percent: u32,
    /// Upper bound on a single fine.
    maximum: Money,
}

impl FinePolicy {
    /// Creates a policy from its three parameters.
    #[must_use]
    pub const fn new(debt_threshold: Money, deficit_percent: u32, maximum: Money) -> Self {
        Self {
            debt_threshold,
            deficit_percent,
            maximum,
        }
    }

    /// The configured debt threshold.
    #[must_use]
    pub const fn debt_threshold(&self) -> &Money {
        &self.debt_threshold
    }

    /// Returns `true` if the balance is strictly below minus the
    /// threshold.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::CurrencyMismatch`] if the balance is not
    /// denominated like the threshold.
    pub fn is_fineable(&self, balance: &Money) -> Result<bool, MoneyError> {
        self.debt_threshold.require_same_currency(balance)?;
        Ok(balance.minor < -self.debt_threshold.minor)
    }

    /// Computes the fine for a balance.
    ///
    /// Zero for balances that are not fineable; otherwise the configured
    /// percentage of the whole deficit, truncated toward zero and capped
    /// at the configured maximum.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError`] on currency mismatch or overflow.
    pub fn fine_for(&self, balance: &Money) -> Result<Money, MoneyError> {
        if !self.is_fineable(balance)? {
            return Ok(Money::zero(balance.currency.clone()));
        }
        let deficit = balance.negated()?;
        let fine = deficit.percentage(self.deficit_percent)?;
        if fine.minor > self.maximum.minor {
            Ok(self.maximum.clone())
        } else {
            Ok(fine)
        }
    }
}

impl Default for FinePolicy {
    /// The production defaults: five-euro threshold, 20% of the deficit,
    /// capped at five euros.
    fn default() -> Self {
        let currency = Currency::eur();
        Self::new(
            Money::new(500, currency.clone()),
            20,
            Money::new(500, currency),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eur(minor: i64) -> Money {
        Money::new(minor, Currency::eur())
    }

    #[test]
    fn test_threshold_is_strict() {
        let policy = FinePolicy::default();
        assert!(!policy.is_fineable(&eur(-500)).unwrap());
        assert!(policy.is_fineable(&eur(-501)).unwrap());
        assert!(!policy.is_fineable(&eur(0)).unwrap());
        assert!(!policy.is_fineable(&eur(500)).unwrap());
    }

    #[test]
    fn test_fine_is_percentage_of_deficit() {
        let policy = FinePolicy::default();
        assert_eq!(policy.fine_for(&eur(-600)).unwrap(), eur(120));
        assert_eq!(policy.fine_for(&eur(-1000)).unwrap(), eur(200));
    }

    #[test]
    fn test_fine_capped_at_maximum() {
        let policy = FinePolicy::default();
        // 20% of 50.00 would be 10.00; the cap is 5.00.
        assert_eq!(policy.fine_for(&eur(-5000)).unwrap(), eur(500));
    }

    #[test]
    fn test_no_fine_above_threshold() {
        let policy = FinePolicy::default();
        assert_eq!(policy.fine_for(&eur(-500)).unwrap(), eur(0));
        assert_eq!(policy.fine_for(&eur(250)).unwrap(), eur(0));
    }

    #[test]
    fn test_currency_mismatch_is_fatal() {
        let policy = FinePolicy::default();
        let foreign = Money::new(-600, Currency::new("USD", 2));
        assert!(matches!(
            policy.is_fineable(&foreign),
            Err(MoneyError::CurrencyMismatch { .. })
        ));
    }

    #[test]
    fn test_truncation_toward_zero() {
        let policy = FinePolicy::default();
        // 20% of 5.03 is 1.006; the fine truncates to 1.00.
        assert_eq!(policy.fine_for(&eur(-503)).unwrap(), eur(100));
    }
}
