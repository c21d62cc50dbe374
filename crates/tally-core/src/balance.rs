//! Point-in-time balance computation.
//!
//! A balance is derived, never persisted: the signed sum of every transfer,
//! transaction leg, and active fine affecting a user, restricted to entries
//! created at or before the reference time. The calculator holds no cache,
//! so repeated calls over unchanged data return identical results.
//!
//! # Currency integrity
//!
//! All contributing entries must share the configured currency. A mismatch
//! is a data-integrity bug upstream and fails the computation with
//! [`MoneyError::CurrencyMismatch`]; it is never coerced.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::money::{Currency, Money, MoneyError};
use crate::store::{LedgerStore, StoreError, UserId};

/// Errors from balance computation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BalanceError {
    /// A contributing entry violated a monetary precondition.
    #[error("balance aggregation failed")]
    Money(#[from] MoneyError),

    /// The underlying store failed.
    #[error("balance read failed")]
    Store(#[from] StoreError),
}

/// The per-stream contributions to a balance.
///
/// [`BalanceBreakdown::net`] recombines the streams; the single-pass
/// [`BalanceCalculator::balance_at`] must always agree with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceBreakdown {
    /// Sum of transfers into the user.
    pub incoming_transfers: Money,
    /// Sum of transfers out of the user.
    pub outgoing_transfers: Money,
    /// Sum of transaction legs crediting the user.
    pub incoming_legs: Money,
    /// Sum of transaction legs debiting the user.
    pub outgoing_legs: Money,
    /// Sum of active fines against the user.
    pub active_fines: Money,
}

impl BalanceBreakdown {
    /// Recombines the streams into a signed balance.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError`] on currency mismatch or overflow.
    pub fn net(&self) -> Result<Money, MoneyError> {
        self.incoming_transfers
            .checked_sub(&self.outgoing_transfers)?
            .checked_add(&self.incoming_legs)?
            .checked_sub(&self.outgoing_legs)?
            .checked_sub(&self.active_fines)
    }
}

/// Computes signed point-in-time balances from the ledger store.
#[derive(Clone)]
pub struct BalanceCalculator {
    store: Arc<dyn LedgerStore>,
    currency: Currency,
}

impl BalanceCalculator {
    /// Creates a calculator reading from `store`, denominated in
    /// `currency`.
    #[must_use]
    pub fn new(store: Arc<dyn LedgerStore>, currency: Currency) -> Self {
        Self { store, currency }
    }

    /// The currency balances are denominated in.
    #[must_use]
    pub const fn currency(&self) -> &Currency {
        &self.currency
    }

    /// Computes the user's signed balance as of `as_of`.
    ///
    /// A user with no financial history has a zero balance in the
    /// configured currency.
    ///
    /// # Errors
    ///
    /// Returns [`BalanceError::Money`] if any contributing entry is not
    /// denominated in the configured currency, and [`BalanceError::Store`]
    /// on store failure.
    pub async fn balance_at(
        &self,
        user_id: UserId,
        as_of: DateTime<Utc>,
    ) -> Result<Money, BalanceError> {
        let mut balance = Money::zero(self.currency.clone());

        for transfer in self.store.transfers_affecting(user_id, as_of).await? {
            // A self-transfer credits and debits the same account.
            if transfer.to == Some(user_id) {
                balance = balance.checked_add(&transfer.amount)?;
            }
            if transfer.from == Some(user_id) {
                balance = balance.checked_sub(&transfer.amount)?;
            }
        }

        for leg in self.store.legs_affecting(user_id, as_of).await? {
            if leg.to == user_id {
                balance = balance.checked_add(&leg.amount)?;
            }
            if leg.from == user_id {
                balance = balance.checked_sub(&leg.amount)?;
            }
        }

        for fine in self.store.fines_of(user_id).await? {
            if fine.active && fine.created_at <= as_of {
                balance = balance.checked_sub(&fine.amount)?;
            }
        }

        Ok(balance)
    }

    /// Computes the per-stream contributions as of `as_of`.
    ///
    /// This is the cross-check path for [`Self::balance_at`]; the excluded
    /// controller layer also renders it as the financial-mutation overview.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Self::balance_at`].
    pub async fn breakdown(
        &self,
        user_id: UserId,
        as_of: DateTime<Utc>,
    ) -> Result<BalanceBreakdown, BalanceError> {
        let zero = || Money::zero(self.currency.clone());
        let mut breakdown = BalanceBreakdown {
            incoming_transfers: zero(),
            outgoing_transfers: zero(),
            incoming_legs: zero(),
            outgoing_legs: zero(),
            active_fines: zero(),
        };

        for transfer in self.store.transfers_affecting(user_id, as_of).await? {
            if transfer.to == Some(user_id) {
                breakdown.incoming_transfers =
                    breakdown.incoming_transfers.checked_add(&transfer.amount)?;
            }
            if transfer.from == Some(user_id) {
                breakdown.outgoing_transfers =
                    breakdown.outgoing_transfers.checked_add(&transfer.amount)?;
            }
        }

        for leg in self.store.legs_affecting(user_id, as_of).await? {
            if leg.to == user_id {
                breakdown.incoming_legs = breakdown.incoming_legs.checked_add(&leg.amount)?;
            }
            if leg.from == user_id {
                breakdown.outgoing_legs = breakdown.outgoing_legs.checked_add(&leg.amount)?;
            }
        }

        for fine in self.store.fines_of(user_id).await? {
            if fine.active && fine.created_at <= as_of {
                breakdown.active_fines = breakdown.active_fines.checked_add(&fine.amount)?;
            }
        }

        Ok(breakdown)
    }
}

impl std::fmt::Debug for BalanceCalculator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BalanceCalculator")
            .field("currency", &self.currency)
            .finish_non_exhaustive()
    }
}
