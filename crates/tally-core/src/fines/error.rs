//! Fine-engine error types.

use thiserror::Error;

use crate::balance::BalanceError;
use crate::store::{FineId, HandoutEventId, StoreError, UserId};

/// Errors from fine-engine operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FineError {
    /// Eligibility was requested without any reference dates.
    #[error("at least one reference date is required")]
    EmptyReferenceDates,

    /// One or more referenced users do not exist.
    ///
    /// Batch operations collect every missing id before returning instead
    /// of failing on the first.
    #[error("unknown users: {ids:?}")]
    UnknownUsers {
        /// All missing user ids, in input order.
        ids: Vec<UserId>,
    },

    /// The referenced fine does not exist.
    #[error("unknown fine: {id}")]
    UnknownFine {
        /// The missing fine id.
        id: FineId,
    },

    /// The referenced handout event does not exist.
    #[error("unknown fine handout event: {id}")]
    UnknownEvent {
        /// The missing event id.
        id: HandoutEventId,
    },

    /// The user has no active fines to waive.
    #[error("user {user_id} has no active fines")]
    NoActiveFines {
        /// The user whose fines were to be waived.
        user_id: UserId,
    },

    /// The fine was already waived.
    #[error("fine {id} is already waived")]
    AlreadyWaived {
        /// The fine id.
        id: FineId,
    },

    /// Balance computation failed.
    #[error("balance computation failed")]
    Balance(#[from] BalanceError),

    /// The underlying store failed.
    #[error("store operation failed")]
    Store(StoreError),
}

impl FineError {
    /// Lifts a store error, converting fine-specific variants to their
    /// engine-level counterparts.
    pub(crate) fn from_store(error: StoreError) -> Self {
        match error {
            StoreError::UnknownUser { id } => Self::UnknownUsers { ids: vec![id] },
            StoreError::UnknownFine { id } => Self::UnknownFine { id },
            StoreError::AlreadyWaived { id } => Self::AlreadyWaived { id },
            other => Self::Store(other),
        }
    }
}

impl From<crate::money::MoneyError> for FineError {
    fn from(error: crate::money::MoneyError) -> Self {
        Self::Balance(BalanceError::Money(error))
    }
}
