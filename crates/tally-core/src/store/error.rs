//! Store-specific error types.

use thiserror::Error;

use super::{FineId, UserId};
use crate::money::MoneyError;

/// Errors from ledger store operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// A referenced user does not exist.
    #[error("unknown user: {id}")]
    UnknownUser {
        /// The missing user id.
        id: UserId,
    },

    /// A referenced fine does not exist.
    #[error("unknown fine: {id}")]
    UnknownFine {
        /// The missing fine id.
        id: FineId,
    },

    /// The fine is already waived.
    #[error("fine {id} is already waived")]
    AlreadyWaived {
        /// The fine id.
        id: FineId,
    },

    /// A monetary precondition was violated while staging a write.
    #[error("monetary precondition violated")]
    Money(#[from] MoneyError),

    /// A write was rejected before any mutation took place.
    #[error("invalid input for field {field}: {reason}")]
    InvalidInput {
        /// The field name.
        field: String,
        /// The reason it is invalid.
        reason: String,
    },

    /// The underlying backend failed.
    ///
    /// Infrastructure errors pass through unchanged; retry policy is the
    /// caller's responsibility.
    #[error("storage backend error: {message}")]
    Backend {
        /// Backend-specific description.
        message: String,
    },
}
