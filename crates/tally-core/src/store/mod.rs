//! Entities and the persistence trait.
//!
//! The excluded controller layer maps HTTP requests onto these plain data
//! structures; an ORM never appears here. Entities are keyed by integer id
//! and relations are resolved by explicit lookup through [`LedgerStore`].
//!
//! # Timestamps
//!
//! Every balance-affecting entity carries an immutable `created_at` used as
//! the ordering key for point-in-time balance reconstruction. No store
//! operation rewrites a timestamp after creation.
//!
//! # Transactionality
//!
//! [`LedgerStore::record_handout`] is the transaction boundary for fine
//! creation: the handout event and all its fines persist together or not at
//! all. A real backend runs the eligibility check and the write inside one
//! database transaction; the in-memory store serializes writers on a single
//! lock and stages the whole batch before committing.

mod error;
mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use error::StoreError;
pub use memory::MemoryStore;

use crate::money::Money;

/// Integer id of a user.
pub type UserId = u64;
/// Integer id of a transfer.
pub type TransferId = u64;
/// Integer id of a transaction leg.
pub type TransactionLegId = u64;
/// Integer id of a fine.
pub type FineId = u64;
/// Integer id of a fine handout event.
pub type HandoutEventId = u64;

/// The organizational category of a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum UserType {
    /// A regular member of the organization.
    Member,
    /// An organizational unit account (committee, board).
    Organ,
    /// A prepaid voucher account.
    Voucher,
    /// A local account not backed by the member directory.
    LocalUser,
    /// A local administrator account.
    LocalAdmin,
    /// An account settled by invoice.
    Invoice,
    /// An account settled by automatically generated invoices.
    AutomaticInvoice,
}

impl UserType {
    /// Returns the string representation of this user type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Organ => "organ",
            Self::Voucher => "voucher",
            Self::LocalUser => "local_user",
            Self::LocalAdmin => "local_admin",
            Self::Invoice => "invoice",
            Self::AutomaticInvoice => "automatic_invoice",
        }
    }
}

impl std::fmt::Display for UserType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique id.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Organizational category.
    pub user_type: UserType,
    /// Deactivated users keep their financial history and their debt.
    pub active: bool,
}

impl User {
    /// Creates an active user.
    #[must_use]
    pub fn new(id: UserId, name: impl Into<String>, user_type: UserType) -> Self {
        Self {
            id,
            name: name.into(),
            user_type,
            active: true,
        }
    }
}

/// A direct balance transfer.
///
/// A missing `from` is an external deposit; a missing `to` is an external
/// payout. At least one side is always present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    /// Unique id.
    pub id: TransferId,
    /// Source user, debited. `None` for deposits from outside.
    pub from: Option<UserId>,
    /// Destination user, credited. `None` for payouts to outside.
    pub to: Option<UserId>,
    /// Transferred amount, always non-negative.
    pub amount: Money,
    /// Free-form description.
    pub description: String,
    /// Immutable creation timestamp, the balance ordering key.
    pub created_at: DateTime<Utc>,
}

/// One leg of a point-of-sale transaction.
///
/// The controller layer flattens a POS transaction into legs; each leg
/// debits `from` and credits `to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionLeg {
    /// Unique id.
    pub id: TransactionLegId,
    /// Paying user, debited.
    pub from: UserId,
    /// Receiving user, credited.
    pub to: UserId,
    /// Leg amount, always non-negative.
    pub amount: Money,
    /// Immutable creation timestamp, the balance ordering key.
    pub created_at: DateTime<Utc>,
}

/// A fine against a user, owned by exactly one handout event.
///
/// Lifecycle: created active, optionally waived (`active = false`). No
/// other transitions; waiving an already-waived fine is an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fine {
    /// Unique id.
    pub id: FineId,
    /// The handout event that created this fine.
    pub event_id: HandoutEventId,
    /// The fined user.
    pub user_id: UserId,
    /// Fine amount, always non-negative; subtracted from the balance while
    /// active.
    pub amount: Money,
    /// `false` once waived.
    pub active: bool,
    /// Immutable creation timestamp, the balance ordering key.
    pub created_at: DateTime<Utc>,
}

/// A batch record of fines issued at one point in time.
///
/// Immutable once created. A later waive flips the `active` flag on the
/// contained fines, never the event itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FineHandoutEvent {
    /// Unique id.
    pub id: HandoutEventId,
    /// The date the fines were computed against.
    pub reference_date: DateTime<Utc>,
    /// The actor who performed the handout.
    pub created_by: UserId,
    /// Immutable creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Ids of the fines created by this event. Empty if every candidate
    /// turned out ineligible.
    pub fine_ids: Vec<FineId>,
}

/// One fine to be created by [`LedgerStore::record_handout`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FineDraft {
    /// The user to fine.
    pub user_id: UserId,
    /// The computed fine amount.
    pub amount: Money,
}

/// A handout batch to persist atomically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandoutDraft {
    /// The date eligibility was computed against.
    pub reference_date: DateTime<Utc>,
    /// The actor performing the handout.
    pub created_by: UserId,
    /// Creation timestamp for the event and every fine in it.
    pub created_at: DateTime<Utc>,
    /// The fines to create. May be empty.
    pub fines: Vec<FineDraft>,
}

/// Persistence operations the financial core depends on.
///
/// Implementations may suspend on every call; no caller holds an
/// in-process lock across a store call. Infrastructure failures surface as
/// [`StoreError::Backend`] and propagate unchanged.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Looks up a single user.
    async fn user(&self, id: UserId) -> Result<Option<User>, StoreError>;

    /// Looks up many users, preserving input order and skipping unknown
    /// ids. Callers diff the result against the input to find the missing
    /// set.
    async fn users_by_ids(&self, ids: &[UserId]) -> Result<Vec<User>, StoreError>;

    /// All users, optionally restricted to the given types.
    async fn users_of_types(&self, types: Option<&[UserType]>) -> Result<Vec<User>, StoreError>;

    /// Transfers with the user on either side, created at or before
    /// `until`.
    async fn transfers_affecting(
        &self,
        user_id: UserId,
        until: DateTime<Utc>,
    ) -> Result<Vec<Transfer>, StoreError>;

    /// Transaction legs with the user on either side, created at or before
    /// `until`.
    async fn legs_affecting(
        &self,
        user_id: UserId,
        until: DateTime<Utc>,
    ) -> Result<Vec<TransactionLeg>, StoreError>;

    /// Every fine against the user, active or not.
    async fn fines_of(&self, user_id: UserId) -> Result<Vec<Fine>, StoreError>;

    /// Looks up a single fine.
    async fn fine(&self, fine_id: FineId) -> Result<Option<Fine>, StoreError>;

    /// Persists a handout event and all its fines as one atomic unit.
    ///
    /// Either the event and every fine in the draft persist, or nothing
    /// does. A failure on the third fine of three leaves zero fines behind.
    async fn record_handout(&self, draft: HandoutDraft) -> Result<FineHandoutEvent, StoreError>;

    /// Deactivates every active fine of the user and returns the waived
    /// fines. Returns an empty vector when there is nothing to waive; the
    /// caller decides whether that is an error.
    async fn deactivate_fines(&self, user_id: UserId) -> Result<Vec<Fine>, StoreError>;

    /// Waives a single fine.
    ///
    /// Fails with [`StoreError::UnknownFine`] for a missing id and
    /// [`StoreError::AlreadyWaived`] for a fine that is no longer active.
    async fn waive_fine(&self, fine_id: FineId) -> Result<Fine, StoreError>;

    /// Removes a single fine entirely and returns it.
    ///
    /// Fails with [`StoreError::UnknownFine`] for a missing id.
    async fn delete_fine(&self, fine_id: FineId) -> Result<Fine, StoreError>;

    /// All recorded handout events, oldest first.
    async fn handout_events(&self) -> Result<Vec<FineHandoutEvent>, StoreError>;

    /// Looks up a single handout event.
    async fn handout_event(
        &self,
        id: HandoutEventId,
    ) -> Result<Option<FineHandoutEvent>, StoreError>;
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::money::Currency;

    /// The controller layer serializes these entities as JSON; the field
    /// names are part of its contract.
    #[test]
    fn test_fine_json_shape() {
        let fine = Fine {
            id: 7,
            event_id: 2,
            user_id: 41,
            amount: Money::new(120, Currency::eur()),
            active: true,
            created_at: Utc.with_ymd_and_hms(2024, 1, 8, 12, 0, 0).unwrap(),
        };
        let json = serde_json::to_value(&fine).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["event_id"], 2);
        assert_eq!(json["user_id"], 41);
        assert_eq!(json["amount"]["minor"], 120);
        assert_eq!(json["amount"]["currency"]["code"], "EUR");
        assert_eq!(json["active"], true);
    }

    #[test]
    fn test_user_type_serializes_snake_case() {
        let json = serde_json::to_value(UserType::AutomaticInvoice).unwrap();
        assert_eq!(json, "automatic_invoice");

        let back: UserType = serde_json::from_value(json).unwrap();
        assert_eq!(back, UserType::AutomaticInvoice);
    }

    #[test]
    fn test_user_type_as_str() {
        assert_eq!(UserType::Member.as_str(), "member");
        assert_eq!(UserType::Organ.as_str(), "organ");
        assert_eq!(UserType::Voucher.as_str(), "voucher");
        assert_eq!(UserType::LocalUser.as_str(), "local_user");
        assert_eq!(UserType::LocalAdmin.as_str(), "local_admin");
        assert_eq!(UserType::Invoice.as_str(), "invoice");
        assert_eq!(UserType::AutomaticInvoice.as_str(), "automatic_invoice");
    }
}
