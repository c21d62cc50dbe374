//! The fine engine.
//!
//! Detects users in fineable debt, hands out fines in atomic batch events,
//! waives them, and warns debtors about fines to come. Eligibility is
//! always recomputed from balances at the moment of the call; nothing here
//! caches.
//!
//! # Eligibility
//!
//! A user is eligible iff their balance is strictly below minus the
//! configured threshold on **every** supplied reference date. The fine
//! amount is a pure function of the balance at the primary date (the first
//! in the list); see [`FinePolicy`].
//!
//! # Handout semantics
//!
//! [`FineEngine::hand_out`] re-checks eligibility per user and silently
//! skips users who are no longer eligible; the recorded event simply
//! carries fewer fines. Each call creates a fresh event, so repeating a
//! call fines debtors again: the caller decides when a handout happens.
//! Within one call the event and all its fines persist atomically through
//! [`LedgerStore::record_handout`]. Concurrent handouts for the same user
//! must be serialized by the surrounding transaction scope; the store
//! provides that boundary.

mod error;
mod policy;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

pub use error::FineError;
pub use policy::FinePolicy;

use crate::balance::BalanceCalculator;
use crate::money::Money;
use crate::notify::NotificationTransport;
use crate::store::{
    Fine, FineDraft, FineHandoutEvent, FineId, HandoutDraft, HandoutEventId, LedgerStore, User,
    UserId, UserType,
};

/// A user found eligible for a fine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibleUser {
    /// The debtor.
    pub user_id: UserId,
    /// Their balance at the primary reference date.
    pub balance: Money,
    /// The fine the tier policy assigns to that balance.
    pub fine: Money,
}

/// A handout event joined with its fines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandoutReport {
    /// The event record.
    pub event: FineHandoutEvent,
    /// The fines the event created, current state.
    pub fines: Vec<Fine>,
}

/// Detects debt, hands out and waives fines, and sends fine warnings.
pub struct FineEngine {
    store: Arc<dyn LedgerStore>,
    balance: BalanceCalculator,
    policy: FinePolicy,
    transport: Arc<dyn NotificationTransport>,
}

impl FineEngine {
    /// Creates an engine over the given collaborators.
    #[must_use]
    pub fn new(
        store: Arc<dyn LedgerStore>,
        balance: BalanceCalculator,
        policy: FinePolicy,
        transport: Arc<dyn NotificationTransport>,
    ) -> Self {
        Self {
            store,
            balance,
            policy,
            transport,
        }
    }

    /// The configured tier policy.
    #[must_use]
    pub const fn policy(&self) -> &FinePolicy {
        &self.policy
    }

    /// Finds every user in fineable debt on all of `reference_dates`.
    ///
    /// `user_types` restricts the candidate set; `None` considers every
    /// type. Deactivated users are still candidates, debt survives
    /// deactivation. The fine amount is computed from the balance at the
    /// first (primary) date. Results are in ascending user-id order.
    ///
    /// # Errors
    ///
    /// Returns [`FineError::EmptyReferenceDates`] for an empty date list;
    /// balance and store failures propagate.
    pub async fn find_eligible(
        &self,
        user_types: Option<&[UserType]>,
        reference_dates: &[DateTime<Utc>],
    ) -> Result<Vec<EligibleUser>, FineError> {
        let primary = *reference_dates.first().ok_or(FineError::EmptyReferenceDates)?;

        let users = self
            .store
            .users_of_types(user_types)
            .await
            .map_err(FineError::from_store)?;

        let mut eligible = Vec::new();
        for user in users {
            if let Some(entry) = self.check_eligibility(&user, primary, reference_dates).await? {
                eligible.push(entry);
            }
        }
        Ok(eligible)
    }

    /// Hands out fines to the given users, recording one handout event.
    ///
    /// Every id is verified first; the full set of missing ids is
    /// collected into [`FineError::UnknownUsers`] before anything else
    /// happens. Eligibility is then recomputed against `reference_date`
    /// (defaulting to now); ineligible users are skipped without error.
    /// The fines are created "now" regardless of the reference date, so
    /// history is never rewritten.
    ///
    /// # Errors
    ///
    /// Returns [`FineError::UnknownUsers`] with all missing ids; balance
    /// and store failures propagate. On any error nothing is persisted.
    pub async fn hand_out(
        &self,
        user_ids: &[UserId],
        reference_date: Option<DateTime<Utc>>,
        actor: UserId,
    ) -> Result<FineHandoutEvent, FineError> {
        let reference_date = reference_date.unwrap_or_else(Utc::now);
        let users = self.require_users(user_ids).await?;

        let mut fines = Vec::new();
        for user in &users {
            let balance = self.balance.balance_at(user.id, reference_date).await?;
            if !self.policy.is_fineable(&balance)? {
                debug!(user = user.id, %balance, "not eligible, skipping fine");
                continue;
            }
            let amount = self.policy.fine_for(&balance)?;
            fines.push(FineDraft {
                user_id: user.id,
                amount,
            });
        }

        let fined = fines.len();
        let event = self
            .store
            .record_handout(HandoutDraft {
                reference_date,
                created_by: actor,
                created_at: Utc::now(),
                fines,
            })
            .await
            .map_err(FineError::from_store)?;

        info!(
            event = event.id,
            candidates = user_ids.len(),
            fined,
            %reference_date,
            "handed out fines"
        );
        Ok(event)
    }

    /// Waives every active fine of the user.
    ///
    /// # Errors
    ///
    /// Returns [`FineError::NoActiveFines`] if the user has none, and
    /// [`FineError::UnknownUsers`] for a missing user.
    pub async fn waive_fines(&self, user_id: UserId) -> Result<Vec<Fine>, FineError> {
        let waived = self
            .store
            .deactivate_fines(user_id)
            .await
            .map_err(FineError::from_store)?;
        if waived.is_empty() {
            return Err(FineError::NoActiveFines { user_id });
        }
        info!(user = user_id, count = waived.len(), "waived fines");
        Ok(waived)
    }

    /// Waives a single fine.
    ///
    /// # Errors
    ///
    /// Returns [`FineError::UnknownFine`] for a missing id and
    /// [`FineError::AlreadyWaived`] for an inactive fine. Waiving twice is
    /// an error, never a silent no-op.
    pub async fn waive_fine(&self, fine_id: FineId) -> Result<Fine, FineError> {
        let fine = self
            .store
            .waive_fine(fine_id)
            .await
            .map_err(FineError::from_store)?;
        info!(fine = fine_id, user = fine.user_id, "waived single fine");
        Ok(fine)
    }

    /// Deletes a single fine entirely.
    ///
    /// # Errors
    ///
    /// Returns [`FineError::UnknownFine`] for a missing id.
    pub async fn delete_fine(&self, fine_id: FineId) -> Result<Fine, FineError> {
        let fine = self
            .store
            .delete_fine(fine_id)
            .await
            .map_err(FineError::from_store)?;
        info!(fine = fine_id, user = fine.user_id, "deleted fine");
        Ok(fine)
    }

    /// Recomputes eligibility and warns each eligible user about the fine
    /// they will receive, without creating anything.
    ///
    /// Transport failures are logged and swallowed; the operation reports
    /// success once every eligible user has been attempted.
    ///
    /// # Errors
    ///
    /// Returns [`FineError::UnknownUsers`] with all missing ids; balance
    /// and store failures propagate.
    pub async fn send_fine_warnings(
        &self,
        user_ids: &[UserId],
        reference_date: Option<DateTime<Utc>>,
    ) -> Result<(), FineError> {
        let reference_date = reference_date.unwrap_or_else(Utc::now);
        let users = self.require_users(user_ids).await?;

        for user in &users {
            let dates = [reference_date];
            let Some(entry) = self.check_eligibility(user, reference_date, &dates).await? else {
                continue;
            };
            if let Err(error) = self
                .transport
                .send_future_fine_warning(user.id, entry.fine)
                .await
            {
                warn!(user = user.id, %error, "failed to deliver fine warning");
            }
        }
        Ok(())
    }

    /// All recorded handout events, oldest first.
    ///
    /// # Errors
    ///
    /// Store failures propagate.
    pub async fn handout_events(&self) -> Result<Vec<FineHandoutEvent>, FineError> {
        self.store
            .handout_events()
            .await
            .map_err(FineError::from_store)
    }

    /// One handout event joined with the current state of its fines.
    ///
    /// # Errors
    ///
    /// Returns [`FineError::UnknownEvent`] for a missing id.
    pub async fn handout_event(&self, id: HandoutEventId) -> Result<HandoutReport, FineError> {
        let event = self
            .store
            .handout_event(id)
            .await
            .map_err(FineError::from_store)?
            .ok_or(FineError::UnknownEvent { id })?;

        let mut fines = Vec::with_capacity(event.fine_ids.len());
        for fine_id in &event.fine_ids {
            if let Some(fine) = self
                .store
                .fine(*fine_id)
                .await
                .map_err(FineError::from_store)?
            {
                fines.push(fine);
            }
        }
        Ok(HandoutReport { event, fines })
    }

    /// Fetches `user_ids`, collecting every missing id into one error.
    async fn require_users(&self, user_ids: &[UserId]) -> Result<Vec<User>, FineError> {
        let users = self
            .store
            .users_by_ids(user_ids)
            .await
            .map_err(FineError::from_store)?;
        if users.len() != user_ids.len() {
            let missing: Vec<UserId> = user_ids
                .iter()
                .copied()
                .filter(|id| !users.iter().any(|user| user.id == *id))
                .collect();
            return Err(FineError::UnknownUsers { ids: missing });
        }
        Ok(users)
    }

    /// Checks the every-date debt rule for one user.
    async fn check_eligibility(
        &self,
        user: &User,
        primary: DateTime<Utc>,
        reference_dates: &[DateTime<Utc>],
    ) -> Result<Option<EligibleUser>, FineError> {
        for date in reference_dates {
            let balance = self.balance.balance_at(user.id, *date).await?;
            if !self.policy.is_fineable(&balance)? {
                return Ok(None);
            }
        }
        let balance = self.balance.balance_at(user.id, primary).await?;
        let fine = self.policy.fine_for(&balance)?;
        Ok(Some(EligibleUser {
            user_id: user.id,
            balance,
            fine,
        }))
    }
}

impl std::fmt::Debug for FineEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FineEngine")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
