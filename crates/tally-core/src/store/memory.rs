//! Arena-backed in-memory ledger store.
//!
//! [`MemoryStore`] keeps every entity in a `BTreeMap` keyed by integer id
//! and implements [`LedgerStore`] for tests and embedding. A single
//! `tokio::sync::RwLock` serializes writers, so a handout batch commits
//! atomically with respect to every other operation: the whole draft is
//! validated against current state before the first insertion.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::error::StoreError;
use super::{
    Fine, FineHandoutEvent, FineId, HandoutDraft, HandoutEventId, LedgerStore, TransactionLeg,
    TransactionLegId, Transfer, TransferId, User, UserId, UserType,
};
use crate::money::Money;

#[derive(Debug, Default)]
struct State {
    users: BTreeMap<UserId, User>,
    transfers: BTreeMap<TransferId, Transfer>,
    legs: BTreeMap<TransactionLegId, TransactionLeg>,
    fines: BTreeMap<FineId, Fine>,
    events: BTreeMap<HandoutEventId, FineHandoutEvent>,
    next_user: UserId,
    next_transfer: TransferId,
    next_leg: TransactionLegId,
    next_fine: FineId,
    next_event: HandoutEventId,
}

impl State {
    fn new() -> Self {
        Self {
            next_user: 1,
            next_transfer: 1,
            next_leg: 1,
            next_fine: 1,
            next_event: 1,
            ..Self::default()
        }
    }

    fn require_user(&self, id: UserId) -> Result<(), StoreError> {
        if self.users.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::UnknownUser { id })
        }
    }
}

/// In-memory [`LedgerStore`] implementation.
#[derive(Debug)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::new()),
        }
    }

    /// Adds a user and returns it with its assigned id.
    pub async fn add_user(&self, name: impl Into<String>, user_type: UserType) -> User {
        let mut state = self.state.write().await;
        let id = state.next_user;
        state.next_user += 1;
        let user = User::new(id, name, user_type);
        state.users.insert(id, user.clone());
        user
    }

    /// Deactivates a user. Financial history and debt are kept.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownUser`] for a missing id.
    pub async fn deactivate_user(&self, id: UserId) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        match state.users.get_mut(&id) {
            Some(user) => {
                user.active = false;
                Ok(())
            }
            None => Err(StoreError::UnknownUser { id }),
        }
    }

    /// Records a transfer. One side may be `None` (deposit or payout), not
    /// both.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownUser`] if a referenced user is missing
    /// and [`StoreError::InvalidInput`] for a negative amount or two empty
    /// sides.
    pub async fn add_transfer(
        &self,
        from: Option<UserId>,
        to: Option<UserId>,
        amount: Money,
        description: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Transfer, StoreError> {
        if from.is_none() && to.is_none() {
            return Err(StoreError::InvalidInput {
                field: "from/to".to_string(),
                reason: "a transfer needs at least one side".to_string(),
            });
        }
        require_non_negative(&amount, "amount")?;

        let mut state = self.state.write().await;
        if let Some(id) = from {
            state.require_user(id)?;
        }
        if let Some(id) = to {
            state.require_user(id)?;
        }

        let id = state.next_transfer;
        state.next_transfer += 1;
        let transfer = Transfer {
            id,
            from,
            to,
            amount,
            description: description.into(),
            created_at,
        };
        state.transfers.insert(id, transfer.clone());
        Ok(transfer)
    }

    /// Records a transaction leg debiting `from` and crediting `to`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownUser`] if either user is missing and
    /// [`StoreError::InvalidInput`] for a negative amount.
    pub async fn add_transaction_leg(
        &self,
        from: UserId,
        to: UserId,
        amount: Money,
        created_at: DateTime<Utc>,
    ) -> Result<TransactionLeg, StoreError> {
        require_non_negative(&amount, "amount")?;

        let mut state = self.state.write().await;
        state.require_user(from)?;
        state.require_user(to)?;

        let id = state.next_leg;
        state.next_leg += 1;
        let leg = TransactionLeg {
            id,
            from,
            to,
            amount,
            created_at,
        };
        state.legs.insert(id, leg.clone());
        Ok(leg)
    }
}

fn require_non_negative(amount: &Money, field: &str) -> Result<(), StoreError> {
    if amount.is_negative() {
        Err(StoreError::InvalidInput {
            field: field.to_string(),
            reason: format!("must be non-negative, got {amount}"),
        })
    } else {
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let state = self.state.read().await;
        Ok(state.users.get(&id).cloned())
    }

    async fn users_by_ids(&self, ids: &[UserId]) -> Result<Vec<User>, StoreError> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.users.get(id).cloned())
            .collect())
    }

    async fn users_of_types(&self, types: Option<&[UserType]>) -> Result<Vec<User>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .filter(|user| types.is_none_or(|types| types.contains(&user.user_type)))
            .cloned()
            .collect())
    }

    async fn transfers_affecting(
        &self,
        user_id: UserId,
        until: DateTime<Utc>,
    ) -> Result<Vec<Transfer>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .transfers
            .values()
            .filter(|t| t.created_at <= until)
            .filter(|t| t.from == Some(user_id) || t.to == Some(user_id))
            .cloned()
            .collect())
    }

    async fn legs_affecting(
        &self,
        user_id: UserId,
        until: DateTime<Utc>,
    ) -> Result<Vec<TransactionLeg>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .legs
            .values()
            .filter(|l| l.created_at <= until)
            .filter(|l| l.from == user_id || l.to == user_id)
            .cloned()
            .collect())
    }

    async fn fines_of(&self, user_id: UserId) -> Result<Vec<Fine>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .fines
            .values()
            .filter(|f| f.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn fine(&self, fine_id: FineId) -> Result<Option<Fine>, StoreError> {
        let state = self.state.read().await;
        Ok(state.fines.get(&fine_id).cloned())
    }

    async fn record_handout(&self, draft: HandoutDraft) -> Result<FineHandoutEvent, StoreError> {
        let mut state = self.state.write().await;

        // Validate the whole draft before touching state: a bad third fine
        // must leave the first two unwritten.
        for fine in &draft.fines {
            state.require_user(fine.user_id)?;
            require_non_negative(&fine.amount, "fine.amount")?;
            if let Some(first) = draft.fines.first() {
                first.amount.require_same_currency(&fine.amount)?;
            }
        }
        state.require_user(draft.created_by)?;

        let event_id = state.next_event;
        state.next_event += 1;

        let mut fine_ids = Vec::with_capacity(draft.fines.len());
        for fine in &draft.fines {
            let id = state.next_fine;
            state.next_fine += 1;
            state.fines.insert(
                id,
                Fine {
                    id,
                    event_id,
                    user_id: fine.user_id,
                    amount: fine.amount.clone(),
                    active: true,
                    created_at: draft.created_at,
                },
            );
            fine_ids.push(id);
        }

        let event = FineHandoutEvent {
            id: event_id,
            reference_date: draft.reference_date,
            created_by: draft.created_by,
            created_at: draft.created_at,
            fine_ids,
        };
        state.events.insert(event_id, event.clone());
        Ok(event)
    }

    async fn deactivate_fines(&self, user_id: UserId) -> Result<Vec<Fine>, StoreError> {
        let mut state = self.state.write().await;
        state.require_user(user_id)?;
        let mut waived = Vec::new();
        for fine in state.fines.values_mut() {
            if fine.user_id == user_id && fine.active {
                fine.active = false;
                waived.push(fine.clone());
            }
        }
        Ok(waived)
    }

    async fn waive_fine(&self, fine_id: FineId) -> Result<Fine, StoreError> {
        let mut state = self.state.write().await;
        let fine = state
            .fines
            .get_mut(&fine_id)
            .ok_or(StoreError::UnknownFine { id: fine_id })?;
        if !fine.active {
            return Err(StoreError::AlreadyWaived { id: fine_id });
        }
        fine.active = false;
        Ok(fine.clone())
    }

    async fn delete_fine(&self, fine_id: FineId) -> Result<Fine, StoreError> {
        let mut state = self.state.write().await;
        let fine = state
            .fines
            .remove(&fine_id)
            .ok_or(StoreError::UnknownFine { id: fine_id })?;
        // The event's fine list is an index over live fines, maintained on
        // delete; the event record itself stays put.
        if let Some(event) = state.events.get_mut(&fine.event_id) {
            event.fine_ids.retain(|id| *id != fine_id);
        }
        Ok(fine)
    }

    async fn handout_events(&self) -> Result<Vec<FineHandoutEvent>, StoreError> {
        let state = self.state.read().await;
        Ok(state.events.values().cloned().collect())
    }

    async fn handout_event(
        &self,
        id: HandoutEventId,
    ) -> Result<Option<FineHandoutEvent>, StoreError> {
        let state = self.state.read().await;
        Ok(state.events.get(&id).cloned())
    }
}
