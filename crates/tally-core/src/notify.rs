//! Debt-crossing notifications.
//!
//! The write path (the external persistence layer) reports every
//! balance-affecting mutation to a [`DebtMonitor`]. The monitor applies one
//! edge-triggered rule and enqueues a [`DebtNotification`] on a bounded
//! channel; a relay task owns the receiving end and dispatches through the
//! injected [`NotificationTransport`].
//!
//! ```text
//! write path ──▶ DebtMonitor ──▶ mpsc ──▶ relay ──▶ NotificationTransport
//!               (edge rule,              (async,    (mail, best effort)
//!                try_send)               logs errors)
//! ```
//!
//! # Edge triggering
//!
//! A notification fires exactly when the balance crosses from non-negative
//! to negative. Staying in debt, leaving debt, and staying non-negative are
//! all silent, so repeated mutations while already negative never spam.
//!
//! # Failure isolation
//!
//! Nothing here can fail the triggering write: a full channel drops the
//! notification with a warning, and transport errors are logged by the
//! relay and swallowed.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::money::Money;
use crate::store::UserId;

/// Default capacity of the notification channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Errors a notification transport may report.
///
/// These never propagate to the write path; the relay logs them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum NotificationError {
    /// The transport failed to deliver.
    #[error("notification transport failed: {message}")]
    Transport {
        /// Transport-specific description.
        message: String,
    },
}

/// Outbound messaging collaborator, injected at construction.
///
/// Delivery is fire-and-forget with best effort; implementations should
/// not retry indefinitely.
#[async_trait]
pub trait NotificationTransport: Send + Sync {
    /// Tells a user they have just entered debt.
    async fn send_debt_notice(
        &self,
        user_id: UserId,
        balance: Money,
    ) -> Result<(), NotificationError>;

    /// Warns a user about the fine they will receive if their debt
    /// persists.
    async fn send_future_fine_warning(
        &self,
        user_id: UserId,
        projected_fine: Money,
    ) -> Result<(), NotificationError>;
}

/// A queued debt-entry notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebtNotification {
    /// The user who entered debt.
    pub user_id: UserId,
    /// Their balance after the mutation.
    pub balance: Money,
}

/// Returns `true` exactly for the non-negative to negative transition.
#[must_use]
pub const fn crossed_into_debt(previous: &Money, new: &Money) -> bool {
    previous.minor >= 0 && new.minor < 0
}

/// Observes balance mutations and enqueues debt-entry notifications.
///
/// Cheap to clone; every writer of financial entities holds one.
#[derive(Debug, Clone)]
pub struct DebtMonitor {
    tx: mpsc::Sender<DebtNotification>,
}

impl DebtMonitor {
    /// Creates a monitor feeding the given channel.
    ///
    /// Most callers use [`spawn_debt_relay`] instead, which also starts
    /// the consuming task.
    #[must_use]
    pub const fn new(tx: mpsc::Sender<DebtNotification>) -> Self {
        Self { tx }
    }

    /// Reports a balance mutation.
    ///
    /// Invoked by the persistence layer immediately after any transaction
    /// or transfer write affecting `user_id`. Never blocks and never
    /// fails: when the channel is full or closed the notification is
    /// dropped with a warning.
    pub fn on_balance_mutation(&self, user_id: UserId, previous: &Money, new: &Money) {
        if !crossed_into_debt(previous, new) {
            return;
        }
        let notification = DebtNotification {
            user_id,
            balance: new.clone(),
        };
        match self.tx.try_send(notification) {
            Ok(()) => debug!(user = user_id, "queued debt-entry notification"),
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(user = user_id, "notification channel full, dropping debt notice");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!(user = user_id, "notification relay gone, dropping debt notice");
            }
        }
    }
}

/// Drains the notification channel into the transport.
///
/// Runs until every [`DebtMonitor`] clone is dropped. Transport errors are
/// logged and the relay keeps going.
pub async fn debt_relay(
    mut rx: mpsc::Receiver<DebtNotification>,
    transport: Arc<dyn NotificationTransport>,
) {
    while let Some(notification) = rx.recv().await {
        let user_id = notification.user_id;
        if let Err(error) = transport
            .send_debt_notice(user_id, notification.balance)
            .await
        {
            warn!(user = user_id, %error, "failed to deliver debt notice");
        }
    }
    debug!("debt notification relay stopped");
}

/// Creates a monitor and spawns its relay task.
///
/// The returned handle completes after the last monitor clone is dropped
/// and the queue has drained.
#[must_use]
pub fn spawn_debt_relay(
    transport: Arc<dyn NotificationTransport>,
    capacity: usize,
) -> (DebtMonitor, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(capacity);
    let handle = tokio::spawn(debt_relay(rx, transport));
    (DebtMonitor::new(tx), handle)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::money::Currency;

    fn eur(minor: i64) -> Money {
        Money::new(minor, Currency::eur())
    }

    /// Records every delivery; optionally fails all of them.
    #[derive(Debug, Default)]
    struct RecordingTransport {
        notices: Mutex<Vec<(UserId, Money)>>,
        warnings: Mutex<Vec<(UserId, Money)>>,
        fail: bool,
    }

    #[async_trait]
    impl NotificationTransport for RecordingTransport {
        async fn send_debt_notice(
            &self,
            user_id: UserId,
            balance: Money,
        ) -> Result<(), NotificationError> {
            if self.fail {
                return Err(NotificationError::Transport {
                    message: "smtp down".to_string(),
                });
            }
            self.notices.lock().unwrap().push((user_id, balance));
            Ok(())
        }

        async fn send_future_fine_warning(
            &self,
            user_id: UserId,
            projected_fine: Money,
        ) -> Result<(), NotificationError> {
            self.warnings.lock().unwrap().push((user_id, projected_fine));
            Ok(())
        }
    }

    #[test]
    fn test_crossing_rule() {
        assert!(crossed_into_debt(&eur(5), &eur(-3)));
        assert!(crossed_into_debt(&eur(0), &eur(-1)));
        assert!(!crossed_into_debt(&eur(-3), &eur(-7)));
        assert!(!crossed_into_debt(&eur(-3), &eur(2)));
        assert!(!crossed_into_debt(&eur(3), &eur(2)));
        assert!(!crossed_into_debt(&eur(-1), &eur(0)));
    }

    #[tokio::test]
    async fn test_balance_sequence_fires_once() {
        let transport = Arc::new(RecordingTransport::default());
        let (monitor, handle) = spawn_debt_relay(transport.clone(), 16);

        // [5, -3, -7, 2]: only the first transition crosses the edge.
        let sequence = [5, -3, -7, 2];
        for window in sequence.windows(2) {
            monitor.on_balance_mutation(1, &eur(window[0]), &eur(window[1]));
        }
        drop(monitor);
        handle.await.unwrap();

        let notices = transport.notices.lock().unwrap();
        assert_eq!(notices.as_slice(), &[(1, eur(-3))]);
    }

    #[tokio::test]
    async fn test_staying_in_debt_and_leaving_debt_are_silent() {
        let transport = Arc::new(RecordingTransport::default());
        let (monitor, handle) = spawn_debt_relay(transport.clone(), 16);

        monitor.on_balance_mutation(1, &eur(-3), &eur(-7));
        monitor.on_balance_mutation(2, &eur(-3), &eur(2));
        drop(monitor);
        handle.await.unwrap();

        assert!(transport.notices.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_full_channel_drops_without_failing_writer() {
        let transport = Arc::new(RecordingTransport::default());
        let (tx, rx) = mpsc::channel(1);
        let monitor = DebtMonitor::new(tx);

        // The relay is not draining yet: the second crossing is dropped.
        monitor.on_balance_mutation(1, &eur(0), &eur(-100));
        monitor.on_balance_mutation(2, &eur(0), &eur(-200));
        drop(monitor);

        debt_relay(rx, transport.clone()).await;
        let notices = transport.notices.lock().unwrap();
        assert_eq!(notices.as_slice(), &[(1, eur(-100))]);
    }

    #[tokio::test]
    async fn test_transport_failure_does_not_stop_relay() {
        let transport = Arc::new(RecordingTransport {
            fail: true,
            ..RecordingTransport::default()
        });
        let (monitor, handle) = spawn_debt_relay(transport.clone(), 16);

        monitor.on_balance_mutation(1, &eur(0), &eur(-100));
        monitor.on_balance_mutation(2, &eur(0), &eur(-200));
        drop(monitor);

        // Both deliveries fail; the relay must still drain and exit.
        handle.await.unwrap();
        assert!(transport.notices.lock().unwrap().is_empty());
    }
}
