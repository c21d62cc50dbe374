//! Financial core for the Tally point-of-sale back-end.
//!
//! Tally tracks user balances for an organization's bar tab system. This
//! crate is the part below the HTTP layer: it decides what callers may do,
//! what a user's balance is, who gets fined for debt, and who gets told
//! about it. Controllers, persistence mapping, and request validation live
//! elsewhere and arrive here as injected collaborators.
//!
//! # Architecture
//!
//! ```text
//! HTTP layer (excluded)
//!     |            authorize          read balances        observe writes
//!     v                 |                  |                    |
//! +----------+    +-----------+    +--------------+    +-------------+
//! | rbac     |    | fines     |--->| balance      |    | notify      |
//! | RoleMgr  |    | FineEngine|    | Calculator   |    | DebtMonitor |
//! +----------+    +-----------+    +--------------+    +-------------+
//!                       |                  |                    |
//!                       v                  v                    v
//!                 +-----------------------------+      NotificationTransport
//!                 | store: LedgerStore          |
//!                 | (MemoryStore or a real DB)  |
//!                 +-----------------------------+
//! ```
//!
//! # Determinism
//!
//! Balances are derived, never cached: the same store contents always
//! produce the same balance, and fine eligibility is recomputed from
//! balances on every call.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use tally_core::balance::BalanceCalculator;
//! use tally_core::config::TallyConfig;
//! use tally_core::fines::FineEngine;
//! use tally_core::store::MemoryStore;
//!
//! let config = TallyConfig::from_file("tally.toml".as_ref())?;
//! let store = Arc::new(MemoryStore::new());
//! let balance = BalanceCalculator::new(store.clone(), config.currency());
//! let engine = FineEngine::new(store, balance, config.fine_policy(), transport);
//! ```

pub mod balance;
pub mod config;
pub mod fines;
pub mod money;
pub mod notify;
pub mod rbac;
pub mod store;

pub use balance::{BalanceCalculator, BalanceError};
pub use config::{ConfigError, TallyConfig};
pub use fines::{EligibleUser, FineEngine, FineError, FinePolicy, HandoutReport};
pub use money::{Currency, Money, MoneyError};
pub use notify::{DebtMonitor, NotificationError, NotificationTransport};
pub use rbac::{Relation, RoleDefinition, RoleManager};
pub use store::{LedgerStore, MemoryStore, StoreError};
