//! # Banco API
//!
//! A small banking service: account balances, deposits, withdrawals and
//! transfers behind an HTTP surface, with JWT bearer authentication and an
//! append-only transaction ledger (in-memory or SQLite-backed).
//!
//! ## Design Principles
//!
//! - **Fixed-point arithmetic**: amounts use 2 decimal places via
//!   `rust_decimal`; comparisons are exact
//! - **Strict invariants**: balances never go negative; failed operations
//!   leave balances and ledger untouched
//! - **Explicit ownership**: the store and ledger are constructed once and
//!   passed by reference, no global state
//! - **Per-account locking**: transfers take both account locks in
//!   ascending id order; locks are never held across ledger I/O
//!
//! ## Example
//!
//! ```
//! use banco_api::{Account, AccountStore, Bank, MemoryLedger, Money};
//! use std::str::FromStr;
//! use std::sync::Arc;
//!
//! let store = AccountStore::new();
//! store.insert(Account::new(1, "usuario1", Money::from_str("1000.50").unwrap()));
//! store.insert(Account::new(2, "usuario2", Money::from_str("5000.00").unwrap()));
//!
//! let bank = Bank::new(store, Arc::new(MemoryLedger::new()));
//! bank.transfer(1, 2, Money::from_str("500").unwrap()).unwrap();
//! assert_eq!(bank.store().get_balance(1).unwrap().to_string(), "500.50");
//! ```

pub mod account;
pub mod api;
pub mod auth;
pub mod bank;
pub mod config;
pub mod error;
pub mod ledger;
pub mod money;
pub mod store;

pub use account::{Account, AccountId};
pub use auth::{AuthGate, CredentialStore, MemoryCredentials};
pub use bank::Bank;
pub use error::{BankError, Result};
pub use ledger::{EntryKind, Ledger, LedgerEntry, MemoryLedger, SqliteLedger};
pub use money::Money;
pub use store::AccountStore;
