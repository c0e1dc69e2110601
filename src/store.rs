//! In-memory account store.
//!
//! Owns all accounts behind per-account mutexes so that the
//! read-check-write sequence of a balance delta is a single critical
//! section. The store itself is constructed once per process and shared by
//! reference; there is no hidden global state.

use crate::account::{Account, AccountId};
use crate::error::{BankError, Result};
use crate::money::Money;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

/// Mapping from account id to its account, each guarded by its own lock.
///
/// The outer `RwLock` only protects the map topology (seeding); balance
/// mutations take the per-account `Mutex`. Lock regions cover in-memory
/// arithmetic only, never I/O.
pub struct AccountStore {
    accounts: RwLock<HashMap<AccountId, Arc<Mutex<Account>>>>,
}

impl AccountStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        AccountStore {
            accounts: RwLock::new(HashMap::new()),
        }
    }

    /// Adds an account to the store, replacing any previous account with the
    /// same id. Used for seeding at startup and in tests.
    pub fn insert(&self, account: Account) {
        let mut accounts = self.accounts.write().expect("poisoned account map");
        accounts.insert(account.id, Arc::new(Mutex::new(account)));
    }

    /// Returns the shared handle for an account.
    ///
    /// Fails with `NotFound` if the id is absent.
    pub(crate) fn handle(&self, id: AccountId) -> Result<Arc<Mutex<Account>>> {
        let accounts = self.accounts.read().expect("poisoned account map");
        accounts.get(&id).cloned().ok_or(BankError::NotFound(id))
    }

    /// Returns the current balance of an account.
    pub fn get_balance(&self, id: AccountId) -> Result<Money> {
        let handle = self.handle(id)?;
        let account = handle.lock().expect("poisoned account lock");
        Ok(account.balance)
    }

    /// Returns `(id, balance)` for every account, in ascending id order for
    /// deterministic output.
    pub fn list_accounts(&self) -> Vec<(AccountId, Money)> {
        let handles: Vec<Arc<Mutex<Account>>> = {
            let accounts = self.accounts.read().expect("poisoned account map");
            accounts.values().cloned().collect()
        };

        let mut listing: Vec<(AccountId, Money)> = handles
            .iter()
            .map(|handle| {
                let account = handle.lock().expect("poisoned account lock");
                (account.id, account.balance)
            })
            .collect();
        listing.sort_by_key(|(id, _)| *id);
        listing
    }

    /// Applies a signed delta to an account's balance and returns the new
    /// balance.
    ///
    /// A positive delta credits the account; a negative delta debits it and
    /// fails with `InsufficientFunds` if the magnitude exceeds the balance.
    pub fn apply_delta(&self, id: AccountId, delta: Money) -> Result<Money> {
        let handle = self.handle(id)?;
        let mut account = handle.lock().expect("poisoned account lock");

        if delta < Money::ZERO {
            account.debit(delta.abs())
        } else {
            Ok(account.credit(delta))
        }
    }

    /// Applies a compensating delta without the funds check. Only used to
    /// roll back a balance mutation whose ledger write failed.
    pub(crate) fn revert_delta(&self, id: AccountId, delta: Money) {
        if let Ok(handle) = self.handle(id) {
            let mut account = handle.lock().expect("poisoned account lock");
            account.revert(delta);
        }
    }

    /// Resolves a username to its account id.
    ///
    /// Usernames are a lookup key only; the integer id is the canonical
    /// identity everywhere else.
    pub fn account_of(&self, username: &str) -> Result<AccountId> {
        let accounts = self.accounts.read().expect("poisoned account map");
        for handle in accounts.values() {
            let account = handle.lock().expect("poisoned account lock");
            if account.owner == username {
                return Ok(account.id);
            }
        }
        Err(BankError::UserNotFound(username.to_string()))
    }
}

impl Default for AccountStore {
    fn default() -> Self {
        Self::new()
    }
}
