//! Core banking operations.
//!
//! A [`Bank`] combines the account store with a transaction ledger. Each
//! operation is one conceptual transaction: balance mutation plus ledger
//! record. Locks cover the in-memory arithmetic only; the ledger write is
//! sequenced after lock release, and a failed write rolls the balance
//! mutation back so the two stay consistent.

use crate::account::AccountId;
use crate::error::{BankError, Result};
use crate::ledger::{EntryKind, Ledger, LedgerEntry};
use crate::money::Money;
use crate::store::AccountStore;
use log::{debug, warn};
use std::sync::Arc;

/// The banking engine: account store plus ledger.
///
/// Constructed once per process and shared by reference with the HTTP
/// surface.
pub struct Bank {
    store: AccountStore,
    ledger: Arc<dyn Ledger>,
}

impl Bank {
    /// Creates a bank over the given store and ledger.
    pub fn new(store: AccountStore, ledger: Arc<dyn Ledger>) -> Self {
        Bank { store, ledger }
    }

    /// Read access to the account store.
    pub fn store(&self) -> &AccountStore {
        &self.store
    }

    /// Credits `amount` to an account and records a deposit entry.
    ///
    /// Fails with `InvalidAmount` if `amount <= 0` and `NotFound` if the
    /// account is unknown.
    pub fn deposit(&self, account: AccountId, amount: Money) -> Result<LedgerEntry> {
        ensure_positive(amount)?;

        let new_balance = self.store.apply_delta(account, amount)?;
        debug!(
            "deposited {} into account {}, balance now {}",
            amount, account, new_balance
        );

        match self.ledger.record(account, EntryKind::Deposit, amount, None) {
            Ok(entry) => Ok(entry),
            Err(err) => {
                warn!(
                    "ledger write failed after deposit to account {}, rolling back: {}",
                    account, err
                );
                self.store.revert_delta(account, -amount);
                Err(err)
            }
        }
    }

    /// Debits `amount` from an account and records a withdrawal entry.
    ///
    /// Fails with `InvalidAmount` if `amount <= 0`, `NotFound` if the
    /// account is unknown, and `InsufficientFunds` if `amount` exceeds the
    /// balance. Withdrawing the full balance is permitted.
    pub fn withdraw(&self, account: AccountId, amount: Money) -> Result<LedgerEntry> {
        ensure_positive(amount)?;

        let new_balance = self.store.apply_delta(account, -amount)?;
        debug!(
            "withdrew {} from account {}, balance now {}",
            amount, account, new_balance
        );

        match self
            .ledger
            .record(account, EntryKind::Withdrawal, amount, None)
        {
            Ok(entry) => Ok(entry),
            Err(err) => {
                warn!(
                    "ledger write failed after withdrawal from account {}, rolling back: {}",
                    account, err
                );
                self.store.revert_delta(account, amount);
                Err(err)
            }
        }
    }

    /// Moves `amount` from one account to another and records the linked
    /// sent/received pair.
    ///
    /// Both balance mutations happen while both account locks are held,
    /// taken in ascending id order so opposing transfers cannot deadlock. A
    /// reader can never observe the debit without the credit.
    pub fn transfer(
        &self,
        from: AccountId,
        to: AccountId,
        amount: Money,
    ) -> Result<(LedgerEntry, LedgerEntry)> {
        ensure_positive(amount)?;
        if from == to {
            return Err(BankError::Validation(
                "transfer source and destination must differ".to_string(),
            ));
        }

        let src = self.store.handle(from)?;
        let dst = self.store.handle(to)?;

        {
            let (first, second) = if from < to { (&src, &dst) } else { (&dst, &src) };
            let first_guard = first.lock().expect("poisoned account lock");
            let second_guard = second.lock().expect("poisoned account lock");
            let (mut source, mut destination) = if from < to {
                (first_guard, second_guard)
            } else {
                (second_guard, first_guard)
            };

            source.debit(amount)?;
            destination.credit(amount);
        }

        debug!("transferred {} from account {} to account {}", amount, from, to);

        match self.ledger.record_transfer(from, to, amount) {
            Ok(pair) => Ok(pair),
            Err(err) => {
                warn!(
                    "ledger write failed after transfer {} -> {}, rolling back: {}",
                    from, to, err
                );
                self.store.revert_delta(from, amount);
                self.store.revert_delta(to, -amount);
                Err(err)
            }
        }
    }

    /// Returns an account's balance together with its full history, oldest
    /// entry first.
    pub fn statement(&self, account: AccountId) -> Result<(Money, Vec<LedgerEntry>)> {
        let balance = self.store.get_balance(account)?;
        let entries = self.ledger.list_for(account)?;
        Ok((balance, entries))
    }

    /// Returns every ledger entry, oldest first.
    pub fn transactions(&self) -> Result<Vec<LedgerEntry>> {
        self.ledger.list_all()
    }

    /// Returns one account's ledger entries, oldest first.
    pub fn transactions_for(&self, account: AccountId) -> Result<Vec<LedgerEntry>> {
        self.ledger.list_for(account)
    }
}

fn ensure_positive(amount: Money) -> Result<()> {
    if amount.is_positive() {
        Ok(())
    } else {
        Err(BankError::InvalidAmount)
    }
}
