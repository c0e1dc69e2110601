//! Bank account model and balance operations.
//!
//! Maintains the invariant: `balance >= 0` after every successful operation.

use crate::error::{BankError, Result};
use crate::money::Money;
use serde::Serialize;

/// Unique account identifier. The integer id is the canonical identity;
/// usernames resolve to it through the store.
pub type AccountId = u32;

/// A bank account: one owner, one non-negative balance.
#[derive(Debug, Clone, Serialize)]
pub struct Account {
    /// Unique account identifier.
    pub id: AccountId,

    /// Owner username, 1:1 with the account id.
    pub owner: String,

    /// Current balance. Never negative after a successful operation.
    pub balance: Money,
}

impl Account {
    /// Creates a new account with the given opening balance.
    pub fn new(id: AccountId, owner: impl Into<String>, balance: Money) -> Self {
        Account {
            id,
            owner: owner.into(),
            balance,
        }
    }

    /// Credits funds to the account and returns the new balance.
    pub fn credit(&mut self, amount: Money) -> Money {
        self.balance += amount;
        self.balance
    }

    /// Debits funds from the account and returns the new balance.
    ///
    /// Fails with `InsufficientFunds` if `amount` exceeds the balance.
    /// Debiting exactly the full balance is permitted; the balance becomes
    /// exactly zero.
    pub fn debit(&mut self, amount: Money) -> Result<Money> {
        if amount > self.balance {
            return Err(BankError::InsufficientFunds {
                balance: self.balance,
                requested: amount,
            });
        }

        self.balance -= amount;
        Ok(self.balance)
    }

    /// Applies a compensating delta when a ledger write failed after the
    /// balance was already mutated. Skips the funds check: the reversal must
    /// restore the pre-operation state exactly.
    pub(crate) fn revert(&mut self, delta: Money) {
        self.balance += delta;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn money(s: &str) -> Money {
        Money::from_str(s).unwrap()
    }

    #[test]
    fn test_new_account_holds_opening_balance() {
        let account = Account::new(1, "usuario1", money("1000.50"));
        assert_eq!(account.id, 1);
        assert_eq!(account.owner, "usuario1");
        assert_eq!(account.balance.to_string(), "1000.50");
    }

    #[test]
    fn test_credit_increases_balance() {
        let mut account = Account::new(1, "usuario1", Money::ZERO);
        let balance = account.credit(money("10.00"));

        assert_eq!(balance.to_string(), "10.00");
        assert_eq!(account.balance.to_string(), "10.00");
    }

    #[test]
    fn test_debit_decreases_balance() {
        let mut account = Account::new(1, "usuario1", money("10.00"));
        let balance = account.debit(money("3.50")).unwrap();

        assert_eq!(balance.to_string(), "6.50");
    }

    #[test]
    fn test_debit_fails_with_insufficient_funds() {
        let mut account = Account::new(1, "usuario1", money("10.00"));
        let err = account.debit(money("15.00")).unwrap_err();

        assert!(matches!(err, BankError::InsufficientFunds { .. }));
        assert_eq!(account.balance.to_string(), "10.00");
    }

    #[test]
    fn test_debit_of_full_balance_reaches_exactly_zero() {
        let mut account = Account::new(1, "usuario1", money("10.00"));
        let balance = account.debit(money("10.00")).unwrap();

        assert!(balance.is_zero());
    }

    #[test]
    fn test_revert_restores_pre_operation_state() {
        let mut account = Account::new(1, "usuario1", money("10.00"));
        account.debit(money("4.00")).unwrap();
        account.revert(money("4.00"));

        assert_eq!(account.balance.to_string(), "10.00");
    }
}
