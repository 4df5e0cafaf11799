use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{GamePassError, Result};

/// An identity-keyed balance record. Joins debit it, payouts and refunds
/// credit it; the ledger never creates or destroys units outside the
/// funding operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    pub balance: u64,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            balance: 0,
            created_at: Utc::now(),
        }
    }

    pub(crate) fn debit(&mut self, amount: u64) -> Result<()> {
        match self.balance.checked_sub(amount) {
            Some(rest) => {
                self.balance = rest;
                Ok(())
            }
            None => Err(GamePassError::InsufficientFunds {
                need: amount,
                available: self.balance,
            }),
        }
    }

    pub(crate) fn credit(&mut self, amount: u64) -> Result<()> {
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or_else(|| GamePassError::internal("Account balance overflow"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debit_requires_funds() {
        let mut account = Account::new("alice");
        account.credit(50).unwrap();

        account.debit(30).unwrap();
        assert_eq!(account.balance, 20);

        let err = account.debit(21).unwrap_err();
        assert!(matches!(
            err,
            GamePassError::InsufficientFunds {
                need: 21,
                available: 20
            }
        ));
        assert_eq!(account.balance, 20);
    }

    #[test]
    fn test_credit_overflow_is_an_error() {
        let mut account = Account::new("bob");
        account.credit(u64::MAX).unwrap();
        assert!(account.credit(1).is_err());
    }
}
