//! In-memory token ledger for simulations and tests

use std::collections::HashMap;

use super::{Address, Amount, TokenLedger, TransferError};

/// Token ledger held entirely in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryToken {
    balances: HashMap<Address, Amount>,
    allowances: HashMap<(Address, Address), Amount>,
    total_supply: Amount,
}

impl InMemoryToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create new tokens in `account`
    pub fn mint(&mut self, account: &Address, amount: Amount) -> Result<(), TransferError> {
        let balance = self.balance_of(account);
        let updated = balance
            .checked_add(amount)
            .ok_or_else(|| TransferError::Overflow(account.clone()))?;
        let supply = self
            .total_supply
            .checked_add(amount)
            .ok_or_else(|| TransferError::Overflow(account.clone()))?;
        self.balances.insert(account.clone(), updated);
        self.total_supply = supply;
        Ok(())
    }

    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    fn move_balance(&mut self, from: &Address, to: &Address, amount: Amount) -> Result<(), TransferError> {
        let from_balance = self.balance_of(from);
        if from_balance < amount {
            return Err(TransferError::InsufficientBalance {
                account: from.clone(),
                balance: from_balance,
                needed: amount,
            });
        }
        if from == to {
            return Ok(());
        }
        let to_balance = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or_else(|| TransferError::Overflow(to.clone()))?;

        self.balances.insert(from.clone(), from_balance - amount);
        self.balances.insert(to.clone(), to_balance);
        Ok(())
    }
}

impl TokenLedger for InMemoryToken {
    fn transfer(&mut self, from: &Address, to: &Address, amount: Amount) -> Result<(), TransferError> {
        self.move_balance(from, to, amount)
    }

    fn transfer_from(
        &mut self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), TransferError> {
        let key = (from.clone(), spender.clone());
        let allowance = self.allowances.get(&key).copied().unwrap_or(0);
        if allowance < amount {
            return Err(TransferError::InsufficientAllowance {
                owner: from.clone(),
                spender: spender.clone(),
                allowance,
                needed: amount,
            });
        }
        self.move_balance(from, to, amount)?;
        self.allowances.insert(key, allowance - amount);
        Ok(())
    }

    fn approve(&mut self, owner: &Address, spender: &Address, amount: Amount) -> Result<(), TransferError> {
        self.allowances.insert((owner.clone(), spender.clone()), amount);
        Ok(())
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.allowances
            .get(&(owner.clone(), spender.clone()))
            .copied()
            .unwrap_or(0)
    }

    fn balance_of(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_moves_balance() {
        let mut token = InMemoryToken::new();
        let alice = Address::from("alice");
        let bob = Address::from("bob");
        token.mint(&alice, 1_000).unwrap();

        token.transfer(&alice, &bob, 400).unwrap();

        assert_eq!(token.balance_of(&alice), 600);
        assert_eq!(token.balance_of(&bob), 400);
        assert_eq!(token.total_supply(), 1_000);
    }

    #[test]
    fn test_transfer_from_consumes_allowance() {
        let mut token = InMemoryToken::new();
        let owner = Address::from("owner");
        let spender = Address::from("spender");
        let vault = Address::from("vault");
        token.mint(&owner, 1_000).unwrap();
        token.approve(&owner, &spender, 300).unwrap();

        token.transfer_from(&spender, &owner, &vault, 200).unwrap();
        assert_eq!(token.allowance(&owner, &spender), 100);
        assert_eq!(token.balance_of(&vault), 200);

        let err = token.transfer_from(&spender, &owner, &vault, 200).unwrap_err();
        assert!(matches!(err, TransferError::InsufficientAllowance { allowance: 100, .. }));
        // Failed call leaves state untouched
        assert_eq!(token.balance_of(&owner), 800);
        assert_eq!(token.allowance(&owner, &spender), 100);
    }

    #[test]
    fn test_insufficient_balance_rejected() {
        let mut token = InMemoryToken::new();
        let alice = Address::from("alice");
        let bob = Address::from("bob");
        token.mint(&alice, 50).unwrap();

        let err = token.transfer(&alice, &bob, 51).unwrap_err();
        assert!(matches!(err, TransferError::InsufficientBalance { balance: 50, needed: 51, .. }));
        assert_eq!(token.balance_of(&bob), 0);
    }
}
