//! Fungible token ledger interface used for all value movement
//!
//! The engine never holds balances itself. Deposits are pulled from the payer with
//! `transfer_from` against an allowance, and payouts are pushed from the engine's custody
//! account with `transfer`. Implementations must be all-or-nothing: a failed call leaves
//! every balance and allowance unchanged.

mod memory;

pub use memory::InMemoryToken;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Token amount in the smallest unit of the ledger
pub type Amount = u128;

/// Account identifier on the token ledger
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(pub String);

impl Address {
    pub fn new(id: impl Into<String>) -> Self {
        Address(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Address {
    fn from(id: &str) -> Self {
        Address(id.to_string())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reason a token movement was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("insufficient balance for {account}: have {balance}, need {needed}")]
    InsufficientBalance {
        account: Address,
        balance: Amount,
        needed: Amount,
    },

    #[error("insufficient allowance from {owner} to {spender}: have {allowance}, need {needed}")]
    InsufficientAllowance {
        owner: Address,
        spender: Address,
        allowance: Amount,
        needed: Amount,
    },

    #[error("balance overflow for {0}")]
    Overflow(Address),
}

/// ERC20-style token ledger
pub trait TokenLedger {
    /// Move `amount` from `from` to `to`, signed by `from`
    fn transfer(&mut self, from: &Address, to: &Address, amount: Amount) -> Result<(), TransferError>;

    /// Move `amount` from `from` to `to` on behalf of `spender`, consuming allowance
    fn transfer_from(
        &mut self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), TransferError>;

    /// Set the allowance `owner` grants to `spender`
    fn approve(&mut self, owner: &Address, spender: &Address, amount: Amount) -> Result<(), TransferError>;

    fn allowance(&self, owner: &Address, spender: &Address) -> Amount;

    fn balance_of(&self, account: &Address) -> Amount;
}
