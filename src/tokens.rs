// 9.0 tokens.rs: token transfer primitive. the engine talks to both pooled
// tokens through this trait and NEVER trusts a callee-reported amount: after any
// external call it diffs balance_of() snapshots instead. MockToken gives tests
// and the simulator a full in-memory ledger with allowance bookkeeping.

use crate::types::{Address, TokenSide};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("transfer of {requested} exceeds balance {available}")]
    InsufficientBalance { requested: u128, available: u128 },

    #[error("transfer of {requested} exceeds allowance {allowance}")]
    InsufficientAllowance { requested: u128, allowance: u128 },
}

/// Transfer primitive for one token. `transfer` moves the caller's own funds;
/// `transfer_from` spends a previously granted allowance.
pub trait TokenLedger {
    fn address(&self) -> Address;

    fn balance_of(&self, holder: Address) -> u128;

    fn transfer(&mut self, from: Address, to: Address, amount: u128) -> Result<(), TokenError>;

    fn transfer_from(
        &mut self,
        spender: Address,
        owner: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), TokenError>;

    fn approve(&mut self, owner: Address, spender: Address, amount: u128);

    fn allowance(&self, owner: Address, spender: Address) -> u128;
}

// trait objects don't auto derive Debug
impl std::fmt::Debug for Box<dyn TokenLedger + Send + Sync> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TokenLedger({})", self.address())
    }
}

// 9.1: the two pooled tokens, side-addressable.
#[derive(Debug)]
pub struct TokenPair {
    pub base: Box<dyn TokenLedger + Send + Sync>,
    pub quote: Box<dyn TokenLedger + Send + Sync>,
}

impl TokenPair {
    pub fn new(
        base: Box<dyn TokenLedger + Send + Sync>,
        quote: Box<dyn TokenLedger + Send + Sync>,
    ) -> Self {
        Self { base, quote }
    }

    pub fn side(&self, side: TokenSide) -> &dyn TokenLedger {
        match side {
            TokenSide::Base => self.base.as_ref(),
            TokenSide::Quote => self.quote.as_ref(),
        }
    }

    pub fn side_mut(&mut self, side: TokenSide) -> &mut dyn TokenLedger {
        match side {
            TokenSide::Base => self.base.as_mut(),
            TokenSide::Quote => self.quote.as_mut(),
        }
    }
}

// 9.2: in-memory ledger for tests and the simulator.
#[derive(Debug, Clone, Default)]
pub struct MockToken {
    address: Address,
    balances: HashMap<Address, u128>,
    allowances: HashMap<(Address, Address), u128>,
}

impl MockToken {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            balances: HashMap::new(),
            allowances: HashMap::new(),
        }
    }

    /// Test helper: credit a holder out of thin air.
    pub fn mint_to(&mut self, holder: Address, amount: u128) {
        *self.balances.entry(holder).or_insert(0) += amount;
    }
}

impl TokenLedger for MockToken {
    fn address(&self) -> Address {
        self.address
    }

    fn balance_of(&self, holder: Address) -> u128 {
        self.balances.get(&holder).copied().unwrap_or(0)
    }

    fn transfer(&mut self, from: Address, to: Address, amount: u128) -> Result<(), TokenError> {
        let available = self.balance_of(from);
        if amount > available {
            return Err(TokenError::InsufficientBalance {
                requested: amount,
                available,
            });
        }
        *self.balances.entry(from).or_insert(0) -= amount;
        *self.balances.entry(to).or_insert(0) += amount;
        Ok(())
    }

    fn transfer_from(
        &mut self,
        spender: Address,
        owner: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), TokenError> {
        let allowance = self.allowance(owner, spender);
        if amount > allowance {
            return Err(TokenError::InsufficientAllowance {
                requested: amount,
                allowance,
            });
        }
        self.transfer(owner, to, amount)?;
        self.allowances.insert((owner, spender), allowance - amount);
        Ok(())
    }

    fn approve(&mut self, owner: Address, spender: Address, amount: u128) {
        self.allowances.insert((owner, spender), amount);
    }

    fn allowance(&self, owner: Address, spender: Address) -> u128 {
        self.allowances.get(&(owner, spender)).copied().unwrap_or(0)
    }
}
