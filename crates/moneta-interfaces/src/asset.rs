//! Token transfer seam.
//!
//! Every market holds its underlying in custody. `transfer_in` pulls from a user
//! against an allowance granted to the custodian, `transfer_out` pays a user out
//! of custody. Both either fully succeed or leave balances untouched.

use crate::error::{InterfaceError, InterfaceResult};
use alloy_primitives::U256;
use moneta_core::{Account, MathError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Underlying token of one market, as seen by that market.
pub trait UnderlyingAsset: Send + Sync {
    fn symbol(&self) -> &str;

    /// Pull `amount` from `from` into custody.
    fn transfer_in(&mut self, from: Account, amount: U256) -> InterfaceResult<()>;

    /// Pay `amount` out of custody to `to`.
    fn transfer_out(&mut self, to: Account, amount: U256) -> InterfaceResult<()>;

    fn balance_of(&self, account: &Account) -> U256;

    /// Balance held in custody.
    fn custody_balance(&self) -> U256;
}

#[derive(Debug, Default)]
struct TokenBook {
    balances: HashMap<Account, U256>,
    allowances: HashMap<(Account, Account), U256>,
    fail_transfers: bool,
}

impl TokenBook {
    fn balance(&self, account: &Account) -> U256 {
        self.balances.get(account).copied().unwrap_or_default()
    }

    fn allowance(&self, owner: &Account, spender: &Account) -> U256 {
        self.allowances
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or_default()
    }

    fn move_balance(&mut self, from: Account, to: Account, amount: U256) -> InterfaceResult<()> {
        let from_balance = self.balance(&from);
        let new_from = from_balance
            .checked_sub(amount)
            .ok_or(InterfaceError::InsufficientBalance { account: from })?;
        if from == to {
            return Ok(());
        }
        let new_to = self
            .balance(&to)
            .checked_add(amount)
            .ok_or(MathError::Overflow)?;
        self.balances.insert(from, new_from);
        self.balances.insert(to, new_to);
        Ok(())
    }
}

/// In-memory fungible token with allowances.
///
/// Clones share the same book, so a test (or the scenario runner) can keep a
/// handle for faucets and approvals while a market owns another one bound to
/// its custody address.
#[derive(Debug, Clone)]
pub struct MemoryAsset {
    symbol: String,
    custodian: Account,
    book: Arc<Mutex<TokenBook>>,
}

impl MemoryAsset {
    pub fn new(symbol: impl Into<String>, custodian: Account) -> Self {
        Self {
            symbol: symbol.into(),
            custodian,
            book: Arc::new(Mutex::new(TokenBook::default())),
        }
    }

    /// Same token, custody held by another account.
    pub fn with_custodian(&self, custodian: Account) -> Self {
        Self {
            symbol: self.symbol.clone(),
            custodian,
            book: Arc::clone(&self.book),
        }
    }

    pub fn custodian(&self) -> Account {
        self.custodian
    }

    /// Mint new tokens to `to`.
    pub fn faucet(&self, to: Account, amount: U256) -> InterfaceResult<()> {
        let mut book = self.book.lock();
        let balance = book
            .balance(&to)
            .checked_add(amount)
            .ok_or(MathError::Overflow)?;
        book.balances.insert(to, balance);
        debug!(symbol = %self.symbol, %to, %amount, "Faucet");
        Ok(())
    }

    pub fn approve(&self, owner: Account, spender: Account, amount: U256) {
        self.book.lock().allowances.insert((owner, spender), amount);
    }

    pub fn allowance(&self, owner: &Account, spender: &Account) -> U256 {
        self.book.lock().allowance(owner, spender)
    }

    /// Plain token transfer between two holders.
    pub fn transfer(&self, from: Account, to: Account, amount: U256) -> InterfaceResult<()> {
        self.book.lock().move_balance(from, to, amount)
    }

    /// Make every subsequent custody transfer fail, to exercise rollback paths.
    pub fn set_fail_transfers(&self, fail: bool) {
        self.book.lock().fail_transfers = fail;
    }
}

impl UnderlyingAsset for MemoryAsset {
    fn symbol(&self) -> &str {
        &self.symbol
    }

    fn transfer_in(&mut self, from: Account, amount: U256) -> InterfaceResult<()> {
        let mut book = self.book.lock();
        if book.fail_transfers {
            return Err(InterfaceError::TransferFailed(format!(
                "{} transfer in from {from} rejected",
                self.symbol
            )));
        }
        let allowance = book.allowance(&from, &self.custodian);
        let remaining = allowance
            .checked_sub(amount)
            .ok_or(InterfaceError::InsufficientAllowance { owner: from })?;
        book.move_balance(from, self.custodian, amount)?;
        book.allowances.insert((from, self.custodian), remaining);
        Ok(())
    }

    fn transfer_out(&mut self, to: Account, amount: U256) -> InterfaceResult<()> {
        let mut book = self.book.lock();
        if book.fail_transfers {
            return Err(InterfaceError::TransferFailed(format!(
                "{} transfer out to {to} rejected",
                self.symbol
            )));
        }
        book.move_balance(self.custodian, to, amount)
    }

    fn balance_of(&self, account: &Account) -> U256 {
        self.book.lock().balance(account)
    }

    fn custody_balance(&self) -> U256 {
        self.book.lock().balance(&self.custodian)
    }
}
