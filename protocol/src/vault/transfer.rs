//! # External Value Transfer
//!
//! The ledger never moves value itself. When a withdrawal commits, it asks a
//! [`ValueTransfer`] implementation to pay the recipient, and that call can
//! fail: the destination may refuse funds, or the backing system may be out
//! of liquidity. The ledger treats any failure as a reason to roll back.
//!
//! [`InMemoryLedger`] is a complete implementation backed by a concurrent
//! map of external account balances. It powers the CLI's scripted scenario
//! and the integration tests, and can be told to refuse payments to a given
//! address.

use std::collections::HashSet;

use dashmap::DashMap;
use parking_lot::RwLock;
use thiserror::Error;
use tracing::{debug, warn};

use crate::identity::Address;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a payout did not happen.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    /// The destination refused to accept funds.
    #[error("destination {to} refused the transfer")]
    Refused {
        /// Intended recipient.
        to: Address,
    },

    /// The vault's reward liquidity, above all principal it still owes,
    /// cannot cover the reward.
    #[error("insufficient custody: available {available}, requested {requested}")]
    InsufficientCustody {
        /// Surplus held above owed principal and in-flight payouts.
        available: u128,
        /// Reward that was attempted.
        requested: u128,
    },

    /// The payer does not hold enough to cover the transfer.
    #[error("insufficient funds in {from}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        /// Account that was debited.
        from: Address,
        /// Its balance at the time.
        balance: u128,
        /// The amount that was requested.
        requested: u128,
    },

    /// Crediting the destination would overflow its balance.
    #[error("balance overflow for {to}")]
    Overflow {
        /// Intended recipient.
        to: Address,
    },
}

// ---------------------------------------------------------------------------
// ValueTransfer
// ---------------------------------------------------------------------------

/// Moves value out of the vault to an external recipient.
///
/// Implementations must either move the full `amount` or nothing at all.
pub trait ValueTransfer: Send + Sync {
    /// Pays `amount` smallest units to `to`.
    fn transfer(&self, to: &Address, amount: u128) -> Result<(), TransferError>;
}

// ---------------------------------------------------------------------------
// InMemoryLedger
// ---------------------------------------------------------------------------

/// Concurrent map of external account balances.
///
/// `DashMap` gives lock-free reads of individual balances. The refusal set
/// is rarely written and sits behind a `parking_lot::RwLock`.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    accounts: DashMap<Address, u128>,
    refusing: RwLock<HashSet<Address>>,
}

impl InMemoryLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current balance of `account` (zero if never seen).
    pub fn balance_of(&self, account: &Address) -> u128 {
        self.accounts.get(account).map(|b| *b).unwrap_or(0)
    }

    /// Adds `amount` to `account`.
    pub fn credit(&self, account: &Address, amount: u128) -> Result<u128, TransferError> {
        let mut entry = self.accounts.entry(account.clone()).or_insert(0);
        *entry = entry.checked_add(amount).ok_or_else(|| TransferError::Overflow {
            to: account.clone(),
        })?;
        Ok(*entry)
    }

    /// Removes `amount` from `account`. Used to fund deposits from an
    /// external balance before handing the value to the vault.
    pub fn debit(&self, account: &Address, amount: u128) -> Result<u128, TransferError> {
        let mut entry = self.accounts.entry(account.clone()).or_insert(0);
        if *entry < amount {
            return Err(TransferError::InsufficientFunds {
                from: account.clone(),
                balance: *entry,
                requested: amount,
            });
        }
        *entry -= amount;
        Ok(*entry)
    }

    /// Makes every future transfer to `account` fail with
    /// [`TransferError::Refused`].
    pub fn refuse(&self, account: &Address) {
        self.refusing.write().insert(account.clone());
    }

    /// Undoes [`refuse`](Self::refuse).
    pub fn accept(&self, account: &Address) {
        self.refusing.write().remove(account);
    }

    /// Number of accounts that have ever held a balance entry.
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }
}

impl ValueTransfer for InMemoryLedger {
    fn transfer(&self, to: &Address, amount: u128) -> Result<(), TransferError> {
        if self.refusing.read().contains(to) {
            warn!(to = %to, amount, "transfer refused by destination");
            return Err(TransferError::Refused { to: to.clone() });
        }
        let balance = self.credit(to, amount)?;
        debug!(to = %to, amount, balance, "transfer credited");
        Ok(())
    }
}
