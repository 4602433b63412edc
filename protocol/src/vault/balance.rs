//! # Custodied Balance
//!
//! A [`Custody`] tracks the total value the ledger holds on behalf of its
//! depositors, plus any reward liquidity topped up on top. It enforces the
//! obvious: you can never pay out more than you hold, and you can never hold
//! more than `u128::MAX`.
//!
//! Withdrawals do not debit directly. They [`reserve`](Custody::reserve) the
//! payout while the external transfer is in flight, then either
//! [`settle`](Custody::settle) it or [`release`](Custody::release) it back.
//! The reserved amount is excluded from [`available`](Custody::available) so
//! two in-flight payouts cannot both spend the same value.
//!
//! Deposit principal enters through [`lock_principal`](Custody::lock_principal)
//! and stays owed until its own withdrawal settles. Reward liquidity enters
//! through [`credit`](Custody::credit). Only the latter can pay rewards.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during custody operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BalanceError {
    /// Attempted to take out more than is available.
    #[error("insufficient custody: available {available}, requested {requested}")]
    Insufficient {
        /// Unreserved value currently held.
        available: u128,
        /// The amount that was requested.
        requested: u128,
    },

    /// Arithmetic overflow during a credit.
    #[error("custody overflow: current {current}, credit {credit}")]
    Overflow {
        /// The held value before the failed credit.
        current: u128,
        /// The amount that caused the overflow.
        credit: u128,
    },

    /// Settled or released more than was reserved. Indicates a ledger bug.
    #[error("reservation mismatch: reserved {reserved}, requested {requested}")]
    ReservationMismatch {
        /// Currently reserved value.
        reserved: u128,
        /// The amount the caller tried to settle or release.
        requested: u128,
    },
}

// ---------------------------------------------------------------------------
// Custody
// ---------------------------------------------------------------------------

/// Value held by the ledger.
///
/// `held` splits three ways: `principal` owed back to active deposits,
/// `reserved` for payouts in flight, and the free surplus. Rewards are paid
/// from the surplus only, so one deposit's reward can never eat into
/// another deposit's principal. Not `Sync` on its own; the ledger guards it
/// with its state lock.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Custody {
    /// Total value physically held, including in-flight reservations.
    held: u128,
    /// Principal of deposits that have not been paid out.
    principal: u128,
    /// Portion of `held` earmarked for payouts that have not settled yet.
    reserved: u128,
}

impl Custody {
    /// Creates an empty custody balance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total value held, reservations included.
    pub fn held(&self) -> u128 {
        self.held
    }

    /// Principal still owed to unpaid deposits, in-flight ones excluded.
    pub fn principal(&self) -> u128 {
        self.principal
    }

    /// Value earmarked for in-flight payouts.
    pub fn reserved(&self) -> u128 {
        self.reserved
    }

    /// Surplus free to back rewards: held minus principal minus reservations.
    pub fn available(&self) -> u128 {
        self.held
            .saturating_sub(self.principal)
            .saturating_sub(self.reserved)
    }

    /// Adds reward liquidity. Returns the new held total.
    ///
    /// # Errors
    ///
    /// Returns [`BalanceError::Overflow`] if the credit would exceed `u128::MAX`.
    pub fn credit(&mut self, amount: u128) -> Result<u128, BalanceError> {
        self.held = self
            .held
            .checked_add(amount)
            .ok_or(BalanceError::Overflow {
                current: self.held,
                credit: amount,
            })?;
        Ok(self.held)
    }

    /// Takes in a deposit's principal. Returns the new held total.
    ///
    /// # Errors
    ///
    /// Returns [`BalanceError::Overflow`] if the credit would exceed `u128::MAX`.
    pub fn lock_principal(&mut self, amount: u128) -> Result<u128, BalanceError> {
        let held = self.credit(amount)?;
        // principal <= held, so this cannot overflow once held did not.
        self.principal += amount;
        Ok(held)
    }

    /// Earmarks a payout of `principal + reward` that is about to leave.
    ///
    /// The principal moves from the owed pool into the reservation; the
    /// reward must fit in the free surplus.
    ///
    /// # Errors
    ///
    /// - [`BalanceError::ReservationMismatch`] if `principal` exceeds the
    ///   principal on the books.
    /// - [`BalanceError::Insufficient`] if the surplus cannot cover `reward`.
    /// - [`BalanceError::Overflow`] if `principal + reward` exceeds `u128::MAX`.
    pub fn reserve(&mut self, principal: u128, reward: u128) -> Result<(), BalanceError> {
        if principal > self.principal {
            return Err(BalanceError::ReservationMismatch {
                reserved: self.principal,
                requested: principal,
            });
        }
        let available = self.available();
        if reward > available {
            return Err(BalanceError::Insufficient {
                available,
                requested: reward,
            });
        }
        let payout = principal
            .checked_add(reward)
            .ok_or(BalanceError::Overflow {
                current: principal,
                credit: reward,
            })?;
        self.principal -= principal;
        self.reserved += payout;
        Ok(())
    }

    /// The reserved payout left the vault: drop it from both totals.
    pub fn settle(&mut self, payout: u128) -> Result<u128, BalanceError> {
        self.check_reserved(payout)?;
        self.reserved -= payout;
        self.held -= payout;
        Ok(self.held)
    }

    /// The reserved payout did not leave: the principal is owed again and
    /// the reward returns to the surplus.
    pub fn release(&mut self, principal: u128, reward: u128) -> Result<(), BalanceError> {
        let payout = principal.saturating_add(reward);
        self.check_reserved(payout)?;
        self.reserved -= payout;
        self.principal += principal;
        Ok(())
    }

    fn check_reserved(&self, amount: u128) -> Result<(), BalanceError> {
        if amount > self.reserved {
            return Err(BalanceError::ReservationMismatch {
                reserved: self.reserved,
                requested: amount,
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credit_accumulates() {
        let mut c = Custody::new();
        assert_eq!(c.credit(500).unwrap(), 500);
        assert_eq!(c.credit(300).unwrap(), 800);
        assert_eq!(c.available(), 800);
    }

    #[test]
    fn credit_overflow_rejected() {
        let mut c = Custody::new();
        c.credit(u128::MAX).unwrap();
        let err = c.credit(1).unwrap_err();
        assert!(matches!(err, BalanceError::Overflow { .. }));
        assert_eq!(c.held(), u128::MAX);
    }

    #[test]
    fn principal_is_not_surplus() {
        let mut c = Custody::new();
        assert_eq!(c.lock_principal(1000).unwrap(), 1000);
        c.credit(50).unwrap();
        assert_eq!(c.held(), 1050);
        assert_eq!(c.principal(), 1000);
        assert_eq!(c.available(), 50);
    }

    #[test]
    fn reserve_then_settle() {
        let mut c = Custody::new();
        c.lock_principal(1000).unwrap();
        c.credit(100).unwrap();
        c.reserve(400, 20).unwrap();
        assert_eq!(c.principal(), 600);
        assert_eq!(c.reserved(), 420);
        assert_eq!(c.available(), 80);

        assert_eq!(c.settle(420).unwrap(), 680);
        assert_eq!(c.reserved(), 0);
        assert_eq!(c.available(), 80);
        assert!(c.principal() <= c.held());
    }

    #[test]
    fn reserve_then_release_restores_everything() {
        let mut c = Custody::new();
        c.lock_principal(1000).unwrap();
        c.credit(10).unwrap();
        let before = c.clone();

        c.reserve(1000, 10).unwrap();
        assert_eq!(c.available(), 0);
        assert_eq!(c.principal(), 0);
        c.release(1000, 10).unwrap();

        assert_eq!(c, before);
    }

    #[test]
    fn reward_cannot_come_from_other_principal() {
        let mut c = Custody::new();
        c.lock_principal(1000).unwrap();
        c.lock_principal(1000).unwrap();
        let before = c.clone();

        let err = c.reserve(1000, 50).unwrap_err();
        assert_eq!(
            err,
            BalanceError::Insufficient {
                available: 0,
                requested: 50
            }
        );
        assert_eq!(c, before);

        // A zero reward is always coverable by the deposit's own principal.
        c.reserve(1000, 0).unwrap();
        c.settle(1000).unwrap();
        assert_eq!(c.principal(), 1000);
        assert_eq!(c.held(), 1000);
    }

    #[test]
    fn reserve_more_than_surplus_rejected() {
        let mut c = Custody::new();
        c.credit(100).unwrap();
        c.reserve(0, 60).unwrap();
        let err = c.reserve(0, 50).unwrap_err();
        assert_eq!(
            err,
            BalanceError::Insufficient {
                available: 40,
                requested: 50
            }
        );
    }

    #[test]
    fn reserve_unknown_principal_rejected() {
        let mut c = Custody::new();
        c.lock_principal(100).unwrap();
        assert!(matches!(
            c.reserve(101, 0),
            Err(BalanceError::ReservationMismatch { .. })
        ));
    }

    #[test]
    fn settle_without_reservation_rejected() {
        let mut c = Custody::new();
        c.credit(100).unwrap();
        assert!(matches!(
            c.settle(10),
            Err(BalanceError::ReservationMismatch { .. })
        ));
        assert!(matches!(
            c.release(0, 10),
            Err(BalanceError::ReservationMismatch { .. })
        ));
    }

    #[test]
    fn custody_serialization_roundtrip() {
        let mut c = Custody::new();
        c.lock_principal(42).unwrap();
        c.credit(8).unwrap();
        let json = serde_json::to_string(&c).expect("serialize");
        let recovered: Custody = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(recovered, c);
    }
}
