//! # Locked Wallet Contract
//!
//! A single-owner vault of time-locked deposits. Anyone may deposit value
//! with a future unlock time; only the owner may withdraw, one whole deposit
//! at a time, once that deposit has unlocked. Each deposit earns a linear
//! reward on its principal for as long as it stays in the vault.
//!
//! The lifecycle of one deposit is:
//!
//! 1. **Deposit**: appended at the next index, `Active`. Never removed.
//! 2. **Accrue**: reward grows with elapsed time, recomputed on every read.
//! 3. **Withdraw**: owner-only, after unlock. Principal plus reward leaves
//!    through the external [`ValueTransfer`] and the deposit becomes
//!    `Withdrawn` for good.
//!
//! ## Withdrawal commit protocol
//!
//! The external transfer may fail, and it may call back into the ledger.
//! A withdrawal therefore runs in three steps:
//!
//! ```text
//! lock  -> validate, reserve payout, mark Pending -> unlock
//!          transfer(owner, amount + reward)
//! lock  -> Ok:  settle payout, mark Withdrawn     -> unlock -> emit Withdraw
//!          Err: release payout, mark Active       -> unlock -> TransferFailed
//! ```
//!
//! A second withdrawal of the same index, whether concurrent or re-entrant,
//! sees `Pending` and fails with [`LedgerError::AlreadyWithdrawn`]. Readers
//! treat `Pending` as `Active`: until the transfer commits, nothing has
//! happened.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use lockwallet_protocol::config::LedgerConfig;
use lockwallet_protocol::reward::{accrual_window, linear_reward, RewardOverflow};
use lockwallet_protocol::vault::{BalanceError, Custody, TransferError, ValueTransfer};
use lockwallet_protocol::{Address, Clock, ConfigError, Timestamp};

use crate::events::{EventSink, LedgerEvent};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Deposits and reward top-ups must carry a non-zero amount.
    #[error("deposit amount must be greater than 0")]
    InvalidAmount,

    /// The requested unlock time is not strictly in the future.
    #[error("unlock time must be in the future: unlock {unlock_time}, now {now}")]
    InvalidUnlockTime {
        /// Requested unlock time.
        unlock_time: Timestamp,
        /// Ledger time at the call.
        now: Timestamp,
    },

    /// No deposit exists at this index.
    #[error("deposit index {index} out of range ({count} deposits)")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of deposits ever recorded.
        count: usize,
    },

    /// Only the owner may withdraw.
    #[error("not the owner")]
    NotOwner,

    /// The deposit has not reached its unlock time.
    #[error("funds are still locked until {unlock_time} (now {now})")]
    StillLocked {
        /// The deposit's unlock time.
        unlock_time: Timestamp,
        /// Ledger time at the call.
        now: Timestamp,
    },

    /// The deposit has been withdrawn, or a withdrawal of it is in flight.
    #[error("deposit {index} already withdrawn")]
    AlreadyWithdrawn {
        /// Index of the deposit.
        index: usize,
    },

    /// An amount or reward computation exceeded `u128`.
    #[error("arithmetic overflow")]
    ArithmeticOverflow,

    /// The external payout failed; the withdrawal was rolled back.
    #[error("transfer failed: {0}")]
    TransferFailed(#[from] TransferError),

    /// The ledger config is unusable.
    #[error("invalid ledger config: {0}")]
    Config(#[from] ConfigError),

    /// Custody bookkeeping broke an internal invariant.
    #[error("custody invariant violated: {0}")]
    Custody(#[from] BalanceError),
}

impl From<RewardOverflow> for LedgerError {
    fn from(_: RewardOverflow) -> Self {
        LedgerError::ArithmeticOverflow
    }
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Where a deposit is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DepositStatus {
    /// Locked or unlocked, but not paid out.
    Active,
    /// A withdrawal is transferring value right now. Internal only.
    Pending,
    /// Paid out. Terminal.
    Withdrawn,
}

impl fmt::Display for DepositStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DepositStatus::Active => write!(f, "Active"),
            DepositStatus::Pending => write!(f, "Pending"),
            DepositStatus::Withdrawn => write!(f, "Withdrawn"),
        }
    }
}

/// One locked deposit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deposit {
    /// Who made the deposit.
    pub depositor: Address,
    /// Principal in smallest units. Always > 0.
    pub amount: u128,
    /// Earliest time the owner may withdraw.
    pub unlock_time: Timestamp,
    /// When the deposit was recorded; reward accrues from here.
    pub deposit_time: Timestamp,
    /// Lifecycle status.
    pub status: DepositStatus,
}

impl Deposit {
    /// `true` once the deposit has been paid out.
    pub fn is_withdrawn(&self) -> bool {
        self.status == DepositStatus::Withdrawn
    }

    /// The deposit as outside observers see it: an in-flight withdrawal has
    /// not happened yet.
    fn committed(&self) -> Deposit {
        let mut view = self.clone();
        if view.status == DepositStatus::Pending {
            view.status = DepositStatus::Active;
        }
        view
    }
}

/// Returned by [`LockedWallet::deposit`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositReceipt {
    /// Permanent index of the new deposit.
    pub index: usize,
    /// Who made the deposit.
    pub depositor: Address,
    /// Principal locked.
    pub amount: u128,
    /// When the principal becomes withdrawable.
    pub unlock_time: Timestamp,
}

/// Returned by [`LockedWallet::withdraw`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawReceipt {
    /// Index of the withdrawn deposit.
    pub index: usize,
    /// Principal paid.
    pub amount: u128,
    /// Reward paid.
    pub reward: u128,
    /// Ledger time at which the payout was computed.
    pub withdrawn_at: Timestamp,
}

impl WithdrawReceipt {
    /// Principal plus reward.
    pub fn total(&self) -> u128 {
        // Checked when the payout was computed.
        self.amount + self.reward
    }
}

/// Point-in-time copy of the whole ledger, taken under one read lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// The fixed owner.
    pub owner: Address,
    /// Active configuration.
    pub config: LedgerConfig,
    /// Ledger time the snapshot was taken at.
    pub taken_at: Timestamp,
    /// Total value held.
    pub custodied_value: u128,
    /// Every deposit ever recorded, by index.
    pub deposits: Vec<Deposit>,
}

// ---------------------------------------------------------------------------
// LockedWallet
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct LedgerState {
    deposits: Vec<Deposit>,
    custody: Custody,
}

impl LedgerState {
    fn get(&self, index: usize) -> Result<&Deposit, LedgerError> {
        self.deposits.get(index).ok_or(LedgerError::IndexOutOfRange {
            index,
            count: self.deposits.len(),
        })
    }
}

/// A single-owner vault of time-locked, reward-bearing deposits.
///
/// `Send + Sync`: share it behind an `Arc`. Mutations serialize on one
/// internal `RwLock`; reads run concurrently against a consistent view.
pub struct LockedWallet {
    owner: Address,
    config: LedgerConfig,
    state: RwLock<LedgerState>,
    clock: Arc<dyn Clock>,
    transfer: Arc<dyn ValueTransfer>,
    sinks: Vec<Arc<dyn EventSink>>,
}

impl fmt::Debug for LockedWallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockedWallet")
            .field("owner", &self.owner)
            .field("config", &self.config)
            .field("state", &*self.state.read())
            .field("sinks", &self.sinks.len())
            .finish_non_exhaustive()
    }
}

impl LockedWallet {
    /// Creates an empty ledger owned by `owner`. The owner can never change.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Config`] if `config` fails validation.
    pub fn new(
        owner: Address,
        config: LedgerConfig,
        clock: Arc<dyn Clock>,
        transfer: Arc<dyn ValueTransfer>,
    ) -> Result<Self, LedgerError> {
        config.validate()?;
        info!(owner = %owner, rate = %config.reward_rate, accrual = ?config.accrual, "locked wallet created");
        Ok(Self {
            owner,
            config,
            state: RwLock::new(LedgerState::default()),
            clock,
            transfer,
            sinks: Vec::new(),
        })
    }

    /// Registers a sink for committed events.
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// The fixed owner.
    pub fn owner(&self) -> &Address {
        &self.owner
    }

    /// The active configuration.
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Locks `amount` until `unlock_time`. Open to any caller.
    ///
    /// The value is assumed to arrive with the call, as with a payable
    /// contract method; custody grows by `amount`.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidAmount`] if `amount` is 0.
    /// - [`LedgerError::InvalidUnlockTime`] if `unlock_time` is not after now.
    /// - [`LedgerError::ArithmeticOverflow`] if custody would overflow.
    pub fn deposit(
        &self,
        caller: &Address,
        unlock_time: Timestamp,
        amount: u128,
    ) -> Result<DepositReceipt, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }

        let receipt = {
            let mut state = self.state.write();
            let now = self.clock.now();
            if unlock_time <= now {
                return Err(LedgerError::InvalidUnlockTime { unlock_time, now });
            }
            state
                .custody
                .lock_principal(amount)
                .map_err(|_| LedgerError::ArithmeticOverflow)?;

            let index = state.deposits.len();
            state.deposits.push(Deposit {
                depositor: caller.clone(),
                amount,
                unlock_time,
                deposit_time: now,
                status: DepositStatus::Active,
            });
            DepositReceipt {
                index,
                depositor: caller.clone(),
                amount,
                unlock_time,
            }
        };

        info!(
            index = receipt.index,
            depositor = %caller,
            amount = %amount,
            unlock_time,
            "deposit recorded"
        );
        self.emit(LedgerEvent::NewDeposit {
            index: receipt.index,
            depositor: receipt.depositor.clone(),
            amount,
            unlock_time,
        });
        Ok(receipt)
    }

    /// Pays deposit `index` plus its reward to the owner.
    ///
    /// # Errors
    ///
    /// Checked in this order:
    /// - [`LedgerError::NotOwner`] if `caller` is not the owner.
    /// - [`LedgerError::IndexOutOfRange`] if no such deposit exists.
    /// - [`LedgerError::StillLocked`] if the unlock time has not arrived.
    /// - [`LedgerError::AlreadyWithdrawn`] if it was paid out or is being paid.
    /// - [`LedgerError::ArithmeticOverflow`] if the payout overflows.
    /// - [`LedgerError::TransferFailed`] if reward liquidity cannot cover
    ///   the reward or the external transfer fails. Nothing changes in that
    ///   case.
    pub fn withdraw(&self, caller: &Address, index: usize) -> Result<WithdrawReceipt, LedgerError> {
        if *caller != self.owner {
            warn!(caller = %caller, index, "withdraw rejected: not the owner");
            return Err(LedgerError::NotOwner);
        }

        // Phase 1: validate and mark pending.
        let (amount, reward, payout, now) = {
            let mut state = self.state.write();
            let now = self.clock.now();
            let deposit = state.get(index)?;

            if now < deposit.unlock_time {
                return Err(LedgerError::StillLocked {
                    unlock_time: deposit.unlock_time,
                    now,
                });
            }
            if deposit.status != DepositStatus::Active {
                return Err(LedgerError::AlreadyWithdrawn { index });
            }

            let amount = deposit.amount;
            let reward = self.reward_at(deposit, now)?;
            let payout = amount
                .checked_add(reward)
                .ok_or(LedgerError::ArithmeticOverflow)?;

            // The reward must come from surplus, never from principal owed
            // to other deposits.
            state.custody.reserve(amount, reward).map_err(|e| match e {
                BalanceError::Insufficient {
                    available,
                    requested,
                } => LedgerError::TransferFailed(TransferError::InsufficientCustody {
                    available,
                    requested,
                }),
                other => LedgerError::Custody(other),
            })?;
            state.deposits[index].status = DepositStatus::Pending;
            (amount, reward, payout, now)
        };

        debug!(index, payout = %payout, "withdrawal pending, transferring");

        // Phase 2: move the value, no lock held.
        let outcome = self.transfer.transfer(&self.owner, payout);

        // Phase 3: finalize or roll back.
        {
            let mut state = self.state.write();
            match outcome {
                Ok(()) => {
                    state.deposits[index].status = DepositStatus::Withdrawn;
                    state.custody.settle(payout)?;
                }
                Err(err) => {
                    state.deposits[index].status = DepositStatus::Active;
                    state.custody.release(amount, reward)?;
                    drop(state);
                    warn!(index, payout = %payout, error = %err, "withdrawal rolled back");
                    return Err(LedgerError::TransferFailed(err));
                }
            }
        }

        info!(index, amount = %amount, reward = %reward, "deposit withdrawn");
        self.emit(LedgerEvent::Withdraw {
            index,
            amount,
            reward,
        });
        Ok(WithdrawReceipt {
            index,
            amount,
            reward,
            withdrawn_at: now,
        })
    }

    /// Adds reward liquidity to custody. Open to any caller. Returns the new
    /// custodied value.
    ///
    /// Deposits only bring in principal, and principal stays owed to its
    /// own deposit. Rewards are paid from this liquidity alone; a withdrawal
    /// whose reward the liquidity cannot cover fails with
    /// [`LedgerError::TransferFailed`].
    pub fn fund_rewards(&self, caller: &Address, amount: u128) -> Result<u128, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }
        let held = self
            .state
            .write()
            .custody
            .credit(amount)
            .map_err(|_| LedgerError::ArithmeticOverflow)?;

        info!(funder = %caller, amount = %amount, custodied = %held, "reward liquidity added");
        self.emit(LedgerEvent::RewardsFunded {
            funder: caller.clone(),
            amount,
        });
        Ok(held)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Reward accrued so far on deposit `index`; 0 once withdrawn.
    pub fn calculate_reward(&self, index: usize) -> Result<u128, LedgerError> {
        let state = self.state.read();
        let deposit = state.get(index)?;
        self.reward_at(deposit, self.clock.now())
    }

    /// Number of deposits ever recorded, withdrawn ones included.
    pub fn deposits_count(&self) -> usize {
        self.state.read().deposits.len()
    }

    /// Principal plus accrued reward over every deposit not yet withdrawn,
    /// recomputed now.
    pub fn total_balance(&self) -> Result<u128, LedgerError> {
        let state = self.state.read();
        let now = self.clock.now();
        let total = state
            .deposits
            .iter()
            .filter(|d| !d.is_withdrawn())
            .try_fold(0u128, |acc, d| {
                let reward = self.reward_at(d, now)?;
                acc.checked_add(d.amount)
                    .and_then(|v| v.checked_add(reward))
                    .ok_or(LedgerError::ArithmeticOverflow)
            })?;
        debug!(total = %total, "total balance computed");
        Ok(total)
    }

    /// Copy of deposit `index`.
    pub fn get_deposit(&self, index: usize) -> Result<Deposit, LedgerError> {
        Ok(self.state.read().get(index)?.committed())
    }

    /// Seconds until deposit `index` unlocks; 0 once it has.
    pub fn time_until_unlock(&self, index: usize) -> Result<u64, LedgerError> {
        let state = self.state.read();
        let deposit = state.get(index)?;
        Ok(deposit.unlock_time.saturating_sub(self.clock.now()))
    }

    /// Total value currently held by the vault.
    pub fn custodied_value(&self) -> u128 {
        self.state.read().custody.held()
    }

    /// Consistent copy of the whole ledger.
    pub fn snapshot(&self) -> LedgerSnapshot {
        let state = self.state.read();
        LedgerSnapshot {
            owner: self.owner.clone(),
            config: self.config,
            taken_at: self.clock.now(),
            custodied_value: state.custody.held(),
            deposits: state.deposits.iter().map(Deposit::committed).collect(),
        }
    }

    // -----------------------------------------------------------------------
    // Internal Helpers
    // -----------------------------------------------------------------------

    fn reward_at(&self, deposit: &Deposit, now: Timestamp) -> Result<u128, LedgerError> {
        if deposit.is_withdrawn() {
            return Ok(0);
        }
        let elapsed = accrual_window(
            deposit.deposit_time,
            deposit.unlock_time,
            now,
            self.config.accrual,
        );
        Ok(linear_reward(deposit.amount, self.config.reward_rate, elapsed)?)
    }

    fn emit(&self, event: LedgerEvent) {
        for sink in &self.sinks {
            sink.publish(&event);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
