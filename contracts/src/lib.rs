//! # Locked Wallet Contracts
//!
//! Ledger logic for the Locked Wallet: a single-owner vault where deposits
//! sit behind an unlock time and earn a linear reward until the owner takes
//! them out.
//!
//! - **Locked Wallet**: the deposit ledger itself: deposit, withdraw,
//!   reward queries, aggregate balances, snapshots.
//! - **Events**: post-commit notifications and the sinks that consume them.
//!
//! ## Design Principles
//!
//! 1. All monetary operations check for overflow. Wrapping arithmetic and
//!    money do not mix.
//! 2. State transitions are explicit: enum variants, not boolean flags.
//! 3. The external payout happens between two locked phases, so a failed or
//!    re-entrant transfer can never pay the same deposit twice.
//! 4. Every public type is serializable (serde) for export and inspection.

pub mod events;
pub mod locked_wallet;

pub use events::{EventSink, LedgerEvent, RecordingSink, TracingSink};
pub use locked_wallet::{
    Deposit, DepositReceipt, DepositStatus, LedgerError, LedgerSnapshot, LockedWallet,
    WithdrawReceipt,
};
