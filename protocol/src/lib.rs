// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Locked Wallet: Protocol Primitives
//!
//! Everything the Locked Wallet ledger needs that is not the ledger itself:
//! the reward formula, the custody balance, the clock, and the seam through
//! which value actually leaves the vault.
//!
//! ## Architecture
//!
//! - **config**: Rate constants, accrual policy, JSON-loadable ledger config.
//! - **identity**: The `Address` principal type. One owner, no delegation.
//! - **time**: `Clock` trait with a wall clock and a hand-cranked one.
//! - **reward**: Overflow-checked linear reward accrual.
//! - **vault**: Custodied balance and the external value-transfer seam.
//! - **units**: Decimal formatting for smallest-unit amounts.
//!
//! ## Design Philosophy
//!
//! 1. All amounts are `u128` in smallest units. No floats touch money.
//! 2. Every multiplication is checked. Wrapping arithmetic pays nobody.
//! 3. Collaborators are traits, so tests can refuse funds and bend time.

pub mod config;
pub mod identity;
pub mod reward;
pub mod time;
pub mod units;
pub mod vault;

pub use config::{AccrualPolicy, ConfigError, LedgerConfig, RewardRate};
pub use identity::Address;
pub use time::{Clock, ManualClock, SystemClock, Timestamp};
