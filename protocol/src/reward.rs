//! # Reward Accrual
//!
//! Linear, simple-interest reward on a locked principal:
//!
//! ```text
//! reward = amount * rate.numerator * elapsed
//!          -----------------------------------
//!          rate.denominator * SECONDS_PER_YEAR
//! ```
//!
//! Multiplication happens before division so truncation only bites once, at
//! the very end. Every intermediate product is checked; an overflow is
//! reported as [`RewardOverflow`], never wrapped.

use thiserror::Error;

use crate::config::{AccrualPolicy, RewardRate, SECONDS_PER_YEAR};
use crate::time::Timestamp;

/// An intermediate product of the reward formula exceeded `u128`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("reward arithmetic overflow")]
pub struct RewardOverflow;

/// Seconds of accrual owed between `deposit_time` and `now`.
///
/// Saturates at zero if the clock reads earlier than the deposit. With
/// [`AccrualPolicy::CapAtUnlock`] the window ends at `unlock_time`.
pub fn accrual_window(
    deposit_time: Timestamp,
    unlock_time: Timestamp,
    now: Timestamp,
    policy: AccrualPolicy,
) -> u64 {
    let end = match policy {
        AccrualPolicy::Uncapped => now,
        AccrualPolicy::CapAtUnlock => now.min(unlock_time),
    };
    end.saturating_sub(deposit_time)
}

/// Reward earned by `amount` over `elapsed_secs` at `rate`.
pub fn linear_reward(
    amount: u128,
    rate: RewardRate,
    elapsed_secs: u64,
) -> Result<u128, RewardOverflow> {
    let numerator = amount
        .checked_mul(rate.numerator)
        .and_then(|v| v.checked_mul(elapsed_secs as u128))
        .ok_or(RewardOverflow)?;
    let denominator = rate
        .denominator
        .checked_mul(SECONDS_PER_YEAR as u128)
        .ok_or(RewardOverflow)?;
    // A zero denominator is rejected at config validation; treat it as
    // overflow rather than panic if one slips through.
    numerator.checked_div(denominator).ok_or(RewardOverflow)
}
