//! # Ledger Configuration & Constants
//!
//! Every magic number in the Locked Wallet lives here. The reward rate is a
//! rational `numerator / denominator` per year rather than a float, so the
//! reward formula stays in integer arithmetic end to end.
//!
//! A [`LedgerConfig`] can be built in code (`LedgerConfig::default()` gives
//! the reference 5% APR, uncapped) or loaded from a JSON file.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Time Constants
// ---------------------------------------------------------------------------

/// Seconds in a (non-leap) year: `365 * 24 * 60 * 60`.
///
/// The reward formula annualizes against this, leap years included. Nobody
/// gets an extra day of yield in February.
pub const SECONDS_PER_YEAR: u64 = 365 * 24 * 60 * 60;

/// One day in seconds.
pub const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Default lock period used by the scripted interaction: one hour.
pub const DEFAULT_LOCK_SECS: u64 = 60 * 60;

// ---------------------------------------------------------------------------
// Reward Parameters
// ---------------------------------------------------------------------------

/// Reference annual rate numerator (5 / 100 = 5% per year).
pub const DEFAULT_RATE_NUMERATOR: u128 = 5;

/// Reference annual rate denominator.
pub const DEFAULT_RATE_DENOMINATOR: u128 = 100;

/// Upper bound on the configured rate, expressed as a multiple of 100%.
/// Anything above 100x per year is a typo, not a product decision.
pub const MAX_RATE_MULTIPLE: u128 = 100;

// ---------------------------------------------------------------------------
// Denomination
// ---------------------------------------------------------------------------

/// Decimal places of the native unit. 10^18 smallest units make one whole
/// unit, the same split as wei and ether.
pub const NATIVE_DECIMALS: u32 = 18;

/// One whole native unit in smallest units.
pub const ONE_UNIT: u128 = 1_000_000_000_000_000_000;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised while building or loading a [`LedgerConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The rate denominator is zero. Division by zero is not a rate.
    #[error("reward rate denominator must be non-zero")]
    ZeroDenominator,

    /// The configured rate exceeds the sanity ceiling.
    #[error("reward rate {numerator}/{denominator} exceeds {max}x per year")]
    RateTooHigh {
        /// Configured numerator.
        numerator: u128,
        /// Configured denominator.
        denominator: u128,
        /// The ceiling multiple that was exceeded.
        max: u128,
    },

    /// The config file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid JSON for a [`LedgerConfig`].
    #[error("malformed config: {0}")]
    Parse(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// RewardRate
// ---------------------------------------------------------------------------

/// An annual reward rate as an exact fraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardRate {
    /// Numerator of the annual rate.
    pub numerator: u128,
    /// Denominator of the annual rate. Must be non-zero.
    pub denominator: u128,
}

impl RewardRate {
    /// Builds a rate from basis points (1 bp = 0.01%). 500 bps = 5% APR.
    pub fn from_bps(bps: u32) -> Self {
        Self {
            numerator: bps as u128,
            denominator: 10_000,
        }
    }

    /// Checks the rate is usable by the reward formula.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.denominator == 0 {
            return Err(ConfigError::ZeroDenominator);
        }
        let ceiling = self
            .denominator
            .checked_mul(MAX_RATE_MULTIPLE)
            .unwrap_or(u128::MAX);
        if self.numerator > ceiling {
            return Err(ConfigError::RateTooHigh {
                numerator: self.numerator,
                denominator: self.denominator,
                max: MAX_RATE_MULTIPLE,
            });
        }
        Ok(())
    }
}

impl Default for RewardRate {
    fn default() -> Self {
        Self {
            numerator: DEFAULT_RATE_NUMERATOR,
            denominator: DEFAULT_RATE_DENOMINATOR,
        }
    }
}

impl fmt::Display for RewardRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.denominator == 0 {
            return write!(f, "{}/0", self.numerator);
        }
        // Hundredths of a percent, truncated.
        let centi_pct = self.numerator.saturating_mul(10_000) / self.denominator;
        write!(f, "{}.{:02}%", centi_pct / 100, centi_pct % 100)
    }
}

// ---------------------------------------------------------------------------
// AccrualPolicy
// ---------------------------------------------------------------------------

/// Whether reward keeps accruing after a deposit's unlock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccrualPolicy {
    /// Reward accrues for the full time since deposit, however long the
    /// owner waits to withdraw.
    #[default]
    Uncapped,
    /// Reward stops growing at the deposit's unlock time.
    CapAtUnlock,
}

// ---------------------------------------------------------------------------
// LedgerConfig
// ---------------------------------------------------------------------------

/// Tunable parameters for a Locked Wallet ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Annual reward rate.
    pub reward_rate: RewardRate,
    /// Behaviour of reward accrual past the unlock time.
    pub accrual: AccrualPolicy,
}

impl LedgerConfig {
    /// Validates every field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.reward_rate.validate()
    }

    /// Loads and validates a config from a JSON file. Missing fields take
    /// their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: LedgerConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }
}
