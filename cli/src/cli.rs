//! # CLI Interface
//!
//! Defines the command-line argument structure for `lockwallet` using
//! `clap` derive. Supports four subcommands: `demo`, `reward`, `config`,
//! and `version`.

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::logging::LogFormat;

/// Locked Wallet command-line driver.
///
/// Runs the scripted deposit/withdraw interaction against an in-memory
/// ledger, quotes rewards, and prints the effective configuration.
#[derive(Parser, Debug)]
#[command(
    name = "lockwallet",
    about = "Locked Wallet: time-locked deposits with linear rewards",
    version,
    propagate_version = true
)]
pub struct LockWalletCli {
    /// Options shared by every subcommand.
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every subcommand.
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Path to a ledger configuration file (JSON).
    ///
    /// When omitted, the reference 5% APR with uncapped accrual is used.
    #[arg(long, short = 'c', global = true, env = "LOCKWALLET_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log output format.
    #[arg(
        long,
        global = true,
        env = "LOCKWALLET_LOG_FORMAT",
        value_enum,
        ignore_case = true,
        default_value_t = LogFormat::Pretty
    )]
    pub log_format: LogFormat,

    /// Raise log verbosity (`-v` debug, `-vv` trace). `RUST_LOG` overrides.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Top-level subcommands for the `lockwallet` binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the scripted interaction: deposit, early withdraw attempt, and
    /// (optionally) a withdrawal after unlock.
    Demo(DemoArgs),
    /// Quote the reward on an amount over an elapsed period.
    Reward(RewardArgs),
    /// Print the effective ledger configuration as JSON.
    Config,
    /// Print version information and exit.
    Version,
}

/// Arguments for the `demo` subcommand.
#[derive(Args, Debug)]
pub struct DemoArgs {
    /// Amount to deposit, in whole units (decimals allowed).
    #[arg(long, default_value = "0.000001")]
    pub deposit: String,

    /// Lock period in seconds.
    #[arg(long, default_value_t = lockwallet_protocol::config::DEFAULT_LOCK_SECS)]
    pub lock_secs: u64,

    /// Starting external balance of each scripted account, in whole units.
    #[arg(long, default_value = "10000")]
    pub initial_balance: String,

    /// Reward liquidity the owner adds before withdrawing, in whole units.
    #[arg(long, default_value = "0.001")]
    pub reward_liquidity: String,

    /// Advance the clock past the unlock time and withdraw as the owner.
    #[arg(long)]
    pub advance: bool,
}

/// Arguments for the `reward` subcommand.
#[derive(Args, Debug)]
pub struct RewardArgs {
    /// Principal in whole units (decimals allowed).
    #[arg(long)]
    pub amount: String,

    /// Elapsed locked time in seconds.
    #[arg(long)]
    pub elapsed: u64,
}
