// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Locked Wallet CLI
//!
//! Entry point for the `lockwallet` binary. Parses CLI arguments,
//! initializes logging, loads the ledger config, and dispatches:
//!
//! - `demo`   : scripted deposit / early-withdraw / withdraw interaction
//! - `reward` : quote a reward for an amount and elapsed time
//! - `config` : print the effective ledger config
//! - `version`: print build version information

mod cli;
mod logging;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use lockwallet_contracts::{LedgerError, LockedWallet, RecordingSink, TracingSink};
use lockwallet_protocol::config::{LedgerConfig, NATIVE_DECIMALS};
use lockwallet_protocol::reward::linear_reward;
use lockwallet_protocol::time::to_rfc3339;
use lockwallet_protocol::units::{format_units, parse_units};
use lockwallet_protocol::vault::InMemoryLedger;
use lockwallet_protocol::{Address, Clock, ManualClock, Timestamp};

use cli::{Commands, DemoArgs, GlobalArgs, LockWalletCli, RewardArgs};

fn main() -> Result<()> {
    let cli = LockWalletCli::parse();
    logging::init_logging(cli.global.verbose, cli.global.log_format)
        .context("failed to install log subscriber")?;

    match cli.command {
        Commands::Demo(args) => run_demo(&cli.global, args),
        Commands::Reward(args) => quote_reward(&cli.global, args),
        Commands::Config => print_config(&cli.global),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Loads the ledger config from `--config`, or the defaults.
fn load_config(global: &GlobalArgs) -> Result<LedgerConfig> {
    match &global.config {
        Some(path) => {
            let config = LedgerConfig::from_json_file(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?;
            tracing::info!(path = %path.display(), "ledger config loaded");
            Ok(config)
        }
        None => Ok(LedgerConfig::default()),
    }
}

fn parse_amount(raw: &str, what: &str) -> Result<u128> {
    parse_units(raw, NATIVE_DECIMALS).with_context(|| format!("invalid {what}: {raw}"))
}

/// Unlock time `lock_secs` after `now`.
fn unlock_after(now: Timestamp, lock_secs: u64) -> Result<Timestamp> {
    now.checked_add(lock_secs)
        .with_context(|| format!("lock period of {lock_secs}s overflows the clock"))
}

fn units(amount: u128) -> String {
    format_units(amount, NATIVE_DECIMALS)
}

/// Scripted interaction: two funded accounts, one deposit, a rejected early
/// withdrawal by a non-owner, and optionally the owner's withdrawal once
/// the deposit unlocks.
fn run_demo(global: &GlobalArgs, args: DemoArgs) -> Result<()> {
    let config = load_config(global)?;
    let deposit_amount = parse_amount(&args.deposit, "deposit amount")?;
    let initial_balance = parse_amount(&args.initial_balance, "initial balance")?;
    let liquidity = parse_amount(&args.reward_liquidity, "reward liquidity")?;

    let owner = Address::from("owner");
    let beneficiary = Address::from("beneficiary");

    let clock = Arc::new(ManualClock::starting_now());
    let bank = Arc::new(InMemoryLedger::new());
    let recorder = Arc::new(RecordingSink::new());
    let wallet = LockedWallet::new(owner.clone(), config, clock.clone(), bank.clone())
        .context("failed to create locked wallet")?
        .with_sink(Arc::new(TracingSink))
        .with_sink(recorder.clone());

    bank.credit(&owner, initial_balance)?;
    bank.credit(&beneficiary, initial_balance)?;

    println!("Initial Owner Balance:       {}", units(bank.balance_of(&owner)));
    println!("Initial Beneficiary Balance: {}", units(bank.balance_of(&beneficiary)));

    // Deposit funds.
    let unlock_time = unlock_after(clock.now(), args.lock_secs)?;
    bank.debit(&owner, deposit_amount)
        .context("owner cannot fund the deposit")?;
    let receipt = wallet.deposit(&owner, unlock_time, deposit_amount)?;
    println!(
        "Deposit #{}: {} locked until {}",
        receipt.index,
        units(receipt.amount),
        to_rfc3339(receipt.unlock_time)
    );
    println!("Contract Balance:            {}", units(wallet.custodied_value()));

    // Try to withdraw before unlock time (should fail).
    match wallet.withdraw(&beneficiary, receipt.index) {
        Err(err @ (LedgerError::NotOwner | LedgerError::StillLocked { .. })) => {
            tracing::info!(error = %err, "early withdrawal rejected");
            println!("Withdrawal before unlock time failed as expected");
        }
        Err(err) => return Err(err).context("early withdrawal failed unexpectedly"),
        Ok(_) => anyhow::bail!("early withdrawal by a non-owner succeeded"),
    }

    if args.advance {
        bank.debit(&owner, liquidity)
            .context("owner cannot fund reward liquidity")?;
        wallet.fund_rewards(&owner, liquidity)?;

        clock.set(unlock_time);
        let receipt = wallet
            .withdraw(&owner, receipt.index)
            .context("withdrawal after unlock failed")?;
        println!(
            "Withdrew deposit #{}: principal {} + reward {}",
            receipt.index,
            units(receipt.amount),
            units(receipt.reward)
        );
    }

    println!("Final Owner Balance:         {}", units(bank.balance_of(&owner)));
    println!("Final Beneficiary Balance:   {}", units(bank.balance_of(&beneficiary)));
    println!("Deposits:                    {}", wallet.deposits_count());
    println!("Total Balance:               {}", units(wallet.total_balance()?));
    println!("Events:                      {}", recorder.len());

    let snapshot = serde_json::to_string_pretty(&wallet.snapshot())
        .context("failed to serialize ledger snapshot")?;
    println!("{snapshot}");
    Ok(())
}

/// Prints the reward `amount` would earn over `elapsed` seconds.
fn quote_reward(global: &GlobalArgs, args: RewardArgs) -> Result<()> {
    let config = load_config(global)?;
    let amount = parse_amount(&args.amount, "amount")?;
    let reward = linear_reward(amount, config.reward_rate, args.elapsed)
        .context("reward does not fit in u128")?;

    tracing::debug!(amount = %amount, elapsed = args.elapsed, reward = %reward, "reward quoted");
    println!(
        "{} over {}s at {} = {}",
        units(amount),
        args.elapsed,
        config.reward_rate,
        units(reward)
    );
    Ok(())
}

/// Prints the effective config as JSON.
fn print_config(global: &GlobalArgs) -> Result<()> {
    let config = load_config(global)?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("lockwallet {}", env!("CARGO_PKG_VERSION"));
    println!("reward     {}", LedgerConfig::default().reward_rate);
}
