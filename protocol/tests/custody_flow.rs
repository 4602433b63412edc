//! Cross-module tests for the protocol primitives.
//!
//! These compose what the ledger composes: a clock drives the accrual
//! window, the reward formula prices it, custody reserves the payout, and
//! the external ledger either accepts it or refuses it.

use std::sync::Arc;
use std::thread;

use lockwallet_protocol::config::{AccrualPolicy, LedgerConfig, ONE_UNIT, SECONDS_PER_YEAR};
use lockwallet_protocol::reward::{accrual_window, linear_reward};
use lockwallet_protocol::units::{format_units, parse_units};
use lockwallet_protocol::vault::{Custody, InMemoryLedger, TransferError, ValueTransfer};
use lockwallet_protocol::{Address, Clock, ManualClock, RewardRate};

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

/// Prices a payout of `amount` deposited at `deposited`, unlocking at
/// `unlock`, as of the clock's current time.
fn payout(clock: &ManualClock, config: &LedgerConfig, amount: u128, deposited: u64, unlock: u64) -> u128 {
    let elapsed = accrual_window(deposited, unlock, clock.now(), config.accrual);
    amount + linear_reward(amount, config.reward_rate, elapsed).unwrap()
}

// ---------------------------------------------------------------------------
// Flows
// ---------------------------------------------------------------------------

#[test]
fn reserve_transfer_settle() {
    let clock = ManualClock::new(0);
    let config = LedgerConfig::default();
    let bank = InMemoryLedger::new();
    let owner = Address::from("owner");

    let mut custody = Custody::new();
    custody.lock_principal(ONE_UNIT).unwrap();
    custody.credit(ONE_UNIT / 10).unwrap();

    clock.advance(SECONDS_PER_YEAR);
    let due = payout(&clock, &config, ONE_UNIT, 0, SECONDS_PER_YEAR);
    assert_eq!(format_units(due, 18), "1.05");

    custody.reserve(ONE_UNIT, due - ONE_UNIT).unwrap();
    bank.transfer(&owner, due).unwrap();
    custody.settle(due).unwrap();

    assert_eq!(bank.balance_of(&owner), due);
    assert_eq!(custody.held(), ONE_UNIT / 20);
}

#[test]
fn reserve_refuse_release() {
    let bank = InMemoryLedger::new();
    let owner = Address::from("owner");
    bank.refuse(&owner);

    let mut custody = Custody::new();
    custody.lock_principal(500).unwrap();
    custody.credit(5).unwrap();
    let before = custody.clone();

    custody.reserve(500, 5).unwrap();
    let err = bank.transfer(&owner, 505).unwrap_err();
    assert!(matches!(err, TransferError::Refused { .. }));
    custody.release(500, 5).unwrap();

    assert_eq!(custody, before);
    assert_eq!(bank.balance_of(&owner), 0);
}

#[test]
fn unfunded_reward_leaves_other_principal_alone() {
    let clock = ManualClock::new(0);
    let config = LedgerConfig::default();

    let mut custody = Custody::new();
    custody.lock_principal(ONE_UNIT).unwrap();
    custody.lock_principal(ONE_UNIT).unwrap();

    clock.advance(SECONDS_PER_YEAR);
    let due = payout(&clock, &config, ONE_UNIT, 0, SECONDS_PER_YEAR);
    assert!(custody.reserve(ONE_UNIT, due - ONE_UNIT).is_err());
    assert_eq!(custody.principal(), 2 * ONE_UNIT);
    assert_eq!(custody.held(), 2 * ONE_UNIT);
}

#[test]
fn capped_and_uncapped_agree_until_unlock() {
    let clock = ManualClock::new(0);
    let uncapped = LedgerConfig::default();
    let capped = LedgerConfig {
        accrual: AccrualPolicy::CapAtUnlock,
        ..LedgerConfig::default()
    };
    let unlock = SECONDS_PER_YEAR / 2;

    for _ in 0..6 {
        let a = payout(&clock, &uncapped, ONE_UNIT, 0, unlock);
        let b = payout(&clock, &capped, ONE_UNIT, 0, unlock);
        if clock.now() <= unlock {
            assert_eq!(a, b);
        } else {
            assert!(a > b);
        }
        clock.advance(SECONDS_PER_YEAR / 8);
    }
}

#[test]
fn basis_point_rate_matches_fraction() {
    let bps = RewardRate::from_bps(500);
    let frac = RewardRate::default();
    for elapsed in [0, 1, 86_400, SECONDS_PER_YEAR / 3, SECONDS_PER_YEAR] {
        assert_eq!(
            linear_reward(7 * ONE_UNIT, bps, elapsed),
            linear_reward(7 * ONE_UNIT, frac, elapsed)
        );
    }
}

#[test]
fn parsed_amounts_price_like_literals() {
    let amount = parse_units("0.000001", 18).unwrap();
    let reward = linear_reward(amount, RewardRate::default(), SECONDS_PER_YEAR).unwrap();
    assert_eq!(format_units(reward, 18), "0.00000005");
}

#[test]
fn shared_ledger_credits_from_many_threads() {
    let bank = Arc::new(InMemoryLedger::new());
    let owner = Address::from("owner");

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let bank = Arc::clone(&bank);
            let owner = owner.clone();
            thread::spawn(move || {
                for _ in 0..1_000 {
                    bank.transfer(&owner, 1).unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(bank.balance_of(&owner), 8_000);
}
