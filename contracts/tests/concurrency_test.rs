//! Concurrency and re-entrancy tests for the Locked Wallet.
//!
//! The withdrawal path releases the ledger lock while value is in flight.
//! These tests hammer that window: many threads racing on one index, a
//! transfer that calls back into the ledger, and readers observing the
//! ledger mid-payout.

use std::sync::{Arc, Barrier, Mutex, Weak};
use std::thread;
use std::time::Duration;

use lockwallet_contracts::{DepositStatus, LedgerError, LockedWallet};
use lockwallet_protocol::config::LedgerConfig;
use lockwallet_protocol::vault::{InMemoryLedger, TransferError, ValueTransfer};
use lockwallet_protocol::{Address, ManualClock, Timestamp};

const START: Timestamp = 1_720_000_000;

fn owner() -> Address {
    Address::from("owner")
}

// ---------------------------------------------------------------------------
// Test Transfers
// ---------------------------------------------------------------------------

/// Pays through an inner ledger after a short pause, widening the race.
struct SlowTransfer {
    inner: InMemoryLedger,
    delay: Duration,
}

impl ValueTransfer for SlowTransfer {
    fn transfer(&self, to: &Address, amount: u128) -> Result<(), TransferError> {
        thread::sleep(self.delay);
        self.inner.transfer(to, amount)
    }
}

/// Calls back into the wallet while the payout is in flight, the way a
/// malicious recipient would.
#[derive(Default)]
struct CallbackTransfer {
    inner: InMemoryLedger,
    wallet: Mutex<Weak<LockedWallet>>,
    observed: Mutex<Vec<String>>,
}

impl CallbackTransfer {
    fn attach(&self, wallet: &Arc<LockedWallet>) {
        *self.wallet.lock().unwrap() = Arc::downgrade(wallet);
    }

    fn observed(&self) -> Vec<String> {
        self.observed.lock().unwrap().clone()
    }
}

impl ValueTransfer for CallbackTransfer {
    fn transfer(&self, to: &Address, amount: u128) -> Result<(), TransferError> {
        let wallet = self.wallet.lock().unwrap().upgrade();
        if let Some(wallet) = wallet {
            let mut observed = self.observed.lock().unwrap();

            match wallet.withdraw(to, 0) {
                Err(LedgerError::AlreadyWithdrawn { index: 0 }) => {
                    observed.push("reentry:already_withdrawn".into())
                }
                other => observed.push(format!("reentry:{other:?}")),
            }

            let status = wallet.get_deposit(0).map(|d| d.status);
            observed.push(format!("status:{status:?}"));

            let total = wallet.total_balance().unwrap_or_default();
            observed.push(format!("total:{total}"));
        }
        self.inner.transfer(to, amount)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn racing_withdrawals_pay_exactly_once() {
    let clock = Arc::new(ManualClock::new(START));
    let transfer = Arc::new(SlowTransfer {
        inner: InMemoryLedger::new(),
        delay: Duration::from_millis(20),
    });
    let wallet = Arc::new(
        LockedWallet::new(owner(), LedgerConfig::default(), clock.clone(), transfer.clone())
            .unwrap(),
    );
    wallet.deposit(&owner(), START + 10, 1_000).unwrap();
    clock.advance(10);

    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let wallet = Arc::clone(&wallet);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                wallet.withdraw(&owner(), 0)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let successes = results.iter().filter(|r| r.is_ok()).count();
    let already = results
        .iter()
        .filter(|r| matches!(r, Err(LedgerError::AlreadyWithdrawn { index: 0 })))
        .count();

    assert_eq!(successes, 1);
    assert_eq!(already, threads - 1);
    assert_eq!(transfer.inner.balance_of(&owner()), 1_000);
    assert_eq!(wallet.custodied_value(), 0);
}

#[test]
fn concurrent_deposits_get_unique_indices() {
    let clock = Arc::new(ManualClock::new(START));
    let wallet = Arc::new(
        LockedWallet::new(
            owner(),
            LedgerConfig::default(),
            clock,
            Arc::new(InMemoryLedger::new()),
        )
        .unwrap(),
    );

    let threads = 16;
    let per_thread = 25;
    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let wallet = Arc::clone(&wallet);
            thread::spawn(move || {
                let depositor = Address::new(format!("depositor-{t}"));
                (0..per_thread)
                    .map(|_| wallet.deposit(&depositor, START + 60, 10).unwrap().index)
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut indices: Vec<usize> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    indices.sort_unstable();

    let expected: Vec<usize> = (0..threads * per_thread).collect();
    assert_eq!(indices, expected);
    assert_eq!(wallet.deposits_count(), threads * per_thread);
    assert_eq!(wallet.custodied_value(), (threads * per_thread * 10) as u128);
}

#[test]
fn reentrant_withdraw_is_rejected_and_readers_see_committed_state() {
    let clock = Arc::new(ManualClock::new(START));
    let transfer = Arc::new(CallbackTransfer::default());
    let wallet = Arc::new(
        LockedWallet::new(owner(), LedgerConfig::default(), clock.clone(), transfer.clone())
            .unwrap(),
    );
    transfer.attach(&wallet);

    wallet.deposit(&owner(), START + 10, 1_000).unwrap();
    clock.advance(10);

    let receipt = wallet.withdraw(&owner(), 0).unwrap();
    assert_eq!(receipt.amount, 1_000);

    assert_eq!(
        transfer.observed(),
        vec![
            "reentry:already_withdrawn".to_string(),
            format!("status:{:?}", Ok::<_, ()>(DepositStatus::Active)),
            "total:1000".to_string(),
        ]
    );
    assert_eq!(transfer.inner.balance_of(&owner()), 1_000);
    assert!(wallet.get_deposit(0).unwrap().is_withdrawn());
    assert_eq!(wallet.total_balance().unwrap(), 0);
}

#[test]
fn readers_run_alongside_a_slow_payout() {
    let clock = Arc::new(ManualClock::new(START));
    let transfer = Arc::new(SlowTransfer {
        inner: InMemoryLedger::new(),
        delay: Duration::from_millis(50),
    });
    let wallet = Arc::new(
        LockedWallet::new(owner(), LedgerConfig::default(), clock.clone(), transfer).unwrap(),
    );
    wallet.deposit(&owner(), START + 10, 500).unwrap();
    wallet.deposit(&owner(), START + 10, 700).unwrap();
    clock.advance(10);

    let writer = {
        let wallet = Arc::clone(&wallet);
        thread::spawn(move || wallet.withdraw(&owner(), 0))
    };

    // Every read sees either the before state or the after state.
    for _ in 0..50 {
        let total = wallet.total_balance().unwrap();
        assert!(total == 1_200 || total == 700, "torn read: {total}");
        thread::sleep(Duration::from_millis(1));
    }

    writer.join().unwrap().unwrap();
    assert_eq!(wallet.total_balance().unwrap(), 700);
}
