//! # Ledger Events
//!
//! Every committed state change on a [`LockedWallet`](crate::LockedWallet)
//! produces one [`LedgerEvent`]. Events are handed to each registered
//! [`EventSink`] *after* the change commits and after the ledger's lock is
//! released, so a sink may freely call back into the ledger. A failed
//! operation never emits anything.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::info;

use lockwallet_protocol::time::to_rfc3339;
use lockwallet_protocol::{Address, Timestamp};

/// A committed ledger state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerEvent {
    /// A deposit was recorded.
    NewDeposit {
        /// Permanent index of the new deposit.
        index: usize,
        /// Who made the deposit.
        depositor: Address,
        /// Principal locked.
        amount: u128,
        /// When the principal becomes withdrawable.
        unlock_time: Timestamp,
    },

    /// A deposit was paid out to the owner.
    Withdraw {
        /// Index of the withdrawn deposit.
        index: usize,
        /// Principal paid.
        amount: u128,
        /// Reward paid on top of the principal.
        reward: u128,
    },

    /// Reward liquidity was added to custody.
    RewardsFunded {
        /// Who supplied the liquidity.
        funder: Address,
        /// Amount added.
        amount: u128,
    },
}

impl LedgerEvent {
    /// Short machine-friendly name, e.g. for log fields.
    pub fn name(&self) -> &'static str {
        match self {
            LedgerEvent::NewDeposit { .. } => "NewDeposit",
            LedgerEvent::Withdraw { .. } => "Withdraw",
            LedgerEvent::RewardsFunded { .. } => "RewardsFunded",
        }
    }
}

/// Receives committed ledger events.
pub trait EventSink: Send + Sync {
    /// Called once per committed event, in commit order per ledger.
    fn publish(&self, event: &LedgerEvent);
}

impl<F> EventSink for F
where
    F: Fn(&LedgerEvent) + Send + Sync,
{
    fn publish(&self, event: &LedgerEvent) {
        self(event)
    }
}

// ---------------------------------------------------------------------------
// TracingSink
// ---------------------------------------------------------------------------

/// Renders each event as one structured `info!` line under the
/// `lockwallet::events` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn publish(&self, event: &LedgerEvent) {
        match event {
            LedgerEvent::NewDeposit {
                index,
                depositor,
                amount,
                unlock_time,
            } => info!(
                target: "lockwallet::events",
                event = event.name(),
                index,
                depositor = %depositor,
                amount = %amount,
                unlock_at = %to_rfc3339(*unlock_time),
            ),
            LedgerEvent::Withdraw {
                index,
                amount,
                reward,
            } => info!(
                target: "lockwallet::events",
                event = event.name(),
                index,
                amount = %amount,
                reward = %reward,
            ),
            LedgerEvent::RewardsFunded { funder, amount } => info!(
                target: "lockwallet::events",
                event = event.name(),
                funder = %funder,
                amount = %amount,
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// RecordingSink
// ---------------------------------------------------------------------------

/// Keeps every event in memory. Handy for tests and for the CLI's summary.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<LedgerEvent>>,
}

impl RecordingSink {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far.
    pub fn events(&self) -> Vec<LedgerEvent> {
        self.events.lock().clone()
    }

    /// Drains the recorder.
    pub fn take(&self) -> Vec<LedgerEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    /// Number of recorded events.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// `true` if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl EventSink for RecordingSink {
    fn publish(&self, event: &LedgerEvent) {
        self.events.lock().push(event.clone());
    }
}
