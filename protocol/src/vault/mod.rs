//! # Vault Module: Custody & Value Movement
//!
//! The vault is where locked value lives between deposit and withdrawal. It
//! does not decide *who* may take value out (that is the ledger's job); it
//! only keeps the books straight and hands payouts to the outside world.
//!
//! ## Architecture
//!
//! ```text
//! balance.rs  : Custodied balance: checked credit, debit, and reservation
//! transfer.rs : ValueTransfer seam + an in-memory external account ledger
//! ```
//!
//! ## Design Principles
//!
//! 1. **All amounts are `u128` in smallest-unit denomination.** The
//!    `decimals` used for display never enter arithmetic.
//!
//! 2. **Value leaves through one door.** Every payout goes through
//!    [`ValueTransfer::transfer`], which may fail. Callers must be ready to
//!    roll back.
//!
//! 3. **Serializable state.** [`Custody`] derives `Serialize` and
//!    `Deserialize` so ledger snapshots can be exported as JSON.

pub mod balance;
pub mod transfer;

pub use balance::{BalanceError, Custody};
pub use transfer::{InMemoryLedger, TransferError, ValueTransfer};
