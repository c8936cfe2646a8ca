//! Domain models for the cash flow simulator

pub mod account;
pub mod event;
pub mod ledger;
pub mod transfer;

// Re-exports
pub use account::{Account, AccountKind};
pub use event::{EventLog, SimulationEvent};
pub use ledger::{AccountPolicy, BalanceRow, Ledger, LedgerError, Posting};
pub use transfer::{Transfer, TransferError, TransferRequest};
