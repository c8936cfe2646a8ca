//! Cash Flow Simulator Core - Rust Engine
//!
//! Deterministic scheduling of cooperative cash-flow processes against a
//! virtual calendar clock and a shared ledger.
//!
//! # Architecture
//!
//! - **core**: Virtual calendar clock and calendar durations
//! - **models**: Domain types (Account, Transfer, Ledger, events)
//! - **actor**: The actor interface and library actors
//! - **orchestrator**: Scheduling loop, process lifecycle, run reports
//! - **scenario**: JSON scenario files
//!
//! # Critical Invariants
//!
//! 1. All money values are i64 (cents)
//! 2. Time only moves forward, straight to the next date a process waits for
//! 3. Identical inputs produce identical ledger histories
//!
//! # Example
//!
//! ```rust
//! use cashflow_simulator_core::actor::Script;
//! use cashflow_simulator_core::{CalendarDuration, Simulation, SimulationConfig};
//! use chrono::NaiveDate;
//!
//! let start = NaiveDate::from_ymd_opt(2019, 6, 1).unwrap();
//! let result = Simulation::new(SimulationConfig::new(start))
//!     .unwrap()
//!     .with_actor(
//!         Script::new("p1")
//!             .emit(5_000, "A", "B", "")
//!             .emit(5_000, "A", "B", "")
//!             .wait_for(CalendarDuration::years(1))
//!             .emit(30_000, "A", "B", ""),
//!     )
//!     .run()
//!     .unwrap();
//!
//! let end = NaiveDate::from_ymd_opt(2020, 6, 1).unwrap();
//! assert_eq!(result.ledger().balance_at("B", start), Some(10_000));
//! assert_eq!(result.ledger().balance_at("B", end), Some(40_000));
//! ```

pub mod actor;
pub mod core;
pub mod models;
pub mod orchestrator;
pub mod scenario;

// Re-exports for convenience
pub use crate::core::time::{CalendarDuration, Clock, SuspendRequest, TimeError};
pub use actor::{Actor, ActorContext, ActorError, Step};
pub use models::{
    account::{Account, AccountKind},
    event::{EventLog, SimulationEvent},
    ledger::{AccountPolicy, BalanceRow, Ledger, LedgerError, Posting},
    transfer::{Transfer, TransferError, TransferRequest},
};
pub use orchestrator::{
    AccountConfig, EndReason, ProcessOutcome, ProcessState, Simulation, SimulationConfig,
    SimulationError, SimulationReport, SimulationResult,
};
pub use scenario::{ActorSpec, ScenarioConfig, ScenarioError};
