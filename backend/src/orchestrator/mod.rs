//! Orchestrator - cooperative scheduling of actor processes
//!
//! See `engine.rs` for the scheduling loop, `process.rs` for the process
//! lifecycle and `report.rs` for the serializable run summary.

pub mod engine;
pub mod process;
pub mod report;

pub use engine::{
    AccountConfig, EndReason, Simulation, SimulationConfig, SimulationError, SimulationResult,
    DEFAULT_HORIZON_YEARS, DEFAULT_MAX_STEPS_PER_INSTANT,
};
pub use process::{Process, ProcessOutcome, ProcessState};
pub use report::{
    history_digest, validate_report, AccountSnapshot, ProcessSnapshot, ProcessStatus,
    SimulationReport,
};
