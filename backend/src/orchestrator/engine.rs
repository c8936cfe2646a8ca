//! Simulation Engine - Main Scheduling Loop
//!
//! The scheduler owns the clock, the ledger and every actor process. It
//! starts each process, then repeatedly jumps the clock to the earliest
//! pending wait target and resumes the processes due on that date.
//!
//! # Architecture
//!
//! ```text
//! Simulation::run()
//! ├─ 1. Start every process in registration order, draining each one
//! └─ 2. Loop
//!       ├─ next = min(resolved wait targets of suspended processes)
//!       ├─ none pending         → stop (clock stays at the last event)
//!       ├─ next > end_date      → advance to end_date, stop
//!       └─ advance to next, drain every process due on next
//!              (registration order)
//! ```
//!
//! Draining a process resumes it until it waits or finishes; every emitted
//! transfer is applied to the ledger at the current date before the next
//! resumption.
//!
//! # Critical Invariants
//!
//! 1. **Forward time**: the clock only moves forward, and only to dates a
//!    process is waiting for (or to end_date). There is no fixed step size.
//! 2. **Deterministic order**: ties on a date are broken by registration
//!    order; same-instant transfers from one process keep emission order.
//! 3. **Isolation**: a failing process is marked errored; transfers already
//!    applied by any process stay in the ledger.

use crate::actor::{Actor, ActorContext, ActorError, Step};
use crate::core::time::{CalendarDuration, Clock, TimeError};
use crate::models::account::{Account, AccountKind};
use crate::models::event::{EventLog, SimulationEvent};
use crate::models::ledger::{AccountPolicy, BalanceRow, Ledger, LedgerError};
use crate::models::transfer::{Transfer, TransferRequest};
use crate::orchestrator::process::{Process, ProcessOutcome, ProcessState};
use crate::orchestrator::report::SimulationReport;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::{debug, info, trace, warn};

/// Horizon used when no end date is configured
pub const DEFAULT_HORIZON_YEARS: i32 = 5;

/// Resumptions a process may take on a single date before it is stopped
pub const DEFAULT_MAX_STEPS_PER_INSTANT: usize = 10_000;

// ============================================================================
// Configuration
// ============================================================================

/// Initial account definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountConfig {
    pub id: String,

    /// Opening balance (cents)
    #[serde(default)]
    pub opening_balance: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<AccountKind>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl AccountConfig {
    pub fn new(id: impl Into<String>, opening_balance: i64) -> Self {
        Self {
            id: id.into(),
            opening_balance,
            kind: None,
            description: None,
            category: None,
        }
    }

    pub fn with_kind(mut self, kind: AccountKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    fn to_account(&self) -> Account {
        let mut account = Account::new(self.id.clone(), self.opening_balance);
        if let Some(kind) = self.kind {
            account = account.with_kind(kind);
        }
        if let Some(description) = &self.description {
            account = account.with_description(description.clone());
        }
        if let Some(category) = &self.category {
            account = account.with_category(category.clone());
        }
        account
    }
}

/// Complete simulation configuration
///
/// # Example
///
/// ```rust
/// use cashflow_simulator_core::orchestrator::{AccountConfig, SimulationConfig};
/// use cashflow_simulator_core::AccountPolicy;
/// use chrono::NaiveDate;
///
/// let config = SimulationConfig::new(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap())
///     .with_end_date(NaiveDate::from_ymd_opt(2030, 1, 1).unwrap())
///     .with_account(AccountConfig::new("checking", 250_000))
///     .with_account_policy(AccountPolicy::Strict);
///
/// assert_eq!(config.resolved_end_date().unwrap().to_string(), "2030-01-01");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub start_date: NaiveDate,

    /// Last date the clock may reach; start + 5 years when absent
    #[serde(default)]
    pub end_date: Option<NaiveDate>,

    /// Accounts registered before any process starts
    #[serde(default)]
    pub accounts: Vec<AccountConfig>,

    #[serde(default)]
    pub account_policy: AccountPolicy,

    #[serde(default = "default_allow_negative_opening_balance")]
    pub allow_negative_opening_balance: bool,

    #[serde(default = "default_max_steps_per_instant")]
    pub max_steps_per_instant: usize,
}

fn default_allow_negative_opening_balance() -> bool {
    true
}

fn default_max_steps_per_instant() -> usize {
    DEFAULT_MAX_STEPS_PER_INSTANT
}

impl SimulationConfig {
    pub fn new(start_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date: None,
            accounts: Vec::new(),
            account_policy: AccountPolicy::default(),
            allow_negative_opening_balance: default_allow_negative_opening_balance(),
            max_steps_per_instant: DEFAULT_MAX_STEPS_PER_INSTANT,
        }
    }

    pub fn with_end_date(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }

    pub fn with_account(mut self, account: AccountConfig) -> Self {
        self.accounts.push(account);
        self
    }

    pub fn with_account_policy(mut self, policy: AccountPolicy) -> Self {
        self.account_policy = policy;
        self
    }

    pub fn with_negative_opening_balances(mut self, allowed: bool) -> Self {
        self.allow_negative_opening_balance = allowed;
        self
    }

    pub fn with_max_steps_per_instant(mut self, steps: usize) -> Self {
        self.max_steps_per_instant = steps;
        self
    }

    /// Configured end date, or the default horizon after start
    pub fn resolved_end_date(&self) -> Result<NaiveDate, SimulationError> {
        match self.end_date {
            Some(end_date) => Ok(end_date),
            None => {
                let horizon = CalendarDuration::years(DEFAULT_HORIZON_YEARS);
                horizon.add_to(self.start_date).ok_or(SimulationError::Clock(
                    TimeError::DateOutOfRange {
                        date: self.start_date,
                        duration: horizon,
                    },
                ))
            }
        }
    }
}

// ============================================================================
// Errors and results
// ============================================================================

/// Errors that abort a simulation
///
/// Actor failures are not in here: they are recorded on the failing process
/// and the run carries on.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SimulationError {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Clock error: {0}")]
    Clock(#[from] TimeError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Report validation failed: {0}")]
    ReportValidation(String),
}

/// Why the scheduling loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// No process is waiting any more
    AllFinished,
    /// The earliest pending wait lies beyond the end date
    EndDateReached,
}

/// Everything a finished run produced
#[derive(Debug, Clone)]
pub struct SimulationResult {
    start_date: NaiveDate,
    end_date: NaiveDate,
    final_date: NaiveDate,
    end_reason: EndReason,
    ledger: Ledger,
    processes: Vec<ProcessOutcome>,
    event_log: EventLog,
    steps: Vec<NaiveDate>,
}

impl SimulationResult {
    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    /// Clock date when the run stopped
    pub fn final_date(&self) -> NaiveDate {
        self.final_date
    }

    pub fn end_reason(&self) -> EndReason {
        self.end_reason
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn into_ledger(self) -> Ledger {
        self.ledger
    }

    /// End state of every process, in registration order
    pub fn processes(&self) -> &[ProcessOutcome] {
        &self.processes
    }

    /// First process registered under `name`
    pub fn process(&self, name: &str) -> Option<&ProcessOutcome> {
        self.processes.iter().find(|p| p.name == name)
    }

    pub fn errored(&self) -> Vec<&ProcessOutcome> {
        self.processes.iter().filter(|p| p.is_errored()).collect()
    }

    pub fn has_errors(&self) -> bool {
        self.processes.iter().any(ProcessOutcome::is_errored)
    }

    pub fn all_finished(&self) -> bool {
        self.processes.iter().all(ProcessOutcome::is_finished)
    }

    /// Date of every scheduling step after the start, in order
    pub fn steps(&self) -> &[NaiveDate] {
        &self.steps
    }

    pub fn event_log(&self) -> &EventLog {
        &self.event_log
    }

    pub fn balances_by_date(&self) -> Vec<BalanceRow> {
        self.ledger.balances_by_date()
    }

    /// Serializable summary of the run
    pub fn report(&self) -> Result<SimulationReport, SimulationError> {
        SimulationReport::from_result(self)
    }
}

// ============================================================================
// Simulation
// ============================================================================

/// Cooperative scheduler
///
/// # Example
///
/// ```rust
/// use cashflow_simulator_core::actor::Script;
/// use cashflow_simulator_core::orchestrator::{Simulation, SimulationConfig};
/// use cashflow_simulator_core::CalendarDuration;
/// use chrono::NaiveDate;
///
/// let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
/// let end = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
/// let config = SimulationConfig::new(start).with_end_date(end);
///
/// let result = Simulation::new(config)
///     .unwrap()
///     .with_actor(
///         Script::new("savings")
///             .emit(10_000, "checking", "savings", "Deposit")
///             .wait_for(CalendarDuration::years(1))
///             .emit(10_000, "checking", "savings", "Deposit"),
///     )
///     .run()
///     .unwrap();
///
/// assert_eq!(result.ledger().balance("savings"), Some(20_000));
/// assert_eq!(result.steps(), &[NaiveDate::from_ymd_opt(2021, 1, 1).unwrap()]);
/// assert!(result.all_finished());
/// ```
pub struct Simulation {
    clock: Clock,
    end_date: NaiveDate,
    ledger: Ledger,
    processes: Vec<Process>,
    event_log: EventLog,
    steps: Vec<NaiveDate>,
    next_transfer_id: u64,
    max_steps_per_instant: usize,
}

impl Simulation {
    /// Create a simulation from configuration
    ///
    /// # Errors
    /// `SimulationError::InvalidConfig` when the configuration is rejected;
    /// nothing has been scheduled at that point.
    pub fn new(config: SimulationConfig) -> Result<Self, SimulationError> {
        validate_config(&config)?;
        let end_date = config.resolved_end_date()?;

        let mut ledger = Ledger::new(config.account_policy);
        for account in &config.accounts {
            ledger.open_account(account.to_account())?;
        }

        Ok(Self {
            clock: Clock::new(config.start_date),
            end_date,
            ledger,
            processes: Vec::new(),
            event_log: EventLog::new(),
            steps: Vec::new(),
            next_transfer_id: 1,
            max_steps_per_instant: config.max_steps_per_instant,
        })
    }

    /// Register an actor; registration order is the tiebreak on equal dates
    pub fn add_actor<A: Actor + 'static>(&mut self, actor: A) -> &mut Self {
        let index = self.processes.len();
        self.processes.push(Process::new(index, Box::new(actor)));
        self
    }

    pub fn with_actor<A: Actor + 'static>(mut self, actor: A) -> Self {
        self.add_actor(actor);
        self
    }

    pub fn start_date(&self) -> NaiveDate {
        self.clock.start_date()
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    pub fn process_count(&self) -> usize {
        self.processes.len()
    }

    /// Run to completion
    ///
    /// # Errors
    /// Only fatal scheduler errors (a backward clock move). Actor failures
    /// are reported through [`SimulationResult::errored`].
    pub fn run(mut self) -> Result<SimulationResult, SimulationError> {
        info!(
            start_date = %self.clock.start_date(),
            end_date = %self.end_date,
            processes = self.processes.len(),
            actors = ?self.processes.iter().map(Process::name).collect::<Vec<_>>(),
            "Starting simulation"
        );

        for index in 0..self.processes.len() {
            self.drain(index);
        }

        let end_reason = loop {
            let Some(next) = self
                .processes
                .iter()
                .filter_map(Process::waiting_until)
                .min()
            else {
                break EndReason::AllFinished;
            };

            if next > self.end_date {
                if self.clock.now() < self.end_date {
                    self.advance(self.end_date)?;
                }
                break EndReason::EndDateReached;
            }

            self.advance(next)?;

            let ready: Vec<usize> = self
                .processes
                .iter()
                .filter(|process| process.waiting_until() == Some(next))
                .map(Process::index)
                .collect();
            for index in ready {
                self.drain(index);
            }
        };

        let processes: Vec<ProcessOutcome> =
            self.processes.iter().map(Process::outcome).collect();
        let count = |f: fn(&ProcessOutcome) -> bool| processes.iter().filter(|p| f(p)).count();

        info!(
            final_date = %self.clock.now(),
            reason = ?end_reason,
            transfers = self.ledger.history().len(),
            steps = self.steps.len(),
            finished = count(ProcessOutcome::is_finished),
            suspended = count(ProcessOutcome::is_suspended),
            errored = count(ProcessOutcome::is_errored),
            "Simulation complete"
        );

        Ok(SimulationResult {
            start_date: self.clock.start_date(),
            end_date: self.end_date,
            final_date: self.clock.now(),
            end_reason,
            ledger: self.ledger,
            processes,
            event_log: self.event_log,
            steps: self.steps,
        })
    }

    /// Resume one process until it waits, finishes or fails
    fn drain(&mut self, index: usize) {
        let now = self.clock.now();
        let starting = matches!(self.processes[index].state(), ProcessState::Created);
        let name = self.processes[index].name().to_string();
        self.event_log.log(if starting {
            SimulationEvent::ProcessStarted {
                date: now,
                process: name.clone(),
            }
        } else {
            SimulationEvent::ProcessResumed {
                date: now,
                process: name.clone(),
            }
        });

        let mut first = starting;
        loop {
            let ctx = ActorContext::new(&self.clock, &self.ledger, self.end_date);
            let process = &mut self.processes[index];
            let result = if first {
                process.start(&ctx, self.max_steps_per_instant)
            } else {
                process.resume(&ctx, self.max_steps_per_instant)
            };
            first = false;

            let step = match result {
                Ok(step) => step,
                Err(error) => return self.fail(index, error),
            };

            match step {
                Step::Emit(request) => {
                    if let Err(error) = self.apply(index, request) {
                        return self.fail(index, error);
                    }
                }
                Step::Wait(request) => {
                    let until = match self.clock.resolve(&request) {
                        Ok(until) if until >= now => until,
                        Ok(requested) => {
                            return self.fail(index, ActorError::WaitInPast { requested, now })
                        }
                        Err(error) => return self.fail(index, error.into()),
                    };
                    trace!(date = %now, process = %name, until = %until, "Process suspended");
                    self.processes[index].suspend(until);
                    self.event_log.log(SimulationEvent::ProcessSuspended {
                        date: now,
                        process: name,
                        until,
                    });
                    return;
                }
                Step::Finish => {
                    debug!(date = %now, process = %name, "Process finished");
                    self.processes[index].finish(now);
                    self.event_log.log(SimulationEvent::ProcessFinished {
                        date: now,
                        process: name,
                    });
                    return;
                }
            }
        }
    }

    /// Issue and apply a transfer emitted by process `index`
    fn apply(&mut self, index: usize, request: TransferRequest) -> Result<(), ActorError> {
        let now = self.clock.now();
        let process = self.processes[index].name().to_string();
        let transfer = Transfer::issue(self.next_transfer_id, now, process.clone(), request)?;

        let transfer_id = transfer.id();
        let amount = transfer.amount();
        let source = transfer.source().to_string();
        let destination = transfer.destination().to_string();

        let created = self.ledger.apply(transfer)?;
        self.next_transfer_id += 1;

        for account in created {
            debug!(date = %now, process = %process, account = %account, "Account auto-created");
            self.event_log.log(SimulationEvent::AccountCreated {
                date: now,
                account,
                process: process.clone(),
            });
        }

        trace!(
            date = %now,
            process = %process,
            transfer_id,
            amount,
            source = %source,
            destination = %destination,
            "Transfer applied"
        );
        self.event_log.log(SimulationEvent::TransferApplied {
            date: now,
            process,
            transfer_id,
            source,
            destination,
            amount,
        });
        Ok(())
    }

    fn fail(&mut self, index: usize, error: ActorError) {
        let now = self.clock.now();
        let process = &mut self.processes[index];
        warn!(date = %now, process = %process.name(), error = %error, "Process errored");
        self.event_log.log(SimulationEvent::ProcessErrored {
            date: now,
            process: process.name().to_string(),
            error: error.to_string(),
        });
        process.fail(now, error);
    }

    fn advance(&mut self, target: NaiveDate) -> Result<(), SimulationError> {
        let from = self.clock.now();
        self.clock.advance_to(target)?;
        self.steps.push(target);
        if target != from {
            debug!(from = %from, to = %target, "Clock advanced");
            self.event_log
                .log(SimulationEvent::ClockAdvanced { from, to: target });
        }
        Ok(())
    }
}

/// Validate configuration before anything is scheduled
fn validate_config(config: &SimulationConfig) -> Result<(), SimulationError> {
    if let Some(end_date) = config.end_date {
        if end_date < config.start_date {
            return Err(SimulationError::InvalidConfig(format!(
                "end_date {} is before start_date {}",
                end_date, config.start_date
            )));
        }
    }

    if config.max_steps_per_instant == 0 {
        return Err(SimulationError::InvalidConfig(
            "max_steps_per_instant must be > 0".to_string(),
        ));
    }

    let mut seen = BTreeSet::new();
    for account in &config.accounts {
        if account.id.is_empty() {
            return Err(SimulationError::InvalidConfig(
                "account id must not be empty".to_string(),
            ));
        }
        if !seen.insert(account.id.as_str()) {
            return Err(SimulationError::InvalidConfig(format!(
                "duplicate account id: {}",
                account.id
            )));
        }
        if account.opening_balance < 0 && !config.allow_negative_opening_balance {
            return Err(SimulationError::InvalidConfig(format!(
                "account {} has negative opening balance {}",
                account.id, account.opening_balance
            )));
        }
    }

    Ok(())
}
