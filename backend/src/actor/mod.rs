//! Actor Module
//!
//! This module defines the interface between the scheduler and the
//! user-supplied processes that generate cash flows.
//!
//! # Overview
//!
//! An actor is a cooperative process. Each time the scheduler resumes it, the
//! actor runs until it has exactly one thing to report, returned as a
//! [`Step`]:
//! - **Emit**: a transfer to apply at the current date; the actor is resumed
//!   again immediately, with no time passing
//! - **Wait**: a suspension request; the actor stays inactive until the
//!   scheduler has advanced the clock to the resolved date
//! - **Finish**: the actor is permanently removed from scheduling
//!
//! Actors are explicit state machines: whatever an actor needs to remember
//! between resumptions lives in its own fields.
//!
//! # Actor Interface
//!
//! ```rust
//! use cashflow_simulator_core::actor::{Actor, ActorContext, ActorError, Step};
//! use cashflow_simulator_core::CalendarDuration;
//!
//! /// Pays three monthly instalments, then stops
//! struct Instalments {
//!     paid: u32,
//!     waiting: bool,
//! }
//!
//! impl Actor for Instalments {
//!     fn name(&self) -> &str {
//!         "instalments"
//!     }
//!
//!     fn resume(&mut self, ctx: &ActorContext<'_>) -> Result<Step, ActorError> {
//!         if self.paid == 3 {
//!             return Ok(Step::Finish);
//!         }
//!         if self.waiting {
//!             self.waiting = false;
//!             self.paid += 1;
//!             return Ok(ctx.emit(10_000, "checking", "lender", "Instalment"));
//!         }
//!         self.waiting = true;
//!         Ok(ctx.wait_for(CalendarDuration::months(1)))
//!     }
//! }
//! ```
//!
//! # Library Actors
//!
//! 1. **FnActor**: closure-backed actor
//! 2. **Script**: fixed sequence of emits and waits, optionally repeating
//! 3. **RecurringTransfer**: the same transfer on a fixed calendar interval
//! 4. **AmortizingLoan**: drawdown followed by annuity instalments

use crate::core::time::{self, CalendarDuration, Clock, TimeError};
use crate::models::ledger::{Ledger, LedgerError};
use crate::models::transfer::{TransferError, TransferRequest};
use chrono::NaiveDate;
use thiserror::Error;

pub mod fn_actor;
pub mod loan;
pub mod recurring;
pub mod script;

pub use crate::core::time::SuspendRequest;
pub use fn_actor::FnActor;
pub use loan::{AmortizingLoan, LoanAccounts, LoanTerms};
pub use recurring::RecurringTransfer;
pub use script::{Script, ScriptOp};

/// Errors that end a process
///
/// Any of these marks the process FINISHED-WITH-ERROR. The run itself
/// continues with the remaining processes.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ActorError {
    #[error("Transfer rejected: {0}")]
    Transfer(#[from] TransferError),

    #[error("Ledger rejected transfer: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Clock error: {0}")]
    Time(#[from] TimeError),

    #[error("Requested wait until {requested}, but that has already passed; currently at {now}")]
    WaitInPast {
        requested: NaiveDate,
        now: NaiveDate,
    },

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Process resumed {steps} times on {date} without waiting for a later date")]
    RunawayProcess { steps: usize, date: NaiveDate },

    #[error("{0}")]
    Failed(String),
}

impl ActorError {
    /// Failure reported by actor logic itself
    pub fn failed(message: impl Into<String>) -> Self {
        ActorError::Failed(message.into())
    }
}

/// What an actor reports each time it is resumed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Apply this transfer at the current date and resume again
    Emit(TransferRequest),
    /// Suspend until the request's resolved date
    Wait(SuspendRequest),
    /// Leave the simulation
    Finish,
}

/// Read-only view of the simulation handed to an actor on every resumption
///
/// Actors can read the clock and the ledger but never mutate them: every
/// change goes through the [`Step`] the actor returns.
pub struct ActorContext<'a> {
    clock: &'a Clock,
    ledger: &'a Ledger,
    end_date: NaiveDate,
}

impl<'a> ActorContext<'a> {
    pub fn new(clock: &'a Clock, ledger: &'a Ledger, end_date: NaiveDate) -> Self {
        Self {
            clock,
            ledger,
            end_date,
        }
    }

    /// Current simulated date
    pub fn now(&self) -> NaiveDate {
        self.clock.now()
    }

    pub fn start_date(&self) -> NaiveDate {
        self.clock.start_date()
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    /// Calendar time elapsed since the start date
    pub fn elapsed(&self) -> CalendarDuration {
        self.clock.elapsed()
    }

    pub fn ledger(&self) -> &Ledger {
        self.ledger
    }

    /// Current balance of an account, `None` if it does not exist yet
    pub fn balance(&self, account: &str) -> Option<i64> {
        self.ledger.balance(account)
    }

    /// Sum of current balances over `accounts`
    pub fn total_of<I, S>(&self, accounts: I) -> Result<i64, ActorError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(self.ledger.total_of(accounts)?)
    }

    /// Transfer `amount` cents from `source` to `destination` today
    pub fn emit(
        &self,
        amount: i64,
        source: impl Into<String>,
        destination: impl Into<String>,
        description: impl Into<String>,
    ) -> Step {
        Step::Emit(TransferRequest::new(amount, source, destination).with_description(description))
    }

    /// Suspend until an absolute date
    pub fn wait_until(&self, date: NaiveDate) -> Step {
        Step::Wait(SuspendRequest::UntilDate(date))
    }

    /// Suspend for a duration measured from today
    pub fn wait_for(&self, duration: CalendarDuration) -> Step {
        Step::Wait(SuspendRequest::AfterDuration(duration))
    }

    /// Suspend until the next 31 December strictly after today
    pub fn wait_until_year_end(&self) -> Result<Step, ActorError> {
        let now = self.now();
        let target = time::next_year_end(now)
            .ok_or_else(|| ActorError::InvalidDate(format!("no year end after {}", now)))?;
        Ok(self.wait_until(target))
    }

    /// Suspend until the next occurrence of day-of-month `day`
    ///
    /// # Errors
    /// `ActorError::InvalidDate` if that day does not exist in the current
    /// month (day 30 from 2021-02-10, although 2021-03-30 exists), or in the
    /// following month when the wait rolls over.
    pub fn wait_until_day(&self, day: u32) -> Result<Step, ActorError> {
        let now = self.now();
        let target = time::next_day_of_month(now, day).ok_or_else(|| {
            let (year, month) = time::month_missing_day(now, day);
            ActorError::InvalidDate(format!("day {} does not exist in {}-{:02}", day, year, month))
        })?;
        Ok(self.wait_until(target))
    }
}

/// A cooperative cash-flow process
pub trait Actor {
    /// Name used in logs, events and transfer provenance
    fn name(&self) -> &str;

    /// Run until the next emit, wait or finish
    ///
    /// The first call is the process's start; every later call continues
    /// from where the previous one returned.
    fn resume(&mut self, ctx: &ActorContext<'_>) -> Result<Step, ActorError>;
}

impl<A: Actor + ?Sized> Actor for Box<A> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn resume(&mut self, ctx: &ActorContext<'_>) -> Result<Step, ActorError> {
        (**self).resume(ctx)
    }
}
