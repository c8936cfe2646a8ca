//! Event logging for simulation auditing.
//!
//! This module defines the SimulationEvent enum which captures every
//! scheduling decision and ledger change during a run. Events enable:
//! - Debugging (understand which process did what, and when)
//! - Auditing (verify the scheduler's time order)
//! - Analysis (count suspensions, failures, auto-created accounts)
//!
//! # Example
//!
//! ```rust
//! use cashflow_simulator_core::models::{EventLog, SimulationEvent};
//! use chrono::NaiveDate;
//!
//! let mut log = EventLog::new();
//! log.log(SimulationEvent::ProcessStarted {
//!     date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
//!     process: "salary".to_string(),
//! });
//!
//! assert_eq!(log.events_for_process("salary").len(), 1);
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Simulation event capturing a state change.
///
/// All events carry a date for temporal ordering. Events are logged in the
/// order they happen within a date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SimulationEvent {
    /// Process ran for the first time
    ProcessStarted { date: NaiveDate, process: String },

    /// Process resumed after its wait target was reached
    ProcessResumed { date: NaiveDate, process: String },

    /// Transfer applied to the ledger
    TransferApplied {
        date: NaiveDate,
        process: String,
        transfer_id: u64,
        source: String,
        destination: String,
        amount: i64,
    },

    /// Process suspended until a resolved date
    ProcessSuspended {
        date: NaiveDate,
        process: String,
        until: NaiveDate,
    },

    /// Process finished normally
    ProcessFinished { date: NaiveDate, process: String },

    /// Process failed and was removed from scheduling
    ProcessErrored {
        date: NaiveDate,
        process: String,
        error: String,
    },

    /// Account created on first reference by a transfer
    AccountCreated {
        date: NaiveDate,
        account: String,
        process: String,
    },

    /// Scheduler moved the clock forward
    ClockAdvanced { from: NaiveDate, to: NaiveDate },
}

impl SimulationEvent {
    /// Get the date this event occurred on
    pub fn date(&self) -> NaiveDate {
        match self {
            SimulationEvent::ProcessStarted { date, .. } => *date,
            SimulationEvent::ProcessResumed { date, .. } => *date,
            SimulationEvent::TransferApplied { date, .. } => *date,
            SimulationEvent::ProcessSuspended { date, .. } => *date,
            SimulationEvent::ProcessFinished { date, .. } => *date,
            SimulationEvent::ProcessErrored { date, .. } => *date,
            SimulationEvent::AccountCreated { date, .. } => *date,
            SimulationEvent::ClockAdvanced { to, .. } => *to,
        }
    }

    /// Get a short description of the event type
    pub fn event_type(&self) -> &'static str {
        match self {
            SimulationEvent::ProcessStarted { .. } => "ProcessStarted",
            SimulationEvent::ProcessResumed { .. } => "ProcessResumed",
            SimulationEvent::TransferApplied { .. } => "TransferApplied",
            SimulationEvent::ProcessSuspended { .. } => "ProcessSuspended",
            SimulationEvent::ProcessFinished { .. } => "ProcessFinished",
            SimulationEvent::ProcessErrored { .. } => "ProcessErrored",
            SimulationEvent::AccountCreated { .. } => "AccountCreated",
            SimulationEvent::ClockAdvanced { .. } => "ClockAdvanced",
        }
    }

    /// Get process name if event relates to a specific process
    pub fn process(&self) -> Option<&str> {
        match self {
            SimulationEvent::ProcessStarted { process, .. } => Some(process),
            SimulationEvent::ProcessResumed { process, .. } => Some(process),
            SimulationEvent::TransferApplied { process, .. } => Some(process),
            SimulationEvent::ProcessSuspended { process, .. } => Some(process),
            SimulationEvent::ProcessFinished { process, .. } => Some(process),
            SimulationEvent::ProcessErrored { process, .. } => Some(process),
            SimulationEvent::AccountCreated { process, .. } => Some(process),
            SimulationEvent::ClockAdvanced { .. } => None,
        }
    }
}

/// Event log for storing and querying simulation events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventLog {
    events: Vec<SimulationEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn log(&mut self, event: SimulationEvent) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[SimulationEvent] {
        &self.events
    }

    /// Get events for a specific date
    pub fn events_on(&self, date: NaiveDate) -> Vec<&SimulationEvent> {
        self.events.iter().filter(|e| e.date() == date).collect()
    }

    /// Get events of a specific type
    pub fn events_of_type(&self, event_type: &str) -> Vec<&SimulationEvent> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    /// Get events for a specific process
    pub fn events_for_process(&self, process: &str) -> Vec<&SimulationEvent> {
        self.events
            .iter()
            .filter(|e| e.process() == Some(process))
            .collect()
    }

    /// Dates the clock was advanced to, in order
    pub fn clock_advances(&self) -> Vec<NaiveDate> {
        self.events
            .iter()
            .filter_map(|e| match e {
                SimulationEvent::ClockAdvanced { to, .. } => Some(*to),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_clock_advance_dated_at_target() {
        let event = SimulationEvent::ClockAdvanced {
            from: date(2020, 1, 1),
            to: date(2021, 1, 1),
        };
        assert_eq!(event.date(), date(2021, 1, 1));
        assert_eq!(event.process(), None);
    }

    #[test]
    fn test_event_log_queries() {
        let mut log = EventLog::new();
        log.log(SimulationEvent::ProcessStarted {
            date: date(2020, 1, 1),
            process: "p1".to_string(),
        });
        log.log(SimulationEvent::TransferApplied {
            date: date(2020, 1, 1),
            process: "p1".to_string(),
            transfer_id: 1,
            source: "A".to_string(),
            destination: "B".to_string(),
            amount: 100,
        });
        log.log(SimulationEvent::ClockAdvanced {
            from: date(2020, 1, 1),
            to: date(2020, 6, 1),
        });
        log.log(SimulationEvent::ProcessFinished {
            date: date(2020, 6, 1),
            process: "p2".to_string(),
        });

        assert_eq!(log.len(), 4);
        assert_eq!(log.events_on(date(2020, 1, 1)).len(), 2);
        assert_eq!(log.events_of_type("TransferApplied").len(), 1);
        assert_eq!(log.events_for_process("p1").len(), 2);
        assert_eq!(log.clock_advances(), vec![date(2020, 6, 1)]);
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = SimulationEvent::ProcessFinished {
            date: date(2020, 6, 1),
            process: "p".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "ProcessFinished");
        assert_eq!(json["date"], "2020-06-01");
    }
}
