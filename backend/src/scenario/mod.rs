//! Scenario files
//!
//! A scenario is a JSON document holding a [`SimulationConfig`] plus a list
//! of declarative actors. It is the input format of the `cashflow-sim` CLI.
//!
//! ```json
//! {
//!   "start_date": "2020-01-01",
//!   "end_date": "2021-01-01",
//!   "accounts": [{ "id": "checking", "opening_balance": 100000 }],
//!   "actors": [
//!     {
//!       "type": "recurring",
//!       "name": "rent",
//!       "transfer": { "amount": 120000, "source": "checking", "destination": "landlord" },
//!       "interval": { "months": 1 }
//!     }
//!   ]
//! }
//! ```

use crate::actor::{
    Actor, AmortizingLoan, LoanAccounts, LoanTerms, RecurringTransfer, Script, ScriptOp,
};
use crate::core::time::CalendarDuration;
use crate::models::transfer::TransferRequest;
use crate::orchestrator::{Simulation, SimulationConfig, SimulationError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading a scenario
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("Failed to read scenario {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid scenario JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid actor: {0}")]
    InvalidActor(String),

    #[error(transparent)]
    Simulation(#[from] SimulationError),
}

/// Declarative actor definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActorSpec {
    Script {
        name: String,
        ops: Vec<ScriptOp>,
        #[serde(default)]
        repeat: bool,
    },
    Recurring {
        name: String,
        transfer: TransferRequest,
        interval: CalendarDuration,
        #[serde(default)]
        first_date: Option<NaiveDate>,
        #[serde(default)]
        until: Option<NaiveDate>,
        #[serde(default)]
        count: Option<u32>,
    },
    AmortizingLoan {
        name: String,
        terms: LoanTerms,
        accounts: LoanAccounts,
    },
}

impl ActorSpec {
    pub fn name(&self) -> &str {
        match self {
            ActorSpec::Script { name, .. }
            | ActorSpec::Recurring { name, .. }
            | ActorSpec::AmortizingLoan { name, .. } => name,
        }
    }

    fn build(&self) -> Box<dyn Actor> {
        match self.clone() {
            ActorSpec::Script { name, ops, repeat } => {
                let script = Script::from_ops(name, ops);
                Box::new(if repeat { script.repeating() } else { script })
            }
            ActorSpec::Recurring {
                name,
                transfer,
                interval,
                first_date,
                until,
                count,
            } => {
                let mut actor = RecurringTransfer::new(name, transfer, interval);
                if let Some(first_date) = first_date {
                    actor = actor.starting_on(first_date);
                }
                if let Some(until) = until {
                    actor = actor.until(until);
                }
                if let Some(count) = count {
                    actor = actor.with_count(count);
                }
                Box::new(actor)
            }
            ActorSpec::AmortizingLoan {
                name,
                terms,
                accounts,
            } => Box::new(AmortizingLoan::new(name, terms, accounts)),
        }
    }
}

/// Simulation configuration plus the actors to run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    #[serde(flatten)]
    pub simulation: SimulationConfig,

    /// Actors in registration order
    #[serde(default)]
    pub actors: Vec<ActorSpec>,
}

impl ScenarioConfig {
    pub fn from_json(json: &str) -> Result<Self, ScenarioError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Validate the scenario and register its actors on a new simulation
    ///
    /// # Errors
    /// `InvalidActor` for blank or duplicate actor names; configuration
    /// errors from [`Simulation::new`].
    pub fn into_simulation(self) -> Result<Simulation, ScenarioError> {
        let mut names = BTreeSet::new();
        for spec in &self.actors {
            if spec.name().is_empty() {
                return Err(ScenarioError::InvalidActor(
                    "actor name must not be empty".to_string(),
                ));
            }
            if !names.insert(spec.name()) {
                return Err(ScenarioError::InvalidActor(format!(
                    "duplicate actor name: {}",
                    spec.name()
                )));
            }
        }

        let mut simulation = Simulation::new(self.simulation)?;
        for spec in &self.actors {
            simulation.add_actor(spec.build());
        }
        Ok(simulation)
    }
}
