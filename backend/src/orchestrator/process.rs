//! Actor processes
//!
//! A [`Process`] wraps one user-supplied actor with the lifecycle the
//! scheduler tracks for it:
//!
//! ```text
//! Created ──start──> Running ──wait──> Suspended(until) ──resume──> Running ─ ...
//!                       │                                              │
//!                       └──────────────> Finished / Errored <──────────┘
//! ```
//!
//! Finished and errored processes are never resumed again.

use crate::actor::{Actor, ActorContext, ActorError, Step};
use chrono::NaiveDate;

/// Lifecycle state of a process
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessState {
    /// Registered, not yet started
    Created,
    /// Between a resumption and its next wait or finish
    Running,
    /// Inactive until the clock reaches `until`
    Suspended { until: NaiveDate },
    /// Finished normally on `on`
    Finished { on: NaiveDate },
    /// Failed on `on`; excluded from further scheduling
    Errored { on: NaiveDate, error: ActorError },
}

impl ProcessState {
    /// Whether the scheduler may still resume this process
    pub fn is_live(&self) -> bool {
        !matches!(
            self,
            ProcessState::Finished { .. } | ProcessState::Errored { .. }
        )
    }
}

/// Scheduler-side wrapper around an actor
pub struct Process {
    /// Registration order, the tiebreak between processes due on one date
    index: usize,
    name: String,
    actor: Box<dyn Actor>,
    state: ProcessState,

    /// Date the resumption counter refers to
    instant: Option<NaiveDate>,
    /// Resumptions on `instant`
    steps_at_instant: usize,
}

impl Process {
    pub(crate) fn new(index: usize, actor: Box<dyn Actor>) -> Self {
        Self {
            index,
            name: actor.name().to_string(),
            actor,
            state: ProcessState::Created,
            instant: None,
            steps_at_instant: 0,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> &ProcessState {
        &self.state
    }

    /// Resolved wait target, if suspended
    pub fn waiting_until(&self) -> Option<NaiveDate> {
        match self.state {
            ProcessState::Suspended { until } => Some(until),
            _ => None,
        }
    }

    /// Begin execution up to the first emit, wait or finish
    pub(crate) fn start(
        &mut self,
        ctx: &ActorContext<'_>,
        max_steps_per_instant: usize,
    ) -> Result<Step, ActorError> {
        debug_assert_eq!(self.state, ProcessState::Created);
        self.resume(ctx, max_steps_per_instant)
    }

    /// Continue execution up to the next emit, wait or finish
    ///
    /// # Errors
    /// The actor's own error, or `RunawayProcess` once the process has been
    /// resumed more than `max_steps_per_instant` times on the current date.
    pub(crate) fn resume(
        &mut self,
        ctx: &ActorContext<'_>,
        max_steps_per_instant: usize,
    ) -> Result<Step, ActorError> {
        let now = ctx.now();
        if self.instant != Some(now) {
            self.instant = Some(now);
            self.steps_at_instant = 0;
        }
        self.steps_at_instant += 1;
        if self.steps_at_instant > max_steps_per_instant {
            return Err(ActorError::RunawayProcess {
                steps: max_steps_per_instant,
                date: now,
            });
        }

        self.state = ProcessState::Running;
        self.actor.resume(ctx)
    }

    pub(crate) fn suspend(&mut self, until: NaiveDate) {
        self.state = ProcessState::Suspended { until };
    }

    pub(crate) fn finish(&mut self, on: NaiveDate) {
        self.state = ProcessState::Finished { on };
    }

    pub(crate) fn fail(&mut self, on: NaiveDate, error: ActorError) {
        self.state = ProcessState::Errored { on, error };
    }

    pub(crate) fn outcome(&self) -> ProcessOutcome {
        ProcessOutcome {
            index: self.index,
            name: self.name.clone(),
            state: self.state.clone(),
        }
    }
}

/// End state of a process after a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutcome {
    pub index: usize,
    pub name: String,
    pub state: ProcessState,
}

impl ProcessOutcome {
    pub fn is_finished(&self) -> bool {
        matches!(self.state, ProcessState::Finished { .. })
    }

    /// Still waiting when the run ended; a normal outcome
    pub fn is_suspended(&self) -> bool {
        matches!(self.state, ProcessState::Suspended { .. })
    }

    pub fn is_errored(&self) -> bool {
        matches!(self.state, ProcessState::Errored { .. })
    }

    pub fn error(&self) -> Option<&ActorError> {
        match &self.state {
            ProcessState::Errored { error, .. } => Some(error),
            _ => None,
        }
    }
}
