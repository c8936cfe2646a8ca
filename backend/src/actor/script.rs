//! Scripted actor
//!
//! A fixed list of operations executed in order. With `repeating()` the list
//! starts over after the last operation, which models the common
//! "every year end, do X" loop.

use super::{Actor, ActorContext, ActorError, Step};
use crate::core::time::CalendarDuration;
use crate::models::transfer::TransferRequest;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One operation of a [`Script`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ScriptOp {
    Emit(TransferRequest),
    WaitFor(CalendarDuration),
    WaitUntil { date: NaiveDate },
    WaitUntilYearEnd,
    WaitUntilDay { day: u32 },
}

/// Actor that replays a list of [`ScriptOp`]s
///
/// # Example
///
/// ```
/// use cashflow_simulator_core::actor::Script;
/// use cashflow_simulator_core::CalendarDuration;
///
/// let savings = Script::new("savings")
///     .emit(5_000, "A", "B", "first")
///     .emit(5_000, "A", "B", "second")
///     .wait_for(CalendarDuration::years(1))
///     .emit(30_000, "A", "B", "after a year");
/// assert_eq!(savings.ops().len(), 4);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    name: String,
    ops: Vec<ScriptOp>,
    cursor: usize,
    repeat: bool,
}

impl Script {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ops: Vec::new(),
            cursor: 0,
            repeat: false,
        }
    }

    pub fn from_ops(name: impl Into<String>, ops: Vec<ScriptOp>) -> Self {
        Self {
            ops,
            ..Self::new(name)
        }
    }

    pub fn push(mut self, op: ScriptOp) -> Self {
        self.ops.push(op);
        self
    }

    pub fn emit(
        self,
        amount: i64,
        source: impl Into<String>,
        destination: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.push(ScriptOp::Emit(
            TransferRequest::new(amount, source, destination).with_description(description),
        ))
    }

    pub fn wait_for(self, duration: CalendarDuration) -> Self {
        self.push(ScriptOp::WaitFor(duration))
    }

    pub fn wait_until(self, date: NaiveDate) -> Self {
        self.push(ScriptOp::WaitUntil { date })
    }

    pub fn wait_until_year_end(self) -> Self {
        self.push(ScriptOp::WaitUntilYearEnd)
    }

    pub fn wait_until_day(self, day: u32) -> Self {
        self.push(ScriptOp::WaitUntilDay { day })
    }

    /// Start over after the last operation instead of finishing
    pub fn repeating(mut self) -> Self {
        self.repeat = true;
        self
    }

    pub fn ops(&self) -> &[ScriptOp] {
        &self.ops
    }
}

impl Actor for Script {
    fn name(&self) -> &str {
        &self.name
    }

    fn resume(&mut self, ctx: &ActorContext<'_>) -> Result<Step, ActorError> {
        if self.cursor >= self.ops.len() {
            if !self.repeat || self.ops.is_empty() {
                return Ok(Step::Finish);
            }
            self.cursor = 0;
        }

        let op = &self.ops[self.cursor];
        self.cursor += 1;

        match op {
            ScriptOp::Emit(request) => Ok(Step::Emit(request.clone())),
            ScriptOp::WaitFor(duration) => Ok(ctx.wait_for(*duration)),
            ScriptOp::WaitUntil { date } => Ok(ctx.wait_until(*date)),
            ScriptOp::WaitUntilYearEnd => ctx.wait_until_year_end(),
            ScriptOp::WaitUntilDay { day } => ctx.wait_until_day(*day),
        }
    }
}
