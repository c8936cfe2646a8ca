//! Recurring transfer actor
//!
//! Emits the same transfer on a fixed calendar interval. Occurrence `n` is
//! computed as `anchor + interval × n` rather than by chaining waits, so a
//! monthly transfer anchored on 31 January lands on 29 February and then on
//! 31 March, never drifting to the 29th.

use super::{Actor, ActorContext, ActorError, Step};
use crate::core::time::CalendarDuration;
use crate::models::transfer::TransferRequest;
use chrono::NaiveDate;

/// Fixed transfer repeated every `interval`
///
/// # Example
///
/// ```
/// use cashflow_simulator_core::actor::RecurringTransfer;
/// use cashflow_simulator_core::{CalendarDuration, TransferRequest};
///
/// let rent = RecurringTransfer::new(
///     "rent",
///     TransferRequest::new(120_000, "checking", "landlord").with_description("Rent"),
///     CalendarDuration::months(1),
/// )
/// .with_count(12);
/// # drop(rent);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurringTransfer {
    name: String,
    request: TransferRequest,
    interval: CalendarDuration,
    /// First occurrence; defaults to the date the actor starts
    first: Option<NaiveDate>,
    /// Last date an occurrence may fall on
    until: Option<NaiveDate>,
    /// Maximum number of transfers
    count: Option<u32>,

    anchor: Option<NaiveDate>,
    next_index: i32,
    emitted: u32,
}

impl RecurringTransfer {
    pub fn new(
        name: impl Into<String>,
        request: TransferRequest,
        interval: CalendarDuration,
    ) -> Self {
        Self {
            name: name.into(),
            request,
            interval,
            first: None,
            until: None,
            count: None,
            anchor: None,
            next_index: 0,
            emitted: 0,
        }
    }

    pub fn starting_on(mut self, first: NaiveDate) -> Self {
        self.first = Some(first);
        self
    }

    pub fn until(mut self, until: NaiveDate) -> Self {
        self.until = Some(until);
        self
    }

    pub fn with_count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }

    /// Number of transfers emitted so far
    pub fn emitted(&self) -> u32 {
        self.emitted
    }
}

impl Actor for RecurringTransfer {
    fn name(&self) -> &str {
        &self.name
    }

    fn resume(&mut self, ctx: &ActorContext<'_>) -> Result<Step, ActorError> {
        if self.interval.is_zero() {
            return Err(ActorError::failed("recurrence interval must not be zero"));
        }

        let now = ctx.now();
        let anchor = *self.anchor.get_or_insert(self.first.unwrap_or(now));

        loop {
            if self.count.is_some_and(|count| self.emitted >= count) {
                return Ok(Step::Finish);
            }

            let due = self
                .interval
                .scaled(self.next_index)
                .and_then(|offset| offset.add_to(anchor))
                .ok_or_else(|| {
                    ActorError::InvalidDate(format!(
                        "occurrence {} of {} from {} is out of range",
                        self.next_index, self.interval, anchor
                    ))
                })?;

            if self.until.is_some_and(|until| due > until) {
                return Ok(Step::Finish);
            }

            if due > now {
                return Ok(ctx.wait_until(due));
            }

            self.next_index += 1;
            if due == now {
                self.emitted += 1;
                return Ok(Step::Emit(self.request.clone()));
            }
            // Occurrences before the actor started are skipped
        }
    }
}
