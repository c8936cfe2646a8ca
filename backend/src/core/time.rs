//! Time management for the simulation
//!
//! The simulation runs on a calendar axis of `NaiveDate`s. Time only moves
//! forward, and only when the scheduler decides it should: there is no fixed
//! tick size, so a ten-year wait costs one scheduling step.
//!
//! # Critical Invariants
//!
//! 1. `Clock::advance_to` never moves the current date backward
//! 2. A suspension request is resolved to an absolute date exactly once,
//!    at the moment it is issued

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Neg};
use thiserror::Error;

/// Errors raised by clock operations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TimeError {
    #[error("Clock cannot move backward: current date {current}, requested {target}")]
    BackwardsAdvance {
        current: NaiveDate,
        target: NaiveDate,
    },

    #[error("Date out of range: {date} shifted by {duration}")]
    DateOutOfRange {
        date: NaiveDate,
        duration: CalendarDuration,
    },
}

/// Signed offset in calendar units
///
/// Applied calendar-style: years and months first (clamping the day to the
/// end of the target month), then days.
///
/// # Example
/// ```
/// use cashflow_simulator_core::CalendarDuration;
/// use chrono::NaiveDate;
///
/// let start = NaiveDate::from_ymd_opt(2020, 1, 31).unwrap();
/// let one_month = CalendarDuration::months(1);
/// assert_eq!(one_month.add_to(start), NaiveDate::from_ymd_opt(2020, 2, 29));
///
/// let year_less_a_day = CalendarDuration::new(1, 0, -1);
/// assert_eq!(year_less_a_day.add_to(start), NaiveDate::from_ymd_opt(2021, 1, 30));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarDuration {
    pub years: i32,
    pub months: i32,
    pub days: i32,
}

impl CalendarDuration {
    pub const ZERO: CalendarDuration = CalendarDuration {
        years: 0,
        months: 0,
        days: 0,
    };

    pub fn new(years: i32, months: i32, days: i32) -> Self {
        Self {
            years,
            months,
            days,
        }
    }

    pub fn years(years: i32) -> Self {
        Self::new(years, 0, 0)
    }

    pub fn months(months: i32) -> Self {
        Self::new(0, months, 0)
    }

    pub fn days(days: i32) -> Self {
        Self::new(0, 0, days)
    }

    /// True when applying this duration leaves every date unchanged
    pub fn is_zero(&self) -> bool {
        self.total_months() == 0 && self.days == 0
    }

    /// Years and months folded into a single month count
    pub fn total_months(&self) -> i64 {
        i64::from(self.years) * 12 + i64::from(self.months)
    }

    /// Multiply every component by `factor`, or `None` on overflow
    pub fn scaled(&self, factor: i32) -> Option<Self> {
        Some(Self {
            years: self.years.checked_mul(factor)?,
            months: self.months.checked_mul(factor)?,
            days: self.days.checked_mul(factor)?,
        })
    }

    /// Shift `date` by this duration
    ///
    /// Returns `None` if the result falls outside the representable range.
    pub fn add_to(&self, date: NaiveDate) -> Option<NaiveDate> {
        let months = self.total_months();
        let magnitude = Months::new(u32::try_from(months.unsigned_abs()).ok()?);
        let shifted = if months >= 0 {
            date.checked_add_months(magnitude)?
        } else {
            date.checked_sub_months(magnitude)?
        };

        let days = Days::new(u64::from(self.days.unsigned_abs()));
        if self.days >= 0 {
            shifted.checked_add_days(days)
        } else {
            shifted.checked_sub_days(days)
        }
    }

    /// Calendar distance from `from` to `to`
    ///
    /// Whole months are counted first, the remainder in days, so that
    /// `between(a, b).add_to(a) == Some(b)` for `a <= b`.
    ///
    /// # Example
    /// ```
    /// use cashflow_simulator_core::CalendarDuration;
    /// use chrono::NaiveDate;
    ///
    /// let from = NaiveDate::from_ymd_opt(2019, 6, 1).unwrap();
    /// let to = NaiveDate::from_ymd_opt(2020, 8, 15).unwrap();
    /// assert_eq!(CalendarDuration::between(from, to), CalendarDuration::new(1, 2, 14));
    /// ```
    pub fn between(from: NaiveDate, to: NaiveDate) -> Self {
        if to < from {
            return -Self::between(to, from);
        }

        let mut months = (i64::from(to.year()) - i64::from(from.year())) * 12
            + (i64::from(to.month()) - i64::from(from.month()));
        let mut anchor = shift_months(from, months);
        while anchor.map_or(true, |a| a > to) && months > 0 {
            months -= 1;
            anchor = shift_months(from, months);
        }
        let days = anchor.map_or(0, |a| to.signed_duration_since(a).num_days());

        Self {
            years: (months / 12) as i32,
            months: (months % 12) as i32,
            days: days as i32,
        }
    }
}

fn shift_months(date: NaiveDate, months: i64) -> Option<NaiveDate> {
    let months = i32::try_from(months).ok()?;
    CalendarDuration::months(months).add_to(date)
}

impl Add for CalendarDuration {
    type Output = CalendarDuration;

    fn add(self, rhs: CalendarDuration) -> CalendarDuration {
        CalendarDuration {
            years: self.years.saturating_add(rhs.years),
            months: self.months.saturating_add(rhs.months),
            days: self.days.saturating_add(rhs.days),
        }
    }
}

impl Neg for CalendarDuration {
    type Output = CalendarDuration;

    fn neg(self) -> CalendarDuration {
        CalendarDuration {
            years: self.years.saturating_neg(),
            months: self.months.saturating_neg(),
            days: self.days.saturating_neg(),
        }
    }
}

impl fmt::Display for CalendarDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}y{}m{}d", self.years, self.months, self.days)
    }
}

/// A process's declaration that it cannot proceed until a later date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SuspendRequest {
    /// Wait until an absolute date
    UntilDate(NaiveDate),
    /// Wait for a duration measured from the date the request is issued
    AfterDuration(CalendarDuration),
}

/// Manages the current simulated date
///
/// Owned by the scheduler. Actors only ever see it through a shared
/// reference and cannot move it.
///
/// # Example
/// ```
/// use cashflow_simulator_core::{CalendarDuration, Clock, SuspendRequest};
/// use chrono::NaiveDate;
///
/// let start = NaiveDate::from_ymd_opt(2019, 6, 1).unwrap();
/// let mut clock = Clock::new(start);
/// assert_eq!(clock.now(), start);
///
/// let target = clock
///     .resolve(&SuspendRequest::AfterDuration(CalendarDuration::years(1)))
///     .unwrap();
/// clock.advance_to(target).unwrap();
/// assert_eq!(clock.now(), NaiveDate::from_ymd_opt(2020, 6, 1).unwrap());
/// assert!(clock.advance_to(start).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clock {
    /// Date the simulation started on
    start_date: NaiveDate,
    /// Current simulated date
    current_date: NaiveDate,
}

impl Clock {
    pub fn new(start_date: NaiveDate) -> Self {
        Self {
            start_date,
            current_date: start_date,
        }
    }

    /// Current simulated date
    pub fn now(&self) -> NaiveDate {
        self.current_date
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    /// Calendar time elapsed since the start date
    pub fn elapsed(&self) -> CalendarDuration {
        CalendarDuration::between(self.start_date, self.current_date)
    }

    /// Move the clock to `target`
    ///
    /// # Errors
    /// `TimeError::BackwardsAdvance` if `target` is before the current date.
    /// The clock is left untouched in that case.
    pub fn advance_to(&mut self, target: NaiveDate) -> Result<(), TimeError> {
        if target < self.current_date {
            return Err(TimeError::BackwardsAdvance {
                current: self.current_date,
                target,
            });
        }
        self.current_date = target;
        Ok(())
    }

    /// Resolve a suspension request to an absolute date
    ///
    /// Durations are measured from the current date. The result may lie in
    /// the past; rejecting such waits is the scheduler's decision.
    pub fn resolve(&self, request: &SuspendRequest) -> Result<NaiveDate, TimeError> {
        match request {
            SuspendRequest::UntilDate(date) => Ok(*date),
            SuspendRequest::AfterDuration(duration) => {
                duration
                    .add_to(self.current_date)
                    .ok_or(TimeError::DateOutOfRange {
                        date: self.current_date,
                        duration: *duration,
                    })
            }
        }
    }
}

/// Next 31 December strictly after `date`
pub fn next_year_end(date: NaiveDate) -> Option<NaiveDate> {
    let this_year = NaiveDate::from_ymd_opt(date.year(), 12, 31)?;
    if this_year > date {
        Some(this_year)
    } else {
        NaiveDate::from_ymd_opt(date.year() + 1, 12, 31)
    }
}

/// Next occurrence of day-of-month `day` strictly after `date`
///
/// Only the current and the following month are considered. `None` if the
/// day does not exist in the current month, even when the occurrence would
/// fall in the following one, or if it is needed from the following month
/// and does not exist there.
pub fn next_day_of_month(date: NaiveDate, day: u32) -> Option<NaiveDate> {
    let this_month = NaiveDate::from_ymd_opt(date.year(), date.month(), day)?;
    if this_month > date {
        return Some(this_month);
    }
    let (year, month) = following_month(date.year(), date.month());
    NaiveDate::from_ymd_opt(year, month, day)
}

/// The (year, month) that made [`next_day_of_month`] return `None`
pub fn month_missing_day(date: NaiveDate, day: u32) -> (i32, u32) {
    if NaiveDate::from_ymd_opt(date.year(), date.month(), day).is_none() {
        (date.year(), date.month())
    } else {
        following_month(date.year(), date.month())
    }
}

fn following_month(year: i32, month: u32) -> (i32, u32) {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_negative_months_clamp_to_month_end() {
        let d = CalendarDuration::months(-1).add_to(date(2020, 3, 31));
        assert_eq!(d, Some(date(2020, 2, 29)));
    }

    #[test]
    fn test_between_is_inverse_of_add() {
        let from = date(2019, 1, 31);
        let to = date(2024, 3, 1);
        let d = CalendarDuration::between(from, to);
        assert_eq!(d.add_to(from), Some(to));
    }

    #[test]
    fn test_between_reversed_is_negated() {
        let a = date(2019, 6, 1);
        let b = date(2020, 6, 11);
        assert_eq!(
            CalendarDuration::between(b, a),
            -CalendarDuration::between(a, b)
        );
    }

    #[test]
    fn test_backwards_advance_keeps_date() {
        let mut clock = Clock::new(date(2020, 1, 1));
        let err = clock.advance_to(date(2019, 12, 31)).unwrap_err();
        assert_eq!(
            err,
            TimeError::BackwardsAdvance {
                current: date(2020, 1, 1),
                target: date(2019, 12, 31),
            }
        );
        assert_eq!(clock.now(), date(2020, 1, 1));
    }

    #[test]
    fn test_day_of_month_rolls_over_year() {
        assert_eq!(next_day_of_month(date(2020, 12, 15), 1), Some(date(2021, 1, 1)));
        assert_eq!(next_day_of_month(date(2020, 12, 15), 20), Some(date(2020, 12, 20)));
    }
}
