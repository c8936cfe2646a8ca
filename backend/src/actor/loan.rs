//! Amortizing loan actor
//!
//! Models an annuity loan: a drawdown on the start date, then `periods`
//! equal instalments, each split into an interest transfer and a principal
//! transfer.
//!
//! # Accounting
//!
//! ```text
//! drawdown:   principal account ──principal──> borrower account
//! instalment: borrower account  ──interest───> interest account
//!             borrower account  ──repayment──> principal account
//! ```
//!
//! The principal account therefore starts at `-principal` and returns to
//! zero with the last instalment, which repays the exact outstanding amount
//! so that per-period rounding never leaves a residue.
//!
//! CRITICAL: All money values are i64 (cents). Interest is rounded to the
//! nearest cent each period.

use super::{Actor, ActorContext, ActorError, Step};
use crate::core::time::CalendarDuration;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Financial terms of a loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanTerms {
    /// Amount borrowed (cents)
    pub principal: i64,
    /// Interest rate per instalment period (e.g. 0.05 / 12 for 5% p.a. monthly)
    pub rate_per_period: f64,
    /// Number of instalments
    pub periods: u32,
    /// Time between instalments
    pub interval: CalendarDuration,
}

impl LoanTerms {
    /// Fixed annuity instalment (interest + principal), in cents
    pub fn instalment(&self) -> i64 {
        let principal = self.principal as f64;
        if self.rate_per_period == 0.0 {
            return (principal / f64::from(self.periods)).round() as i64;
        }
        let r = self.rate_per_period;
        let n = i32::try_from(self.periods).unwrap_or(i32::MAX);
        (principal * r / (1.0 - (1.0 + r).powi(-n))).round() as i64
    }

    fn validate(&self) -> Result<(), ActorError> {
        if self.principal < 0 {
            return Err(ActorError::failed(format!(
                "loan principal must not be negative, got {}",
                self.principal
            )));
        }
        if self.periods == 0 {
            return Err(ActorError::failed("loan must have at least one period"));
        }
        if !self.rate_per_period.is_finite() || self.rate_per_period < 0.0 {
            return Err(ActorError::failed(format!(
                "loan rate must be a non-negative number, got {}",
                self.rate_per_period
            )));
        }
        if self.interval.is_zero() {
            return Err(ActorError::failed("loan interval must not be zero"));
        }
        Ok(())
    }
}

/// Accounts a loan moves money between
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanAccounts {
    /// Receives the drawdown and pays the instalments
    pub borrower: String,
    /// Tracks outstanding principal (negative while the loan is open)
    pub principal: String,
    /// Collects interest payments
    pub interest: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum LoanPhase {
    Drawdown,
    AwaitInstalment { index: u32 },
    RepayPrincipal { index: u32, amount: i64 },
    Repaid,
}

/// Annuity loan actor
///
/// # Example
///
/// ```
/// use cashflow_simulator_core::actor::{AmortizingLoan, LoanAccounts, LoanTerms};
/// use cashflow_simulator_core::CalendarDuration;
///
/// let terms = LoanTerms {
///     principal: 30_000_000,
///     rate_per_period: 0.05 / 12.0,
///     periods: 12,
///     interval: CalendarDuration::months(1),
/// };
/// assert_eq!(terms.instalment(), 2_568_224);
///
/// let loan = AmortizingLoan::new(
///     "mortgage",
///     terms,
///     LoanAccounts {
///         borrower: "payments".to_string(),
///         principal: "principal".to_string(),
///         interest: "interest".to_string(),
///     },
/// );
/// # drop(loan);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AmortizingLoan {
    name: String,
    terms: LoanTerms,
    accounts: LoanAccounts,
    instalment: i64,
    phase: LoanPhase,
    anchor: Option<NaiveDate>,
    outstanding: i64,
}

impl AmortizingLoan {
    pub fn new(name: impl Into<String>, terms: LoanTerms, accounts: LoanAccounts) -> Self {
        Self {
            name: name.into(),
            instalment: terms.instalment(),
            outstanding: terms.principal,
            terms,
            accounts,
            phase: LoanPhase::Drawdown,
            anchor: None,
        }
    }

    /// Principal still to be repaid (cents)
    pub fn outstanding(&self) -> i64 {
        self.outstanding
    }
}

impl Actor for AmortizingLoan {
    fn name(&self) -> &str {
        &self.name
    }

    fn resume(&mut self, ctx: &ActorContext<'_>) -> Result<Step, ActorError> {
        loop {
            match self.phase.clone() {
                LoanPhase::Drawdown => {
                    self.terms.validate()?;
                    self.anchor = Some(ctx.now());
                    self.phase = LoanPhase::AwaitInstalment { index: 1 };
                    return Ok(ctx.emit(
                        self.terms.principal,
                        self.accounts.principal.clone(),
                        self.accounts.borrower.clone(),
                        "Loan drawdown",
                    ));
                }
                LoanPhase::AwaitInstalment { index } => {
                    let anchor = self.anchor.unwrap_or_else(|| ctx.now());
                    let due = i32::try_from(index)
                        .ok()
                        .and_then(|n| self.terms.interval.scaled(n))
                        .and_then(|offset| offset.add_to(anchor))
                        .ok_or_else(|| {
                            ActorError::InvalidDate(format!(
                                "instalment {} from {} is out of range",
                                index, anchor
                            ))
                        })?;
                    if due > ctx.now() {
                        return Ok(ctx.wait_until(due));
                    }

                    let interest =
                        (self.outstanding as f64 * self.terms.rate_per_period).round() as i64;
                    let repayment = if index == self.terms.periods {
                        self.outstanding
                    } else {
                        (self.instalment - interest).clamp(0, self.outstanding)
                    };
                    self.phase = LoanPhase::RepayPrincipal {
                        index,
                        amount: repayment,
                    };
                    if interest > 0 {
                        return Ok(ctx.emit(
                            interest,
                            self.accounts.borrower.clone(),
                            self.accounts.interest.clone(),
                            format!("Interest payment {}/{}", index, self.terms.periods),
                        ));
                    }
                }
                LoanPhase::RepayPrincipal { index, amount } => {
                    self.outstanding -= amount;
                    self.phase = if index == self.terms.periods {
                        LoanPhase::Repaid
                    } else {
                        LoanPhase::AwaitInstalment { index: index + 1 }
                    };
                    return Ok(ctx.emit(
                        amount,
                        self.accounts.borrower.clone(),
                        self.accounts.principal.clone(),
                        format!("Amortization payment {}/{}", index, self.terms.periods),
                    ));
                }
                LoanPhase::Repaid => return Ok(Step::Finish),
            }
        }
    }
}
