//! Transfer model
//!
//! A transfer is one atomic cash movement between two accounts on a
//! simulated date. Actors describe the movement with a [`TransferRequest`];
//! the scheduler stamps it with an id, the current date and the emitting
//! actor's name, producing an immutable [`Transfer`].
//!
//! CRITICAL: All money values are i64 (cents)

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when issuing a transfer
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransferError {
    #[error("Transfer amount must not be negative, got {amount}")]
    NegativeAmount { amount: i64 },
}

/// The movement an actor asks for: amount, source, destination, description
///
/// # Example
/// ```
/// use cashflow_simulator_core::TransferRequest;
///
/// let request = TransferRequest::new(5_000, "checking", "savings")
///     .with_description("Monthly saving");
/// assert_eq!(request.amount, 5_000);
/// assert_eq!(request.description, "Monthly saving");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    /// Amount in cents
    pub amount: i64,
    /// Account debited
    pub source: String,
    /// Account credited
    pub destination: String,
    #[serde(default)]
    pub description: String,
}

impl TransferRequest {
    pub fn new(amount: i64, source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            amount,
            source: source.into(),
            destination: destination.into(),
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// An applied cash movement
///
/// Immutable once created. `occurs_on` is always the clock date at which
/// the emitting actor yielded the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    /// Sequential id, in emission order across the whole run
    id: u64,
    occurs_on: NaiveDate,
    amount: i64,
    source: String,
    destination: String,
    description: String,
    /// Name of the actor that emitted the transfer
    actor: String,
}

impl Transfer {
    /// Stamp a request into a transfer
    ///
    /// Zero amounts are legal (logged but balance-neutral).
    ///
    /// # Errors
    /// `TransferError::NegativeAmount` if `request.amount < 0`.
    ///
    /// # Example
    /// ```
    /// use cashflow_simulator_core::{Transfer, TransferError, TransferRequest};
    /// use chrono::NaiveDate;
    ///
    /// let on = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    /// let ok = Transfer::issue(1, on, "payroll", TransferRequest::new(100, "A", "B")).unwrap();
    /// assert_eq!(ok.occurs_on(), on);
    ///
    /// let err = Transfer::issue(2, on, "payroll", TransferRequest::new(-1, "A", "B"));
    /// assert_eq!(err, Err(TransferError::NegativeAmount { amount: -1 }));
    /// ```
    pub fn issue(
        id: u64,
        occurs_on: NaiveDate,
        actor: impl Into<String>,
        request: TransferRequest,
    ) -> Result<Self, TransferError> {
        if request.amount < 0 {
            return Err(TransferError::NegativeAmount {
                amount: request.amount,
            });
        }

        Ok(Self {
            id,
            occurs_on,
            amount: request.amount,
            source: request.source,
            destination: request.destination,
            description: request.description,
            actor: actor.into(),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn occurs_on(&self) -> NaiveDate {
        self.occurs_on
    }

    pub fn amount(&self) -> i64 {
        self.amount
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn actor(&self) -> &str {
        &self.actor
    }

    /// Whether this transfer moves money out of or into `account`
    pub fn touches(&self, account: &str) -> bool {
        self.source == account || self.destination == account
    }
}
