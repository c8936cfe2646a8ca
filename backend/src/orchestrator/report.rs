//! Report - Serializable Run Summary
//!
//! Flattens a [`SimulationResult`] into plain data that can be written as
//! JSON, read back and verified.
//!
//! # Critical Invariants
//!
//! - **Determinism**: identical runs produce identical reports, including
//!   the history digest
//! - **Balance Conservation**: every transfer moves money between two
//!   accounts, so total closing balance equals total opening balance
//! - **Replay**: each closing balance equals the opening balance plus the
//!   account's credits minus its debits in `transfers`

use crate::models::account::{Account, AccountKind};
use crate::models::ledger::BalanceRow;
use crate::models::transfer::Transfer;
use crate::orchestrator::engine::{EndReason, SimulationError, SimulationResult};
use crate::orchestrator::process::{ProcessOutcome, ProcessState};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

// ============================================================================
// Snapshot Structures
// ============================================================================

/// Complete run summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,

    /// Clock date when the run stopped
    pub final_date: NaiveDate,
    pub end_reason: EndReason,

    /// Process end states, in registration order
    pub processes: Vec<ProcessSnapshot>,

    /// Accounts ordered by id
    pub accounts: Vec<AccountSnapshot>,

    /// Transfer history in emission order
    pub transfers: Vec<Transfer>,

    pub balances_by_date: Vec<BalanceRow>,

    /// SHA256 of the compact JSON encoding of `transfers`
    pub history_digest: String,
}

/// How a process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessStatus {
    NotStarted,
    Running,
    Suspended,
    Finished,
    Errored,
}

/// Process end state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSnapshot {
    pub index: usize,
    pub name: String,
    pub status: ProcessStatus,

    /// Finish or error date; wait target for suspended processes
    pub date: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&ProcessOutcome> for ProcessSnapshot {
    fn from(outcome: &ProcessOutcome) -> Self {
        let (status, date, error) = match &outcome.state {
            ProcessState::Created => (ProcessStatus::NotStarted, None, None),
            ProcessState::Running => (ProcessStatus::Running, None, None),
            ProcessState::Suspended { until } => (ProcessStatus::Suspended, Some(*until), None),
            ProcessState::Finished { on } => (ProcessStatus::Finished, Some(*on), None),
            ProcessState::Errored { on, error } => {
                (ProcessStatus::Errored, Some(*on), Some(error.to_string()))
            }
        };
        ProcessSnapshot {
            index: outcome.index,
            name: outcome.name.clone(),
            status,
            date,
            error,
        }
    }
}

/// Account state at the end of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub id: String,
    pub opening_balance: i64,
    pub closing_balance: i64,
    pub kind: Option<AccountKind>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub auto_created: bool,
}

impl From<&Account> for AccountSnapshot {
    fn from(account: &Account) -> Self {
        AccountSnapshot {
            id: account.id().to_string(),
            opening_balance: account.opening_balance(),
            closing_balance: account.balance(),
            kind: account.kind(),
            description: account.description().map(str::to_string),
            category: account.category().map(str::to_string),
            auto_created: account.is_auto_created(),
        }
    }
}

impl SimulationReport {
    pub(crate) fn from_result(result: &SimulationResult) -> Result<Self, SimulationError> {
        let ledger = result.ledger();
        let transfers = ledger.history().to_vec();
        let history_digest = history_digest(&transfers)?;

        Ok(SimulationReport {
            start_date: result.start_date(),
            end_date: result.end_date(),
            final_date: result.final_date(),
            end_reason: result.end_reason(),
            processes: result.processes().iter().map(ProcessSnapshot::from).collect(),
            accounts: ledger.accounts().map(AccountSnapshot::from).collect(),
            transfers,
            balances_by_date: ledger.balances_by_date(),
            history_digest,
        })
    }

    pub fn to_json(&self) -> Result<String, SimulationError> {
        serde_json::to_string_pretty(self).map_err(|e| {
            SimulationError::Serialization(format!("Report serialization failed: {}", e))
        })
    }

    pub fn from_json(json: &str) -> Result<Self, SimulationError> {
        serde_json::from_str(json).map_err(|e| {
            SimulationError::Serialization(format!("Report deserialization failed: {}", e))
        })
    }
}

// ============================================================================
// History Hashing
// ============================================================================

/// Compute deterministic SHA256 hash of a transfer history
///
/// `Transfer` serializes as a struct with a fixed field order, so its
/// compact JSON encoding is already canonical.
pub fn history_digest(transfers: &[Transfer]) -> Result<String, SimulationError> {
    let json = serde_json::to_string(transfers).map_err(|e| {
        SimulationError::Serialization(format!("History serialization failed: {}", e))
    })?;

    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    let result = hasher.finalize();

    Ok(format!("{:x}", result))
}

// ============================================================================
// Validation
// ============================================================================

/// Check a (possibly deserialized) report for internal consistency
///
/// Checks:
/// - Balance conservation across all accounts
/// - Closing balances replay from opening balances and transfers
/// - Digest matches the transfer list
pub fn validate_report(report: &SimulationReport) -> Result<(), SimulationError> {
    let opening: i128 = report.accounts.iter().map(|a| i128::from(a.opening_balance)).sum();
    let closing: i128 = report.accounts.iter().map(|a| i128::from(a.closing_balance)).sum();
    if opening != closing {
        return Err(SimulationError::ReportValidation(format!(
            "Balance conservation violated: opening total {}, closing total {}",
            opening, closing
        )));
    }

    let mut replayed: BTreeMap<&str, i64> = report
        .accounts
        .iter()
        .map(|a| (a.id.as_str(), a.opening_balance))
        .collect();
    for transfer in report.transfers.iter().filter(|t| t.source() != t.destination()) {
        for (id, delta) in [
            (transfer.source(), -transfer.amount()),
            (transfer.destination(), transfer.amount()),
        ] {
            let balance = replayed.get_mut(id).ok_or_else(|| {
                SimulationError::ReportValidation(format!(
                    "Transfer {} references unknown account {}",
                    transfer.id(),
                    id
                ))
            })?;
            *balance = balance.checked_add(delta).ok_or_else(|| {
                SimulationError::ReportValidation(format!(
                    "Transfer {} overflows the balance of account {}",
                    transfer.id(),
                    id
                ))
            })?;
        }
    }
    for account in &report.accounts {
        let expected = replayed.get(account.id.as_str()).copied().unwrap_or_default();
        if expected != account.closing_balance {
            return Err(SimulationError::ReportValidation(format!(
                "Account {} closes at {} but its transfers replay to {}",
                account.id, account.closing_balance, expected
            )));
        }
    }

    let digest = history_digest(&report.transfers)?;
    if digest != report.history_digest {
        return Err(SimulationError::ReportValidation(
            "History digest does not match transfers".to_string(),
        ));
    }

    Ok(())
}
