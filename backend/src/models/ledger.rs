//! Ledger
//!
//! Account balances plus the append-only history of applied transfers.
//!
//! # Critical Invariants
//!
//! 1. **Forward accumulation**: an account's balance at date `d` equals its
//!    opening balance plus credits minus debits over transfers with
//!    `occurs_on <= d`. Nothing is ever recomputed retroactively.
//! 2. **Emission order**: history is kept in the order transfers were applied.
//! 3. **Atomicity**: a transfer either debits and credits both sides, or
//!    leaves the ledger untouched.
//! 4. **Range**: no balance ever leaves the i64 range; a transfer that would
//!    push one out is rejected.

use crate::models::account::Account;
use crate::models::transfer::Transfer;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// What to do when a transfer names an account that was never registered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountPolicy {
    /// Create the account with a zero opening balance
    #[default]
    AutoCreate,
    /// Reject the transfer
    Strict,
}

/// Errors that can occur during ledger operations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Account id must not be empty")]
    EmptyAccountId,

    #[error("Account '{0}' already exists")]
    DuplicateAccount(String),

    #[error("Account '{0}' is not a registered account")]
    UnknownAccount(String),

    #[error("Balance of account '{0}' would overflow")]
    BalanceOverflow(String),
}

/// One side of a transfer: a signed movement on a single account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub transfer_id: u64,
    pub date: NaiveDate,
    pub account: String,
    /// Negative for the source, positive for the destination
    pub amount: i64,
    pub description: String,
    pub actor: String,
}

/// Balances of every account right after all transfers of `date`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceRow {
    pub date: NaiveDate,
    pub balances: BTreeMap<String, i64>,
}

/// Account store and transfer history
///
/// # Example
///
/// ```rust
/// use cashflow_simulator_core::{Account, AccountPolicy, Ledger, Transfer, TransferRequest};
/// use chrono::NaiveDate;
///
/// let mut ledger = Ledger::new(AccountPolicy::AutoCreate);
/// ledger.open_account(Account::new("A", 1_000)).unwrap();
///
/// let on = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
/// let transfer = Transfer::issue(1, on, "actor", TransferRequest::new(400, "A", "B")).unwrap();
/// let created = ledger.apply(transfer).unwrap();
///
/// assert_eq!(created, vec!["B".to_string()]);
/// assert_eq!(ledger.balance("A"), Some(600));
/// assert_eq!(ledger.balance("B"), Some(400));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ledger {
    accounts: BTreeMap<String, Account>,
    history: Vec<Transfer>,
    policy: AccountPolicy,
}

impl Ledger {
    pub fn new(policy: AccountPolicy) -> Self {
        Self {
            accounts: BTreeMap::new(),
            history: Vec::new(),
            policy,
        }
    }

    /// Register an account
    ///
    /// # Errors
    /// `EmptyAccountId` or `DuplicateAccount`.
    pub fn open_account(&mut self, account: Account) -> Result<(), LedgerError> {
        if account.id().is_empty() {
            return Err(LedgerError::EmptyAccountId);
        }
        if self.accounts.contains_key(account.id()) {
            return Err(LedgerError::DuplicateAccount(account.id().to_string()));
        }
        self.accounts.insert(account.id().to_string(), account);
        Ok(())
    }

    /// Debit the source, credit the destination and append to history
    ///
    /// Returns the ids of accounts created on the way (only under
    /// `AccountPolicy::AutoCreate`).
    ///
    /// # Errors
    /// `UnknownAccount` under `AccountPolicy::Strict`; `EmptyAccountId` for a
    /// blank id; `BalanceOverflow` if either side would leave the i64 range.
    /// The ledger is unchanged on error.
    pub fn apply(&mut self, transfer: Transfer) -> Result<Vec<String>, LedgerError> {
        let mut missing = Vec::new();
        for id in [transfer.source(), transfer.destination()] {
            if id.is_empty() {
                return Err(LedgerError::EmptyAccountId);
            }
            if !self.accounts.contains_key(id) && !missing.iter().any(|m: &String| m == id) {
                if self.policy == AccountPolicy::Strict {
                    return Err(LedgerError::UnknownAccount(id.to_string()));
                }
                missing.push(id.to_string());
            }
        }

        let amount = transfer.amount();
        let self_transfer = transfer.source() == transfer.destination();
        if !self_transfer {
            let source = self.balance(transfer.source()).unwrap_or(0);
            if source.checked_sub(amount).is_none() {
                return Err(LedgerError::BalanceOverflow(transfer.source().to_string()));
            }
            let destination = self.balance(transfer.destination()).unwrap_or(0);
            if destination.checked_add(amount).is_none() {
                return Err(LedgerError::BalanceOverflow(
                    transfer.destination().to_string(),
                ));
            }
        }

        for id in &missing {
            self.accounts
                .insert(id.clone(), Account::auto_created(id.clone()));
        }

        // Both sides were range-checked above.
        if !self_transfer {
            if let Some(source) = self.accounts.get_mut(transfer.source()) {
                source.debit(amount);
            }
            if let Some(destination) = self.accounts.get_mut(transfer.destination()) {
                destination.credit(amount);
            }
        }
        self.history.push(transfer);

        Ok(missing)
    }

    pub fn policy(&self) -> AccountPolicy {
        self.policy
    }

    pub fn account(&self, id: &str) -> Option<&Account> {
        self.accounts.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.accounts.contains_key(id)
    }

    /// All accounts, ordered by id
    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    /// Current balance of an account
    pub fn balance(&self, id: &str) -> Option<i64> {
        self.accounts.get(id).map(Account::balance)
    }

    /// Current balances of all accounts
    pub fn balances(&self) -> BTreeMap<String, i64> {
        self.accounts
            .iter()
            .map(|(id, account)| (id.clone(), account.balance()))
            .collect()
    }

    /// Sum of current balances over `ids`
    ///
    /// # Errors
    /// `UnknownAccount` for the first id that is not in the ledger;
    /// `BalanceOverflow` naming the account at which the sum overflowed.
    pub fn total_of<I, S>(&self, ids: I) -> Result<i64, LedgerError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        ids.into_iter().try_fold(0i64, |total, id| {
            let id = id.as_ref();
            let balance = self
                .balance(id)
                .ok_or_else(|| LedgerError::UnknownAccount(id.to_string()))?;
            total
                .checked_add(balance)
                .ok_or_else(|| LedgerError::BalanceOverflow(id.to_string()))
        })
    }

    /// Applied transfers in emission order
    pub fn history(&self) -> &[Transfer] {
        &self.history
    }

    /// Transfers dated `date`, in emission order
    pub fn transfers_on(&self, date: NaiveDate) -> Vec<&Transfer> {
        self.history
            .iter()
            .filter(|t| t.occurs_on() == date)
            .collect()
    }

    /// Double-entry view of the history, ordered by transfer id
    pub fn postings(&self) -> Vec<Posting> {
        let mut postings = Vec::with_capacity(self.history.len() * 2);
        let mut ordered: Vec<&Transfer> = self.history.iter().collect();
        ordered.sort_by_key(|t| t.id());

        for transfer in ordered {
            for (account, amount) in [
                (transfer.source(), -transfer.amount()),
                (transfer.destination(), transfer.amount()),
            ] {
                postings.push(Posting {
                    transfer_id: transfer.id(),
                    date: transfer.occurs_on(),
                    account: account.to_string(),
                    amount,
                    description: transfer.description().to_string(),
                    actor: transfer.actor().to_string(),
                });
            }
        }
        postings
    }

    fn opening_balances(&self) -> BTreeMap<String, i64> {
        self.accounts
            .iter()
            .map(|(id, account)| (id.clone(), account.opening_balance()))
            .collect()
    }

    /// Cumulative balances after each date that saw at least one transfer
    ///
    /// Dates ascend. Every row lists every account in the ledger, including
    /// accounts that were auto-created later in the run (at their opening
    /// balance of zero).
    pub fn balances_by_date(&self) -> Vec<BalanceRow> {
        let mut running = self.opening_balances();
        let mut ordered: Vec<&Transfer> = self.history.iter().collect();
        ordered.sort_by_key(|t| t.occurs_on());

        let mut rows: Vec<BalanceRow> = Vec::new();
        let mut iter = ordered.into_iter().peekable();
        while let Some(transfer) = iter.next() {
            post(&mut running, transfer);
            let date_complete = iter
                .peek()
                .map_or(true, |next| next.occurs_on() != transfer.occurs_on());
            if date_complete {
                rows.push(BalanceRow {
                    date: transfer.occurs_on(),
                    balances: running.clone(),
                });
            }
        }
        rows
    }

    /// Balances as of `date` with carry-forward semantics
    ///
    /// A date without transfers yields the balances after the most recent
    /// earlier transfer date; a date before any transfer yields the opening
    /// balances.
    pub fn balances_at(&self, date: NaiveDate) -> BTreeMap<String, i64> {
        let mut running = self.opening_balances();
        for transfer in self.history.iter().filter(|t| t.occurs_on() <= date) {
            post(&mut running, transfer);
        }
        running
    }

    /// Balance of one account as of `date`, `None` if the account is unknown
    pub fn balance_at(&self, id: &str, date: NaiveDate) -> Option<i64> {
        let opening = self.accounts.get(id)?.opening_balance();
        // Replayed in application order, so every partial sum is a balance
        // the account actually held.
        let balance = self
            .history
            .iter()
            .filter(|t| t.occurs_on() <= date && t.source() != t.destination())
            .fold(opening, |balance, t| {
                if t.destination() == id {
                    balance + t.amount()
                } else if t.source() == id {
                    balance - t.amount()
                } else {
                    balance
                }
            });
        Some(balance)
    }
}

fn post(running: &mut BTreeMap<String, i64>, transfer: &Transfer) {
    if transfer.source() == transfer.destination() {
        return;
    }
    *running.entry(transfer.source().to_string()).or_insert(0) -= transfer.amount();
    *running
        .entry(transfer.destination().to_string())
        .or_insert(0) += transfer.amount();
}
