//! Account model
//!
//! An account is an identifier plus a running balance. There is no overdraft
//! enforcement: balances may go negative.
//!
//! CRITICAL: All money values are i64 (cents)

use serde::{Deserialize, Serialize};
use std::fmt;

/// Accounting classification of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    Asset,
    Liability,
    Income,
    Expense,
    Equity,
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AccountKind::Asset => "asset",
            AccountKind::Liability => "liability",
            AccountKind::Income => "income",
            AccountKind::Expense => "expense",
            AccountKind::Equity => "equity",
        };
        f.write_str(name)
    }
}

/// A ledger account
///
/// # Example
/// ```
/// use cashflow_simulator_core::{Account, AccountKind};
///
/// let mut cash = Account::new("cash", 10_000).with_kind(AccountKind::Asset);
/// assert_eq!(cash.debit(12_500), Some(-2_500)); // no overdraft enforcement
/// assert_eq!(cash.opening_balance(), 10_000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Unique account identifier (e.g., "checking")
    id: String,

    /// Balance at the start date (i64 cents)
    opening_balance: i64,

    /// Current running balance (i64 cents)
    balance: i64,

    kind: Option<AccountKind>,
    description: Option<String>,
    category: Option<String>,

    /// Created on first reference by a transfer rather than registered up front
    auto_created: bool,
}

impl Account {
    pub fn new(id: impl Into<String>, opening_balance: i64) -> Self {
        Self {
            id: id.into(),
            opening_balance,
            balance: opening_balance,
            kind: None,
            description: None,
            category: None,
            auto_created: false,
        }
    }

    /// Zero-balance account created when a transfer names an unknown id
    pub(crate) fn auto_created(id: impl Into<String>) -> Self {
        Self {
            auto_created: true,
            ..Self::new(id, 0)
        }
    }

    pub fn with_kind(mut self, kind: AccountKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn opening_balance(&self) -> i64 {
        self.opening_balance
    }

    pub fn balance(&self) -> i64 {
        self.balance
    }

    pub fn kind(&self) -> Option<AccountKind> {
        self.kind
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn is_auto_created(&self) -> bool {
        self.auto_created
    }

    /// Net movement since the start date, `None` if it does not fit in i64
    pub fn net_change(&self) -> Option<i64> {
        self.balance.checked_sub(self.opening_balance)
    }

    /// Subtract `amount`, returning the new balance
    ///
    /// `None` on overflow, with the balance left unchanged.
    pub fn debit(&mut self, amount: i64) -> Option<i64> {
        self.balance = self.balance.checked_sub(amount)?;
        Some(self.balance)
    }

    /// Add `amount`, returning the new balance
    ///
    /// `None` on overflow, with the balance left unchanged.
    pub fn credit(&mut self, amount: i64) -> Option<i64> {
        self.balance = self.balance.checked_add(amount)?;
        Some(self.balance)
    }
}
