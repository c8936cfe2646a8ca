//! Tests for the Ledger
//!
//! Critical invariants tested:
//! - Balance at a date = opening + credits - debits up to that date
//! - History keeps emission order
//! - Carry-forward lookups between and before transfer dates
//! - Account policy (auto-create vs strict)

use cashflow_simulator_core::{
    Account, AccountKind, AccountPolicy, Ledger, LedgerError, Transfer, TransferRequest,
};
use chrono::NaiveDate;

// ============================================================================
// Test Helpers
// ============================================================================

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn transfer(id: u64, on: NaiveDate, amount: i64, from: &str, to: &str) -> Transfer {
    Transfer::issue(id, on, "test", TransferRequest::new(amount, from, to)).unwrap()
}

/// A(1000) and B(0), three transfers A -> B over two dates
fn populated_ledger() -> Ledger {
    let mut ledger = Ledger::new(AccountPolicy::AutoCreate);
    ledger.open_account(Account::new("A", 1_000)).unwrap();
    ledger.open_account(Account::new("B", 0)).unwrap();
    ledger.apply(transfer(1, date(2020, 1, 1), 100, "A", "B")).unwrap();
    ledger.apply(transfer(2, date(2020, 1, 1), 50, "A", "B")).unwrap();
    ledger.apply(transfer(3, date(2020, 6, 1), 200, "A", "B")).unwrap();
    ledger
}

// ============================================================================
// Accounts
// ============================================================================

#[test]
fn test_open_account_rejects_duplicates_and_blank_ids() {
    let mut ledger = Ledger::new(AccountPolicy::AutoCreate);
    ledger.open_account(Account::new("A", 0)).unwrap();

    assert_eq!(
        ledger.open_account(Account::new("A", 5)),
        Err(LedgerError::DuplicateAccount("A".to_string()))
    );
    assert_eq!(
        ledger.open_account(Account::new("", 5)),
        Err(LedgerError::EmptyAccountId)
    );
    assert_eq!(ledger.balance("A"), Some(0));
}

#[test]
fn test_account_metadata_is_kept() {
    let mut ledger = Ledger::new(AccountPolicy::AutoCreate);
    ledger
        .open_account(
            Account::new("salary", 0)
                .with_kind(AccountKind::Income)
                .with_description("Monthly salary")
                .with_category("work"),
        )
        .unwrap();

    let account = ledger.account("salary").unwrap();
    assert_eq!(account.kind(), Some(AccountKind::Income));
    assert_eq!(account.description(), Some("Monthly salary"));
    assert_eq!(account.category(), Some("work"));
    assert!(!account.is_auto_created());
}

#[test]
fn test_unknown_accounts_auto_created_at_zero() {
    let mut ledger = Ledger::new(AccountPolicy::AutoCreate);
    let created = ledger
        .apply(transfer(1, date(2020, 1, 1), 75, "employer", "checking"))
        .unwrap();

    assert_eq!(created, vec!["employer".to_string(), "checking".to_string()]);
    assert_eq!(ledger.balance("employer"), Some(-75));
    assert_eq!(ledger.balance("checking"), Some(75));
    assert_eq!(ledger.account("checking").unwrap().opening_balance(), 0);
    assert!(ledger.account("checking").unwrap().is_auto_created());
}

#[test]
fn test_strict_policy_rejects_unknown_source() {
    let mut ledger = Ledger::new(AccountPolicy::Strict);
    ledger.open_account(Account::new("B", 0)).unwrap();

    assert_eq!(
        ledger.apply(transfer(1, date(2020, 1, 1), 10, "A", "B")),
        Err(LedgerError::UnknownAccount("A".to_string()))
    );
    assert_eq!(ledger.balance("B"), Some(0));
    assert!(!ledger.contains("A"));
}

// ============================================================================
// Balances and history
// ============================================================================

#[test]
fn test_zero_amount_transfer_recorded_as_no_op() {
    let mut ledger = populated_ledger();
    let created = ledger
        .apply(transfer(4, date(2020, 9, 1), 0, "A", "B"))
        .unwrap();

    assert!(created.is_empty());
    assert_eq!(ledger.history().len(), 4);
    assert_eq!(ledger.history()[3].id(), 4);
    assert_eq!(ledger.balance("A"), Some(650));
    assert_eq!(ledger.balance("B"), Some(350));

    let rows = ledger.balances_by_date();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[2].date, date(2020, 9, 1));
    assert_eq!(rows[2].balances, rows[1].balances);
}

#[test]
fn test_overflowing_transfer_rejected_atomically() {
    let mut ledger = Ledger::new(AccountPolicy::AutoCreate);
    ledger.open_account(Account::new("A", i64::MIN + 5)).unwrap();

    assert_eq!(
        ledger.apply(transfer(1, date(2020, 1, 1), 10, "A", "B")),
        Err(LedgerError::BalanceOverflow("A".to_string()))
    );
    assert!(!ledger.contains("B"));
    assert_eq!(ledger.balance("A"), Some(i64::MIN + 5));
    assert!(ledger.history().is_empty());

    assert_eq!(
        ledger.total_of(["A", "A"]),
        Err(LedgerError::BalanceOverflow("A".to_string()))
    );
}

#[test]
fn test_current_balances() {
    let ledger = populated_ledger();
    assert_eq!(ledger.balance("A"), Some(650));
    assert_eq!(ledger.balance("B"), Some(350));
    assert_eq!(ledger.balance("C"), None);
    assert_eq!(ledger.total_of(["A", "B"]), Ok(1_000));
    assert_eq!(
        ledger.total_of(["A", "C"]),
        Err(LedgerError::UnknownAccount("C".to_string()))
    );
}

#[test]
fn test_history_keeps_emission_order() {
    let ledger = populated_ledger();
    let ids: Vec<u64> = ledger.history().iter().map(Transfer::id).collect();
    assert_eq!(ids, vec![1, 2, 3]);

    let on_first: Vec<i64> = ledger
        .transfers_on(date(2020, 1, 1))
        .into_iter()
        .map(Transfer::amount)
        .collect();
    assert_eq!(on_first, vec![100, 50]);
}

#[test]
fn test_balances_by_date_one_row_per_active_date() {
    let rows = populated_ledger().balances_by_date();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].date, date(2020, 1, 1));
    assert_eq!(rows[0].balances["A"], 850);
    assert_eq!(rows[0].balances["B"], 150);
    assert_eq!(rows[1].date, date(2020, 6, 1));
    assert_eq!(rows[1].balances["A"], 650);
    assert_eq!(rows[1].balances["B"], 350);
}

#[test]
fn test_balances_by_date_is_idempotent() {
    let ledger = populated_ledger();
    assert_eq!(ledger.balances_by_date(), ledger.balances_by_date());
}

#[test]
fn test_carry_forward_lookups() {
    let ledger = populated_ledger();

    // Before any transfer: opening balances
    assert_eq!(ledger.balance_at("B", date(2019, 12, 31)), Some(0));
    assert_eq!(ledger.balances_at(date(2019, 12, 31))["A"], 1_000);

    // Between transfer dates: last prior row
    assert_eq!(ledger.balance_at("B", date(2020, 3, 15)), Some(150));

    // After the last transfer
    assert_eq!(ledger.balance_at("B", date(2030, 1, 1)), Some(350));
    assert_eq!(ledger.balance_at("missing", date(2030, 1, 1)), None);
}

#[test]
fn test_postings_are_double_entry() {
    let ledger = populated_ledger();
    let postings = ledger.postings();

    assert_eq!(postings.len(), 6);
    for pair in postings.chunks(2) {
        assert_eq!(pair[0].transfer_id, pair[1].transfer_id);
        assert_eq!(pair[0].amount + pair[1].amount, 0);
        assert_eq!(pair[0].account, "A");
        assert_eq!(pair[1].account, "B");
    }
}

#[test]
fn test_negative_amount_never_reaches_ledger() {
    let err = Transfer::issue(1, date(2020, 1, 1), "test", TransferRequest::new(-5, "A", "B"));
    assert!(err.is_err());
}
