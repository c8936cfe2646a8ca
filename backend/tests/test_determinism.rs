//! Property Tests - Determinism and Ledger Invariants
//!
//! Random sets of scripted processes are run through the scheduler.
//!
//! Critical invariants tested:
//! - Balance at any date = opening + credits - debits up to that date
//! - Identical inputs produce identical histories and digests
//! - Scheduling steps and transfer dates never go backward
//! - Querying balances twice gives the same answer

use cashflow_simulator_core::actor::{Script, ScriptOp};
use cashflow_simulator_core::orchestrator::{
    AccountConfig, Simulation, SimulationConfig, SimulationResult,
};
use cashflow_simulator_core::{CalendarDuration, Ledger, TransferRequest};
use chrono::{Days, NaiveDate};
use proptest::prelude::*;

const ACCOUNTS: [&str; 4] = ["cash", "savings", "loan", "expenses"];

// ============================================================================
// Test Helpers
// ============================================================================

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
}

fn end() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()
}

fn op_strategy() -> impl Strategy<Value = ScriptOp> {
    prop_oneof![
        3 => (0i64..10_000, 0usize..ACCOUNTS.len(), 0usize..ACCOUNTS.len()).prop_map(
            |(amount, source, destination)| {
                ScriptOp::Emit(TransferRequest::new(
                    amount,
                    ACCOUNTS[source],
                    ACCOUNTS[destination],
                ))
            }
        ),
        1 => (0i32..400).prop_map(|days| ScriptOp::WaitFor(CalendarDuration::days(days))),
        1 => (0i32..24).prop_map(|months| ScriptOp::WaitFor(CalendarDuration::months(months))),
        1 => Just(ScriptOp::WaitUntilYearEnd),
    ]
}

fn processes_strategy() -> impl Strategy<Value = Vec<Vec<ScriptOp>>> {
    prop::collection::vec(prop::collection::vec(op_strategy(), 0..12), 1..5)
}

fn run(processes: &[Vec<ScriptOp>]) -> SimulationResult {
    let mut config = SimulationConfig::new(start()).with_end_date(end());
    for (i, id) in ACCOUNTS.iter().enumerate() {
        config = config.with_account(AccountConfig::new(*id, 1_000 * i as i64));
    }

    let mut simulation = Simulation::new(config).unwrap();
    for (i, ops) in processes.iter().enumerate() {
        simulation.add_actor(Script::from_ops(format!("p{}", i), ops.clone()));
    }
    simulation.run().unwrap()
}

/// Balance recomputed from scratch: opening + credits - debits up to `date`
fn replayed_balance(ledger: &Ledger, account: &str, date: NaiveDate) -> i64 {
    let opening = ledger.account(account).map_or(0, |a| a.opening_balance());
    ledger
        .history()
        .iter()
        .filter(|t| t.occurs_on() <= date)
        .fold(opening, |balance, t| {
            let mut balance = balance;
            if t.destination() == account {
                balance += t.amount();
            }
            if t.source() == account {
                balance -= t.amount();
            }
            balance
        })
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_balances_match_replay(processes in processes_strategy(), offset in 0u64..1_200) {
        let result = run(&processes);
        let ledger = result.ledger();

        for row in result.balances_by_date() {
            for (account, balance) in &row.balances {
                prop_assert_eq!(*balance, replayed_balance(ledger, account, row.date));
            }
        }

        let query = start() + Days::new(offset);
        for account in ACCOUNTS {
            prop_assert_eq!(
                ledger.balance_at(account, query),
                Some(replayed_balance(ledger, account, query))
            );
        }

        let opening: i64 = ledger.accounts().map(|a| a.opening_balance()).sum();
        let closing: i64 = ledger.accounts().map(|a| a.balance()).sum();
        prop_assert_eq!(opening, closing);
    }

    #[test]
    fn prop_identical_inputs_identical_runs(processes in processes_strategy()) {
        let first = run(&processes);
        let second = run(&processes);

        prop_assert_eq!(first.ledger().history(), second.ledger().history());
        prop_assert_eq!(first.steps(), second.steps());
        prop_assert_eq!(first.processes(), second.processes());
        prop_assert_eq!(
            first.report().unwrap().history_digest,
            second.report().unwrap().history_digest
        );
    }

    #[test]
    fn prop_time_never_moves_backward(processes in processes_strategy()) {
        let result = run(&processes);

        prop_assert!(result.steps().windows(2).all(|w| w[0] <= w[1]));
        prop_assert!(result.event_log().clock_advances().windows(2).all(|w| w[0] < w[1]));

        let dates: Vec<NaiveDate> = result
            .ledger()
            .history()
            .iter()
            .map(|t| t.occurs_on())
            .collect();
        prop_assert!(dates.windows(2).all(|w| w[0] <= w[1]));
        prop_assert!(dates.iter().all(|d| *d >= start() && *d <= end()));
        prop_assert!(result.final_date() <= end());
    }

    #[test]
    fn prop_balances_by_date_idempotent(processes in processes_strategy()) {
        let result = run(&processes);
        prop_assert_eq!(result.balances_by_date(), result.balances_by_date());

        let rows = result.balances_by_date();
        prop_assert!(rows.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn prop_finite_scripts_never_error(processes in processes_strategy()) {
        let result = run(&processes);
        prop_assert!(!result.has_errors());
        for outcome in result.processes() {
            prop_assert!(outcome.is_finished() || outcome.is_suspended());
        }
    }
}
