//! Error Isolation Tests
//!
//! A failing process is marked errored and removed from scheduling. The run
//! itself continues, and everything already in the ledger stays there.

use cashflow_simulator_core::actor::{ActorError, FnActor, Script};
use cashflow_simulator_core::orchestrator::{
    AccountConfig, EndReason, ProcessState, Simulation, SimulationConfig,
};
use cashflow_simulator_core::{AccountPolicy, CalendarDuration, LedgerError, TransferError};
use chrono::NaiveDate;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn config() -> SimulationConfig {
    SimulationConfig::new(date(2020, 1, 1)).with_end_date(date(2021, 1, 1))
}

fn steady() -> Script {
    Script::new("steady")
        .emit(200, "A", "C", "")
        .wait_for(CalendarDuration::months(2))
        .emit(50, "A", "C", "")
}

fn errored_on(state: &ProcessState) -> Option<(NaiveDate, &ActorError)> {
    match state {
        ProcessState::Errored { on, error } => Some((*on, error)),
        _ => None,
    }
}

// ============================================================================
// Scenario C - negative amount
// ============================================================================

#[test]
fn test_negative_amount_marks_process_errored() {
    let faulty = Script::new("faulty")
        .emit(100, "A", "B", "")
        .wait_for(CalendarDuration::months(1))
        .emit(-5, "A", "B", "refund")
        .emit(100, "A", "B", "unreachable");

    let result = Simulation::new(config())
        .unwrap()
        .with_actor(faulty)
        .with_actor(steady())
        .run()
        .unwrap();

    let outcome = result.process("faulty").unwrap();
    assert_eq!(
        errored_on(&outcome.state),
        Some((
            date(2020, 2, 1),
            &ActorError::Transfer(TransferError::NegativeAmount { amount: -5 })
        ))
    );

    // Earlier transfer of the failing process is kept, later ones never happen
    assert_eq!(result.ledger().balance("B"), Some(100));
    assert_eq!(result.ledger().balance("C"), Some(250));
    assert!(result.process("steady").unwrap().is_finished());
    assert!(result.has_errors());
    assert_eq!(result.errored().len(), 1);
}

#[test]
fn test_failure_does_not_change_other_processes_history() {
    let alone = Simulation::new(config())
        .unwrap()
        .with_actor(steady())
        .run()
        .unwrap();

    let with_failure = Simulation::new(config())
        .unwrap()
        .with_actor(FnActor::new("crash", |_| Err(ActorError::failed("boom"))))
        .with_actor(steady())
        .run()
        .unwrap();

    let project = |result: &cashflow_simulator_core::SimulationResult| {
        result
            .ledger()
            .history()
            .iter()
            .map(|t| (t.id(), t.occurs_on(), t.amount(), t.destination().to_string()))
            .collect::<Vec<_>>()
    };
    // A rejected transfer never consumes an id
    assert_eq!(project(&alone), project(&with_failure));
    assert_eq!(
        with_failure.process("crash").unwrap().error(),
        Some(&ActorError::Failed("boom".to_string()))
    );
}

#[test]
fn test_failed_transfer_id_is_reused() {
    let result = Simulation::new(config())
        .unwrap()
        .with_actor(Script::new("bad").emit(-1, "A", "B", ""))
        .with_actor(Script::new("good").emit(1, "A", "B", ""))
        .run()
        .unwrap();

    assert_eq!(result.ledger().history()[0].id(), 1);
    assert_eq!(result.ledger().history()[0].actor(), "good");
}

// ============================================================================
// Ledger policy
// ============================================================================

#[test]
fn test_strict_policy_unknown_account() {
    let config = config()
        .with_account_policy(AccountPolicy::Strict)
        .with_account(AccountConfig::new("A", 1_000))
        .with_account(AccountConfig::new("C", 0));

    let typo = Script::new("typo").emit(10, "A", "X", "");
    let result = Simulation::new(config)
        .unwrap()
        .with_actor(typo)
        .with_actor(steady())
        .run()
        .unwrap();

    assert_eq!(
        result.process("typo").unwrap().error(),
        Some(&ActorError::Ledger(LedgerError::UnknownAccount(
            "X".to_string()
        )))
    );
    assert_eq!(result.ledger().balance("A"), Some(750));
    assert!(!result.ledger().contains("X"));
}

#[test]
fn test_balance_overflow_marks_process_errored() {
    let half = i64::MAX / 2 + 1;
    let big = Script::new("big")
        .emit(half, "A", "B", "")
        .emit(half, "A", "B", "")
        .emit(1, "A", "B", "unreachable");

    let result = Simulation::new(config())
        .unwrap()
        .with_actor(big)
        .with_actor(steady())
        .run()
        .unwrap();

    assert_eq!(
        errored_on(&result.process("big").unwrap().state),
        Some((
            date(2020, 1, 1),
            &ActorError::Ledger(LedgerError::BalanceOverflow("B".to_string()))
        ))
    );
    // The rejected transfer leaves both sides untouched
    assert_eq!(result.ledger().balance("B"), Some(half));
    assert_eq!(result.ledger().balance("A"), Some(-half - 250));
    assert_eq!(result.ledger().balance("C"), Some(250));
    assert!(result.process("steady").unwrap().is_finished());
    assert_eq!(result.ledger().history().len(), 3);
    assert!(result.report().is_ok());
}

// ============================================================================
// Wait validation
// ============================================================================

#[test]
fn test_wait_into_the_past() {
    let result = Simulation::new(config())
        .unwrap()
        .with_actor(Script::new("late").wait_until(date(2019, 1, 1)))
        .run()
        .unwrap();

    assert_eq!(
        result.process("late").unwrap().error(),
        Some(&ActorError::WaitInPast {
            requested: date(2019, 1, 1),
            now: date(2020, 1, 1),
        })
    );
    assert_eq!(result.final_date(), date(2020, 1, 1));
}

#[test]
fn test_negative_duration_wait_is_in_the_past() {
    let result = Simulation::new(config())
        .unwrap()
        .with_actor(Script::new("back").wait_for(-CalendarDuration::days(1)))
        .run()
        .unwrap();

    assert!(matches!(
        result.process("back").unwrap().error(),
        Some(ActorError::WaitInPast { .. })
    ));
}

#[test]
fn test_impossible_day_of_month() {
    let start = date(2021, 4, 10);
    let config = SimulationConfig::new(start).with_end_date(date(2022, 1, 1));
    let result = Simulation::new(config)
        .unwrap()
        .with_actor(Script::new("rent").wait_until_day(31))
        .run()
        .unwrap();

    assert!(matches!(
        result.process("rent").unwrap().error(),
        Some(ActorError::InvalidDate(_))
    ));
}

// ============================================================================
// Runaway guard
// ============================================================================

#[test]
fn test_endless_same_instant_emits_are_stopped() {
    let config = config().with_max_steps_per_instant(50);
    let result = Simulation::new(config)
        .unwrap()
        .with_actor(Script::new("spin").emit(1, "A", "B", "").repeating())
        .with_actor(steady())
        .run()
        .unwrap();

    assert_eq!(
        result.process("spin").unwrap().error(),
        Some(&ActorError::RunawayProcess {
            steps: 50,
            date: date(2020, 1, 1)
        })
    );
    assert_eq!(result.ledger().balance("B"), Some(50));
    assert!(result.process("steady").unwrap().is_finished());
}

#[test]
fn test_endless_zero_length_waits_are_stopped() {
    let config = config().with_max_steps_per_instant(50);
    let result = Simulation::new(config)
        .unwrap()
        .with_actor(Script::new("idle").wait_for(CalendarDuration::ZERO).repeating())
        .run()
        .unwrap();

    assert!(matches!(
        result.process("idle").unwrap().error(),
        Some(ActorError::RunawayProcess { steps: 50, .. })
    ));
    assert_eq!(result.steps().len(), 50);
    assert!(result.steps().iter().all(|d| *d == date(2020, 1, 1)));
    assert!(result.event_log().clock_advances().is_empty());
    assert_eq!(result.end_reason(), EndReason::AllFinished);
}

#[test]
fn test_guard_resets_on_new_date() {
    // 31 resumptions per date against a limit of 40, on 13 dates
    let mut monthly = Script::new("monthly");
    for _ in 0..30 {
        monthly = monthly.emit(1, "A", "B", "");
    }
    let monthly = monthly.wait_for(CalendarDuration::months(1)).repeating();

    let result = Simulation::new(config().with_max_steps_per_instant(40))
        .unwrap()
        .with_actor(monthly)
        .run()
        .unwrap();

    assert!(!result.has_errors());
    assert!(result.process("monthly").unwrap().is_suspended());
    assert_eq!(result.ledger().balance("B"), Some(390));
}
