//! Tests for display code generation, assignment and backfill.

use std::sync::{Arc, Mutex};

use chrono::{TimeDelta, TimeZone, Utc};
use mockall::Sequence;
use mockall::predicate::eq;
use rstest::rstest;
use uuid::Uuid;

use super::*;
use crate::domain::ErrorCode;
use crate::domain::ports::{
    DisplayCodeBackfillRepositoryError, DisplayCodeLookupError, FixtureDisplayCodeLookup,
    MockDisplayCodeBackfillRepository, MockDisplayCodeLookup,
};
use crate::test_support::{MutableClock, ScriptedDigits, fixture_instant};

fn generator<L>(lookup: L, suffixes: &[&str]) -> DisplayCodeGenerator<L> {
    DisplayCodeGenerator::new(Arc::new(lookup), Arc::new(MutableClock::new(fixture_instant())))
        .with_digits(Arc::new(ScriptedDigits::new(suffixes.iter().copied())))
}

fn lookup_with_collisions(collisions: usize) -> MockDisplayCodeLookup {
    let mut lookup = MockDisplayCodeLookup::new();
    let mut seq = Sequence::new();
    if collisions > 0 {
        lookup
            .expect_code_exists()
            .times(collisions)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(true));
    }
    lookup
        .expect_code_exists()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Ok(false));
    lookup
}

#[rstest]
#[case(DisplayCodeKind::Order, "260102110405123456")]
#[case(DisplayCodeKind::Refund, "260102110405123456")]
#[case(DisplayCodeKind::User, "260102123456")]
#[tokio::test]
async fn first_free_candidate_is_returned(#[case] kind: DisplayCodeKind, #[case] expected: &str) {
    let service = generator(lookup_with_collisions(0), &["123456"]);

    let code = service.generate(kind).await.expect("code generated");

    assert_eq!(code.as_str(), expected);
    assert_eq!(code.as_str().len(), kind.shape().code_len());
}

#[rstest]
#[case(1)]
#[case(3)]
#[case(4)]
#[tokio::test]
async fn collisions_are_retried_with_fresh_suffixes(#[case] collisions: usize) {
    let suffixes = ["000001", "000002", "000003", "000004", "000005"];
    let service = generator(lookup_with_collisions(collisions), &suffixes);

    let code = service
        .generate(DisplayCodeKind::Order)
        .await
        .expect("code generated before budget runs out");

    assert_eq!(code.as_str(), format!("260102110405{}", suffixes[collisions]));
}

#[tokio::test]
async fn exhaustion_makes_exactly_max_attempts_lookups() {
    let mut lookup = MockDisplayCodeLookup::new();
    lookup
        .expect_code_exists()
        .times(3)
        .returning(|_, _| Ok(true));
    let service = generator(lookup, &[]).with_max_attempts(3);

    let error = service
        .generate(DisplayCodeKind::Refund)
        .await
        .expect_err("every candidate collides");

    assert_eq!(
        error,
        DisplayCodeError::Exhausted {
            kind: DisplayCodeKind::Refund,
            attempts: 3,
        }
    );
    let mapped: crate::domain::Error = error.into();
    assert_eq!(mapped.code(), ErrorCode::ServiceUnavailable);
    assert!(mapped.code().is_retryable());
}

#[tokio::test]
async fn explicit_budget_overrides_configured_one() {
    let mut lookup = MockDisplayCodeLookup::new();
    lookup
        .expect_code_exists()
        .times(1)
        .returning(|_, _| Ok(true));
    let service = generator(lookup, &[]).with_max_attempts(9);

    let error = service
        .generate_with_attempts(DisplayCodeKind::User, 1)
        .await
        .expect_err("single collision exhausts a budget of one");

    assert!(matches!(error, DisplayCodeError::Exhausted { attempts: 1, .. }));
}

#[tokio::test]
async fn zero_budget_is_rejected_without_lookup() {
    let mut lookup = MockDisplayCodeLookup::new();
    lookup.expect_code_exists().never();
    let service = generator(lookup, &[]);

    let error = service
        .generate_with_attempts(DisplayCodeKind::Order, 0)
        .await
        .expect_err("zero attempts");

    assert_eq!(error, DisplayCodeError::InvalidAttempts);
}

#[rstest]
#[case(DisplayCodeLookupError::connection("refused"), ErrorCode::ServiceUnavailable)]
#[case(DisplayCodeLookupError::query("syntax"), ErrorCode::InternalError)]
#[tokio::test]
async fn lookup_failures_propagate_immediately(
    #[case] failure: DisplayCodeLookupError,
    #[case] expected: ErrorCode,
) {
    let mut lookup = MockDisplayCodeLookup::new();
    let returned = failure.clone();
    lookup
        .expect_code_exists()
        .times(1)
        .return_once(move |_, _| Err(returned));
    let service = generator(lookup, &[]);

    let error = service
        .generate(DisplayCodeKind::Order)
        .await
        .expect_err("lookup failure");

    assert_eq!(error, DisplayCodeError::Lookup(failure));
    assert_eq!(crate::domain::Error::from(error).code(), expected);
}

#[tokio::test]
async fn lookup_receives_kind_and_candidate() {
    let mut lookup = MockDisplayCodeLookup::new();
    lookup
        .expect_code_exists()
        .withf(|kind, code| *kind == DisplayCodeKind::User && code.as_str() == "260102654321")
        .times(1)
        .returning(|_, _| Ok(false));
    let service = generator(lookup, &["654321"]);

    service
        .generate(DisplayCodeKind::User)
        .await
        .expect("code generated");
}

#[tokio::test]
async fn retry_rereads_clock_for_each_candidate() {
    // 15:59:59 UTC is 23:59:59 at UTC+8; the retry lands on the next civil day.
    let start = Utc
        .with_ymd_and_hms(2025, 12, 31, 15, 59, 59)
        .single()
        .expect("valid time");
    let clock = MutableClock::ticking(start, TimeDelta::seconds(1));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&seen);
    let mut lookup = MockDisplayCodeLookup::new();
    lookup.expect_code_exists().times(2).returning(move |_, code| {
        let mut codes = recorded.lock().expect("record lock");
        codes.push(code.as_str().to_owned());
        Ok(codes.len() == 1)
    });
    let service = DisplayCodeGenerator::new(Arc::new(lookup), Arc::new(clock))
        .with_digits(Arc::new(ScriptedDigits::new(["111111", "222222"])));

    let code = service
        .generate(DisplayCodeKind::User)
        .await
        .expect("second candidate is free");

    assert_eq!(code.as_str(), "260101222222");
    assert_eq!(
        *seen.lock().expect("record lock"),
        vec!["251231111111".to_owned(), "260101222222".to_owned()]
    );
}

#[tokio::test]
async fn thread_rng_codes_are_all_digits() {
    let service = DisplayCodeGenerator::new(
        Arc::new(FixtureDisplayCodeLookup),
        Arc::new(MutableClock::new(fixture_instant())),
    );

    let code = service
        .generate(DisplayCodeKind::Order)
        .await
        .expect("fixture lookup never collides");

    assert_eq!(code.as_str().len(), 18);
    assert!(code.as_str().bytes().all(|byte| byte.is_ascii_digit()));
    assert_eq!(code.prefix(DisplayCodeKind::Order.shape()), Some("260102110405"));
}

#[rstest]
#[case(DisplayCodeKind::Order, "orders", 12)]
#[case(DisplayCodeKind::Refund, "order_refunds", 12)]
#[case(DisplayCodeKind::User, "users", 6)]
fn kinds_map_to_tables_and_shapes(
    #[case] kind: DisplayCodeKind,
    #[case] table: &str,
    #[case] prefix_len: usize,
) {
    assert_eq!(kind.table(), table);
    assert_eq!(kind.shape().prefix_len(), prefix_len);
}

#[test]
fn parse_code_checks_kind_length() {
    assert!(DisplayCodeKind::User.parse_code("260102123456").is_ok());
    assert!(DisplayCodeKind::Order.parse_code("260102123456").is_err());
}

fn assigner(always_collide: bool, suffixes: &[&str]) -> DisplayCodeAssigner<MockDisplayCodeLookup> {
    let mut lookup = MockDisplayCodeLookup::new();
    lookup
        .expect_code_exists()
        .returning(move |_, _| Ok(always_collide));
    DisplayCodeAssigner::new(generator(lookup, suffixes))
}

#[tokio::test]
async fn assigner_retries_whole_cycle_on_duplicate() {
    let service = assigner(false, &["000001", "000002", "000003"]);
    let attempts = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&attempts);

    let stored = service
        .assign(DisplayCodeKind::Order, move |code| {
            let recorded = Arc::clone(&recorded);
            async move {
                let mut seen = recorded.lock().expect("attempt lock");
                seen.push(code.as_str().to_owned());
                if seen.len() < 3 {
                    Err(InsertFailure::<String>::DuplicateCode)
                } else {
                    Ok(code)
                }
            }
        })
        .await
        .expect("third insert wins");

    assert_eq!(stored.as_str(), "260102110405000003");
    assert_eq!(attempts.lock().expect("attempt lock").len(), 3);
}

#[tokio::test]
async fn assigner_stops_after_insert_budget() {
    let service = assigner(false, &[]).with_insert_attempts(2);
    let calls = Arc::new(Mutex::new(0_u32));
    let counter = Arc::clone(&calls);

    let error = service
        .assign(DisplayCodeKind::User, move |_code| {
            let counter = Arc::clone(&counter);
            async move {
                *counter.lock().expect("counter lock") += 1;
                Err::<(), _>(InsertFailure::<String>::DuplicateCode)
            }
        })
        .await
        .expect_err("every insert collides");

    assert_eq!(
        error,
        AssignError::DuplicateExhausted {
            kind: DisplayCodeKind::User,
            attempts: 2,
        }
    );
    assert_eq!(*calls.lock().expect("counter lock"), 2);
    assert_eq!(
        error.into_error(crate::domain::Error::internal).code(),
        ErrorCode::Conflict
    );
}

#[tokio::test]
async fn assigner_does_not_retry_other_failures() {
    let service = assigner(false, &[]);

    let error = service
        .assign(DisplayCodeKind::Order, |_code| async {
            Err::<(), _>(InsertFailure::Other("disk full".to_owned()))
        })
        .await
        .expect_err("insert failure");

    assert_eq!(error, AssignError::Insert("disk full".to_owned()));
}

#[tokio::test]
async fn assigner_surfaces_generator_exhaustion() {
    let service = assigner(true, &[]);

    let error = service
        .assign(DisplayCodeKind::Order, |_code| async { Ok::<(), InsertFailure<String>>(()) })
        .await
        .expect_err("generator exhausted");

    assert!(matches!(
        error,
        AssignError::Generate(DisplayCodeError::Exhausted { attempts: 5, .. })
    ));
}

#[tokio::test]
async fn assigner_rejects_zero_insert_budget() {
    let service = assigner(false, &[]).with_insert_attempts(0);

    let error = service
        .assign(DisplayCodeKind::Order, |_code| async { Ok::<(), InsertFailure<String>>(()) })
        .await
        .expect_err("zero budget");

    assert_eq!(error, AssignError::Generate(DisplayCodeError::InvalidAttempts));
}

fn backfill_service(
    repo: MockDisplayCodeBackfillRepository,
) -> DisplayCodeBackfillService<MockDisplayCodeBackfillRepository, FixtureDisplayCodeLookup> {
    let generator = DisplayCodeGenerator::new(
        Arc::new(FixtureDisplayCodeLookup),
        Arc::new(MutableClock::new(fixture_instant())),
    );
    DisplayCodeBackfillService::new(Arc::new(repo), DisplayCodeAssigner::new(generator))
        .with_page_size(2)
}

#[tokio::test]
async fn backfill_pages_until_nothing_is_missing() {
    let first_page = vec![Uuid::new_v4(), Uuid::new_v4()];
    let second_page = vec![Uuid::new_v4()];
    let mut repo = MockDisplayCodeBackfillRepository::new();
    let mut seq = Sequence::new();
    repo.expect_list_missing()
        .with(eq(DisplayCodeKind::Order), eq(2))
        .times(1)
        .in_sequence(&mut seq)
        .return_once(move |_, _| Ok(first_page));
    repo.expect_list_missing()
        .times(1)
        .in_sequence(&mut seq)
        .return_once(move |_, _| Ok(second_page));
    repo.expect_list_missing()
        .times(1)
        .in_sequence(&mut seq)
        .return_once(|_, _| Ok(Vec::new()));
    let mut assigned = 0;
    repo.expect_assign().times(3).returning(move |_, _, _| {
        assigned += 1;
        Ok(assigned != 2)
    });

    let report = backfill_service(repo)
        .run(&[DisplayCodeKind::Order])
        .await
        .expect("backfill succeeds");

    assert_eq!(
        report.for_kind(DisplayCodeKind::Order),
        Some(&KindBackfill {
            kind: DisplayCodeKind::Order,
            assigned: 2,
            skipped: 1,
        })
    );
    assert_eq!(report.total_assigned(), 2);
}

#[tokio::test]
async fn backfill_retries_duplicate_codes() {
    let record = Uuid::new_v4();
    let mut repo = MockDisplayCodeBackfillRepository::new();
    let mut listed = false;
    repo.expect_list_missing().returning(move |_, _| {
        if listed {
            Ok(Vec::new())
        } else {
            listed = true;
            Ok(vec![record])
        }
    });
    let mut seq = Sequence::new();
    repo.expect_assign()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _, code| Err(DisplayCodeBackfillRepositoryError::duplicate_code(code.as_str())));
    repo.expect_assign()
        .withf(move |kind, id, _| *kind == DisplayCodeKind::User && *id == record)
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _, _| Ok(true));

    let counters = backfill_service(repo)
        .backfill_kind(DisplayCodeKind::User)
        .await
        .expect("backfill succeeds");

    assert_eq!(counters.assigned, 1);
}

#[tokio::test]
async fn backfill_stops_on_repository_failure() {
    let mut repo = MockDisplayCodeBackfillRepository::new();
    repo.expect_list_missing()
        .times(1)
        .returning(|_, _| Err(DisplayCodeBackfillRepositoryError::connection("down")));
    repo.expect_assign().never();

    let error = backfill_service(repo)
        .run(&DisplayCodeKind::ALL)
        .await
        .expect_err("listing fails");

    assert_eq!(error.code(), ErrorCode::ServiceUnavailable);
}
