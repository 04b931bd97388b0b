use std::sync::Barrier;
use std::thread;

use invigilation::directory::DirectorySnapshot;
use invigilation::workflows::supervision::{
    DegradedCheck, Evidence, Ledger, LedgerError, OverlapMatch, PairState, SessionId,
    SubjectMatch, TeacherId, Verdict,
};

const DIRECTORY: &str = r#"{
    "teachers": [
        {"id": 1, "name": "Amel Trabelsi", "subjects": [{"id": 1, "name": "Algebra"}], "quota": 3},
        {"id": 2, "name": "Karim Haddad", "subjects": [{"name": "Accounting"}], "quota": 1},
        {"id": 3, "name": "Leila Mansour"},
        {"id": 4, "name": "Sami Gharbi", "subjects": [{"id": 5, "name": "Marketing"}], "quota": 2},
        {"id": 5, "name": "Nour Ben Ali"},
        {"id": 6, "name": "Yassine Jaziri"},
        {"id": 7, "name": "Hela Chaabane"},
        {"id": 8, "name": "Omar Zribi"}
    ],
    "sessions": [
        {"id": 10, "date": "2025-06-02", "start": "08:00", "end": "10:00", "required": 2,
         "exams": [{"id": 1000, "subject": {"id": 1, "name": "Algebra"}}]},
        {"id": 11, "date": "2025-06-02", "start": "10:00", "end": "12:00", "required": 1,
         "exams": [{"id": 1100, "subject": {"id": 3, "name": "Economics"}}]},
        {"id": 12, "date": "2025-06-02", "start": "09:30", "end": "11:00", "required": 2,
         "exams": [{"id": 1200, "subject": {"id": 4, "name": "Accounting"}}]},
        {"id": 14, "date": "2025-06-03", "start": "08:00", "end": "10:00", "required": 3,
         "exams": [{"id": 1400, "subject": {"id": 3, "name": "Economics"}}]},
        {"id": 15, "date": "2025-06-04", "start": "14:00", "end": "16:00", "required": 2,
         "exams": [{"id": 1500, "subject": {"id": 3, "name": "Economics"}}]},
        {"id": 16, "date": "2025-06-05", "start": "08:00", "required": 1},
        {"id": 17, "date": "2025-06-05", "start": "08:00", "end": "09:00", "required": 1},
        {"id": 18, "date": "2025-06-05", "start": "10:00", "end": "12:00", "required": 1}
    ],
    "assignments": [{"teacher": 1, "session": 15}]
}"#;

const AMEL: TeacherId = TeacherId(1);
const KARIM: TeacherId = TeacherId(2);
const LEILA: TeacherId = TeacherId(3);
const SAMI: TeacherId = TeacherId(4);

const ALGEBRA_MORNING: SessionId = SessionId(10);
const ECONOMICS_LATE: SessionId = SessionId(11);
const ACCOUNTING_MIDDAY: SessionId = SessionId(12);
const ECONOMICS_NEXT_DAY: SessionId = SessionId(14);
const ECONOMICS_LATER: SessionId = SessionId(15);
const UNTIMED: SessionId = SessionId(16);
const EARLY_FRIDAY: SessionId = SessionId(17);
const LATE_FRIDAY: SessionId = SessionId(18);

fn load_ledger() -> Ledger {
    DirectorySnapshot::from_reader(DIRECTORY.as_bytes())
        .expect("directory parses")
        .into_ledger(None)
        .expect("directory loads")
}

#[test]
fn wish_then_confirm_then_cancel_round_trip() {
    let ledger = load_ledger();
    assert_eq!(
        ledger
            .session(ECONOMICS_LATER)
            .expect("seeded session")
            .registered,
        1
    );

    ledger
        .submit_wish(SAMI, ECONOMICS_NEXT_DAY)
        .expect("wish accepted");
    assert_eq!(
        ledger
            .pair_state(SAMI, ECONOMICS_NEXT_DAY)
            .expect("pair state"),
        PairState::Wished
    );

    ledger
        .confirm_assignment(SAMI, ECONOMICS_NEXT_DAY)
        .expect("wish converted");
    let view = ledger.session_view(ECONOMICS_NEXT_DAY).expect("view");
    assert_eq!((view.registered, view.required), (1, 3));

    let receipt = ledger
        .cancel_assignment(SAMI, ECONOMICS_NEXT_DAY)
        .expect("cancelled");
    assert_eq!(receipt.registered_after, 0);
    assert_eq!(
        ledger
            .pair_state(SAMI, ECONOMICS_NEXT_DAY)
            .expect("pair state"),
        PairState::Idle
    );
    assert!(ledger.teacher_view(SAMI).expect("view").sessions.is_empty());
}

#[test]
fn name_only_subjects_still_block_and_are_flagged() {
    let ledger = load_ledger();

    let assessment = ledger
        .assess(KARIM, ACCOUNTING_MIDDAY)
        .expect("assessment");
    assert_eq!(assessment.verdict, Verdict::SubjectConflict);
    assert_eq!(
        assessment.evidence,
        Some(Evidence::Subject {
            matched: SubjectMatch::ByName("accounting".to_string()),
        })
    );
    assert!(assessment.is_degraded());

    assert_eq!(
        ledger.evaluate(KARIM, ECONOMICS_LATE).expect("evaluates"),
        Verdict::TeachingOverlap
    );
}

#[test]
fn missing_end_time_falls_back_to_start_time_comparison() {
    let ledger = load_ledger();
    ledger
        .confirm_assignment(LEILA, UNTIMED)
        .expect("untimed session accepts a supervisor");

    let assessment = ledger.assess(LEILA, EARLY_FRIDAY).expect("assessment");
    assert_eq!(assessment.verdict, Verdict::ScheduleOverlap);
    assert_eq!(
        assessment.evidence,
        Some(Evidence::Schedule {
            session_id: UNTIMED,
            overlap: OverlapMatch::StartTimeOnly,
        })
    );
    assert!(assessment.is_degraded());

    let cleared = ledger.assess(LEILA, LATE_FRIDAY).expect("assessment");
    assert_eq!(cleared.verdict, Verdict::Eligible);
    assert_eq!(
        cleared.degraded_checks,
        vec![DegradedCheck::Schedule {
            session_id: UNTIMED,
        }]
    );
    let board = ledger.session_statuses(LEILA).expect("statuses");
    let json = serde_json::to_value(&board).expect("serializes");
    let late = board
        .iter()
        .position(|status| status.session_id == LATE_FRIDAY)
        .expect("session listed");
    assert_eq!(json[late]["degraded_checks"][0]["kind"], "schedule");

    let view = ledger.session_view(UNTIMED).expect("view");
    assert_eq!(view.end, None);
    assert!(view.saturated);
}

#[test]
fn status_board_serializes_verdicts_and_evidence() {
    let ledger = load_ledger();

    let statuses = ledger.session_statuses(AMEL).expect("statuses");
    let json = serde_json::to_value(&statuses).expect("serializes");

    assert_eq!(json[0]["session_id"], 10);
    assert_eq!(json[0]["verdict"], "subject_conflict");
    assert_eq!(json[0]["evidence"]["kind"], "subject");
    let already = statuses
        .iter()
        .find(|status| status.session_id == ECONOMICS_LATER)
        .expect("seeded session listed");
    assert_eq!(already.verdict, Verdict::AlreadyAssigned);
}

#[test]
fn last_slot_goes_to_exactly_one_of_two_racing_confirmations() {
    let ledger = load_ledger();
    assert_eq!(
        ledger.session(ECONOMICS_LATE).expect("session").required,
        1
    );
    let barrier = Barrier::new(2);

    let results: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = [LEILA, SAMI]
            .into_iter()
            .map(|teacher_id| {
                let ledger = &ledger;
                let barrier = &barrier;
                scope.spawn(move || {
                    barrier.wait();
                    ledger.confirm_assignment(teacher_id, ECONOMICS_LATE)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("worker finished"))
            .collect()
    });

    let winners = results.iter().filter(|result| result.is_ok()).count();
    assert_eq!(winners, 1);
    assert!(results
        .iter()
        .any(|result| matches!(result, Err(LedgerError::Ineligible(Verdict::SessionFull)))));
    assert_eq!(
        ledger.session(ECONOMICS_LATE).expect("session").registered,
        1
    );
}

#[test]
fn concurrent_confirmations_never_exceed_required() {
    let ledger = load_ledger();
    let candidates: Vec<TeacherId> = (3..=8).map(TeacherId).collect();
    let barrier = Barrier::new(candidates.len());

    thread::scope(|scope| {
        for &teacher_id in &candidates {
            let ledger = &ledger;
            let barrier = &barrier;
            scope.spawn(move || {
                barrier.wait();
                let _ = ledger.confirm_assignment(teacher_id, ECONOMICS_NEXT_DAY);
            });
        }
    });

    let session = ledger.session(ECONOMICS_NEXT_DAY).expect("session");
    assert_eq!(session.registered, 3);
    assert_eq!(
        ledger
            .assignments(Some(ECONOMICS_NEXT_DAY))
            .expect("assignments")
            .len(),
        3
    );
}

#[test]
fn one_teacher_racing_for_two_sessions_respects_quota() {
    let ledger = load_ledger();
    let barrier = Barrier::new(2);

    let results: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = [ECONOMICS_NEXT_DAY, ECONOMICS_LATER]
            .into_iter()
            .map(|session_id| {
                let ledger = &ledger;
                let barrier = &barrier;
                scope.spawn(move || {
                    barrier.wait();
                    ledger.confirm_assignment(KARIM, session_id)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("worker finished"))
            .collect()
    });

    assert_eq!(results.iter().filter(|result| result.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|result| matches!(result, Err(LedgerError::Ineligible(Verdict::QuotaExceeded)))));
    assert_eq!(ledger.teacher(KARIM).expect("teacher").load(), 1);
}

#[test]
fn downward_revision_is_reported_not_corrected() {
    let ledger = load_ledger();
    ledger
        .confirm_assignment(LEILA, ALGEBRA_MORNING)
        .expect("first supervisor");
    ledger
        .confirm_assignment(SAMI, ALGEBRA_MORNING)
        .expect("second supervisor");

    ledger
        .revise_required_count(ALGEBRA_MORNING, 1)
        .expect("revised");

    let over = ledger.over_capacity_sessions().expect("over capacity");
    assert_eq!(
        over.iter().map(|view| view.id).collect::<Vec<_>>(),
        vec![ALGEBRA_MORNING]
    );
    assert_eq!(
        ledger
            .assignments(Some(ALGEBRA_MORNING))
            .expect("assignments")
            .len(),
        2
    );
}
