use chrono::{NaiveDate, NaiveTime, Utc};

use crate::workflows::supervision::domain::{
    Assignment, AssignmentId, Exam, ExamId, Session, SessionId, SessionPlan, Subject, Teacher,
    TeacherId, TimeSlot,
};
use crate::workflows::supervision::Ledger;

pub(super) const ALGEBRA: u64 = 1;
pub(super) const STATISTICS: u64 = 2;
pub(super) const ECONOMICS: u64 = 3;
pub(super) const ACCOUNTING: u64 = 4;
pub(super) const MARKETING: u64 = 5;

pub(super) const AMEL: TeacherId = TeacherId(1);
pub(super) const KARIM: TeacherId = TeacherId(2);
pub(super) const LEILA: TeacherId = TeacherId(3);
pub(super) const SAMI: TeacherId = TeacherId(4);

/// Algebra, 2 June 08:00-10:00, two supervisors.
pub(super) const MORNING_ALGEBRA: SessionId = SessionId(10);
/// Economics, 2 June 10:00-12:00, one supervisor.
pub(super) const LATE_ECONOMICS: SessionId = SessionId(11);
/// Accounting, 2 June 09:30-11:00, two supervisors.
pub(super) const MIDDAY_ACCOUNTING: SessionId = SessionId(12);
/// Statistics, 2 June 08:00-10:00, one supervisor.
pub(super) const MORNING_STATISTICS: SessionId = SessionId(13);
/// Economics, 3 June 08:00-10:00, three supervisors.
pub(super) const NEXT_DAY_ECONOMICS: SessionId = SessionId(14);
/// Economics, 4 June 14:00-16:00, two supervisors.
pub(super) const LATER_ECONOMICS: SessionId = SessionId(15);

pub(super) fn subject(id: u64) -> Subject {
    let name = match id {
        ALGEBRA => "Algebra",
        STATISTICS => "Statistics",
        ECONOMICS => "Economics",
        ACCOUNTING => "Accounting",
        MARKETING => "Marketing",
        _ => "Unlisted",
    };
    Subject::new(id, name)
}

pub(super) fn at(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).expect("valid time")
}

pub(super) fn june(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, day).expect("valid date")
}

pub(super) fn slot(day: u32, start: (u32, u32), end: Option<(u32, u32)>) -> TimeSlot {
    TimeSlot::new(
        june(day),
        at(start.0, start.1),
        end.map(|(hour, minute)| at(hour, minute)),
    )
}

pub(super) fn plan(id: SessionId, slot: TimeSlot, subjects: Vec<Subject>) -> SessionPlan {
    let exams = subjects
        .into_iter()
        .enumerate()
        .map(|(index, subject)| Exam {
            id: ExamId(id.0 * 100 + index as u64),
            subject,
        })
        .collect();
    SessionPlan::new(id, slot, exams)
}

pub(super) fn session(
    id: SessionId,
    slot: TimeSlot,
    subjects: Vec<Subject>,
    required: u32,
) -> Session {
    Session::new(plan(id, slot, subjects), required)
}

pub(super) fn teacher(id: TeacherId, subjects: Vec<Subject>, quota: Option<u32>) -> Teacher {
    Teacher::new(id, format!("Teacher {}", id.0), subjects, quota)
}

/// Attach an assignment directly to a teacher snapshot, bypassing the ledger.
pub(super) fn assigned(mut teacher: Teacher, session_id: SessionId, slot: TimeSlot) -> Teacher {
    let next = teacher.assignments.len() as u64 + 1;
    teacher.assignments.push(Assignment {
        id: AssignmentId(next),
        teacher_id: teacher.id,
        session_id,
        slot,
        confirmed_at: Utc::now(),
    });
    teacher
}

pub(super) fn timetable() -> Vec<Session> {
    vec![
        session(
            MORNING_ALGEBRA,
            slot(2, (8, 0), Some((10, 0))),
            vec![subject(ALGEBRA)],
            2,
        ),
        session(
            LATE_ECONOMICS,
            slot(2, (10, 0), Some((12, 0))),
            vec![subject(ECONOMICS)],
            1,
        ),
        session(
            MIDDAY_ACCOUNTING,
            slot(2, (9, 30), Some((11, 0))),
            vec![subject(ACCOUNTING)],
            2,
        ),
        session(
            MORNING_STATISTICS,
            slot(2, (8, 0), Some((10, 0))),
            vec![subject(STATISTICS)],
            1,
        ),
        session(
            NEXT_DAY_ECONOMICS,
            slot(3, (8, 0), Some((10, 0))),
            vec![subject(ECONOMICS)],
            3,
        ),
        session(
            LATER_ECONOMICS,
            slot(4, (14, 0), Some((16, 0))),
            vec![subject(ECONOMICS)],
            2,
        ),
    ]
}

pub(super) fn staff() -> Vec<Teacher> {
    vec![
        teacher(AMEL, vec![subject(ALGEBRA)], Some(3)),
        teacher(KARIM, vec![subject(ACCOUNTING)], Some(1)),
        teacher(LEILA, Vec::new(), None),
        teacher(SAMI, vec![subject(MARKETING)], Some(2)),
    ]
}

pub(super) fn build_ledger() -> Ledger {
    Ledger::new(staff(), timetable()).expect("fixture directory is valid")
}

pub(super) fn registered(ledger: &Ledger, session_id: SessionId) -> u32 {
    ledger
        .session(session_id)
        .expect("session present")
        .registered
}
