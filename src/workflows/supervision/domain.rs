use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "-{}"), self.0)
            }
        }
    };
}

numeric_id!(
    /// Identifier of an invigilation-eligible staff member.
    TeacherId,
    "teacher"
);
numeric_id!(
    /// Identifier of a scheduled supervision session.
    SessionId,
    "session"
);
numeric_id!(SubjectId, "subject");
numeric_id!(ExamId, "exam");
numeric_id!(
    /// Identifier handed out by the ledger when a wish is recorded.
    WishId,
    "wish"
);
numeric_id!(
    /// Identifier handed out by the ledger when an assignment is confirmed.
    AssignmentId,
    "assignment"
);

/// Academic subject. Upstream data sometimes lacks the identifier, in which case the name is
/// the only usable matching key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: Option<SubjectId>,
    pub name: String,
}

impl Subject {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id: Some(SubjectId(id)),
            name: name.into(),
        }
    }

    /// Subject known only by name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }
}

/// Calendar placement of a session. `end` is optional because legacy rows omit it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: Option<NaiveTime>,
}

impl TimeSlot {
    pub fn new(date: NaiveDate, start: NaiveTime, end: Option<NaiveTime>) -> Self {
        Self { date, start, end }
    }

    /// Minutes since midnight (`hour * 60 + minute`); seconds are ignored.
    pub fn start_minute(&self) -> u32 {
        minute_of_day(self.start)
    }

    pub fn end_minute(&self) -> Option<u32> {
        self.end.map(minute_of_day)
    }
}

fn minute_of_day(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

/// A subject examination held during exactly one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exam {
    pub id: ExamId,
    pub subject: Subject,
}

/// Timetable facts about a session that never change once the directory is loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPlan {
    pub id: SessionId,
    pub slot: TimeSlot,
    pub exams: Vec<Exam>,
}

impl SessionPlan {
    pub fn new(id: SessionId, slot: TimeSlot, exams: Vec<Exam>) -> Self {
        Self { id, slot, exams }
    }

    /// Subjects examined during the session.
    pub fn subjects(&self) -> impl Iterator<Item = &Subject> {
        self.exams.iter().map(|exam| &exam.subject)
    }

    /// Sessions are same-day windows; a present end time must come after the start.
    pub fn validate(&self) -> Result<(), IntegrityError> {
        match self.slot.end {
            Some(end) if end <= self.slot.start => Err(IntegrityError::InvertedWindow {
                session: self.id,
                start: self.slot.start,
                end,
            }),
            _ => Ok(()),
        }
    }
}

/// Session snapshot: the immutable plan plus the two supervision counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub plan: Arc<SessionPlan>,
    pub registered: u32,
    pub required: u32,
}

impl Session {
    pub fn new(plan: SessionPlan, required: u32) -> Self {
        Self {
            plan: Arc::new(plan),
            registered: 0,
            required,
        }
    }

    pub fn id(&self) -> SessionId {
        self.plan.id
    }

    pub fn slot(&self) -> &TimeSlot {
        &self.plan.slot
    }

    pub fn is_saturated(&self) -> bool {
        self.registered >= self.required
    }

    /// `registered` above `required` only happens after a downward revision; it is reported,
    /// never corrected.
    pub fn is_over_capacity(&self) -> bool {
        self.registered > self.required
    }

    pub fn open_slots(&self) -> u32 {
        self.required.saturating_sub(self.registered)
    }
}

/// Staff member snapshot with the assignments the ledger currently holds for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Teacher {
    pub id: TeacherId,
    pub name: String,
    pub subjects: Vec<Subject>,
    /// Maximum number of sessions to supervise; `None` means unbounded.
    pub quota: Option<u32>,
    pub assignments: Vec<Assignment>,
}

impl Teacher {
    pub fn new(
        id: TeacherId,
        name: impl Into<String>,
        subjects: Vec<Subject>,
        quota: Option<u32>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            subjects,
            quota,
            assignments: Vec::new(),
        }
    }

    pub fn load(&self) -> u32 {
        self.assignments.len() as u32
    }

    pub fn quota_reached(&self) -> bool {
        self.quota.is_some_and(|quota| self.load() >= quota)
    }

    pub fn remaining_quota(&self) -> Option<u32> {
        self.quota.map(|quota| quota.saturating_sub(self.load()))
    }

    pub fn assignment_for(&self, session_id: SessionId) -> Option<&Assignment> {
        self.assignments
            .iter()
            .find(|assignment| assignment.session_id == session_id)
    }
}

/// A teacher's advisory request to supervise a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wish {
    pub id: WishId,
    pub teacher_id: TeacherId,
    pub session_id: SessionId,
    pub submitted_at: DateTime<Utc>,
}

/// Confirmed supervision link. Carries a copy of the session slot so schedule checks can run
/// against the teacher snapshot alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: AssignmentId,
    pub teacher_id: TeacherId,
    pub session_id: SessionId,
    pub slot: TimeSlot,
    pub confirmed_at: DateTime<Utc>,
}

/// Returned by a successful cancellation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancellationReceipt {
    pub assignment_id: AssignmentId,
    pub teacher_id: TeacherId,
    pub session_id: SessionId,
    pub registered_after: u32,
    pub wish_removed: bool,
    pub cancelled_at: DateTime<Utc>,
}

/// Position of a (teacher, session) pair in the wish/assignment lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PairState {
    Idle,
    Wished,
    Assigned,
}

impl PairState {
    pub const fn label(self) -> &'static str {
        match self {
            PairState::Idle => "idle",
            PairState::Wished => "wished",
            PairState::Assigned => "assigned",
        }
    }
}

/// Directory data the ledger refuses to take ownership of.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntegrityError {
    #[error("{session} starts at {start} but ends at {end}")]
    InvertedWindow {
        session: SessionId,
        start: NaiveTime,
        end: NaiveTime,
    },
    #[error("{0} appears more than once in the directory")]
    DuplicateSession(SessionId),
    #[error("{0} appears more than once in the directory")]
    DuplicateTeacher(TeacherId),
    #[error("{session} arrived with {registered} registrations; seed them through the ledger")]
    PreloadedRegistrations { session: SessionId, registered: u32 },
    #[error("{0} arrived with assignments; seed them through the ledger")]
    PreloadedAssignments(TeacherId),
}
