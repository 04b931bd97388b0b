use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;

use super::domain::{Session, SessionId, Subject, Teacher, TeacherId};
use super::eligibility::{Assessment, DegradedCheck, Evidence, Verdict};

/// Serializable projection of a teacher and their current load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeacherView {
    pub id: TeacherId,
    pub name: String,
    pub subjects: Vec<Subject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quota: Option<u32>,
    pub load: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining: Option<u32>,
    pub sessions: Vec<SessionId>,
}

impl TeacherView {
    pub fn from_teacher(teacher: &Teacher) -> Self {
        let mut sessions: Vec<SessionId> = teacher
            .assignments
            .iter()
            .map(|assignment| assignment.session_id)
            .collect();
        sessions.sort();

        Self {
            id: teacher.id,
            name: teacher.name.clone(),
            subjects: teacher.subjects.clone(),
            quota: teacher.quota,
            load: teacher.load(),
            remaining: teacher.remaining_quota(),
            sessions,
        }
    }
}

/// Serializable projection of a session's schedule and capacity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionView {
    pub id: SessionId,
    pub date: NaiveDate,
    pub start: NaiveTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<NaiveTime>,
    pub subjects: Vec<String>,
    pub registered: u32,
    pub required: u32,
    pub saturated: bool,
    pub over_capacity: bool,
}

impl SessionView {
    pub fn from_session(session: &Session) -> Self {
        let slot = session.slot();
        Self {
            id: session.id(),
            date: slot.date,
            start: slot.start,
            end: slot.end,
            subjects: session
                .plan
                .subjects()
                .map(|subject| subject.name.clone())
                .collect(),
            registered: session.registered,
            required: session.required,
            saturated: session.is_saturated(),
            over_capacity: session.is_over_capacity(),
        }
    }
}

/// One row of a teacher's session board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStatusView {
    pub session_id: SessionId,
    pub verdict: Verdict,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence: Option<Evidence>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub degraded_checks: Vec<DegradedCheck>,
}

impl SessionStatusView {
    pub fn new(session_id: SessionId, assessment: Assessment) -> Self {
        Self {
            session_id,
            verdict: assessment.verdict,
            reason: assessment.verdict.summary(),
            evidence: assessment.evidence,
            degraded_checks: assessment.degraded_checks,
        }
    }
}
