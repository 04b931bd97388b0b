//! Composes the conflict predicates with quota and capacity checks into a single verdict.

mod verdict;

pub use verdict::Verdict;

use serde::{Deserialize, Serialize};

use super::conflicts::{
    schedule_fallbacks, schedule_overlap_match, subject_conflict_match, teaching_fallbacks,
    teaching_overlap_match, OverlapMatch, SubjectMatch,
};
use super::domain::{Session, SessionId, SessionPlan, Teacher};

/// Evidence behind a conflict verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Evidence {
    Subject {
        matched: SubjectMatch,
    },
    Teaching {
        session_id: SessionId,
        matched: SubjectMatch,
        overlap: OverlapMatch,
    },
    Schedule {
        session_id: SessionId,
        overlap: OverlapMatch,
    },
}

impl Evidence {
    /// True when the verdict rests on a name heuristic or a start-time-only comparison.
    pub fn is_degraded(&self) -> bool {
        match self {
            Evidence::Subject { matched } => matched.is_degraded(),
            Evidence::Teaching {
                matched, overlap, ..
            } => matched.is_degraded() || overlap.is_degraded(),
            Evidence::Schedule { overlap, .. } => overlap.is_degraded(),
        }
    }
}

/// Time comparison that ran on start times alone and found no collision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DegradedCheck {
    Teaching { session_id: SessionId },
    Schedule { session_id: SessionId },
}

/// Verdict plus the evidence that produced it, for callers that need to explain a rejection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assessment {
    pub verdict: Verdict,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence: Option<Evidence>,
    /// Checks that passed while relying on start-time-only comparisons.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub degraded_checks: Vec<DegradedCheck>,
}

impl Assessment {
    fn new(
        verdict: Verdict,
        evidence: Option<Evidence>,
        degraded_checks: Vec<DegradedCheck>,
    ) -> Self {
        Self {
            verdict,
            evidence,
            degraded_checks,
        }
    }

    /// True when the verdict rests on, or was cleared by, a weaker matching mode.
    pub fn is_degraded(&self) -> bool {
        self.evidence.as_ref().is_some_and(Evidence::is_degraded)
            || !self.degraded_checks.is_empty()
    }
}

/// Evaluate a pairing and keep the evidence. Pure; checks run in verdict priority order.
pub fn assess<'a, I>(teacher: &Teacher, session: &Session, timetable: I) -> Assessment
where
    I: IntoIterator<Item = &'a SessionPlan>,
{
    let plan = session.plan.as_ref();
    let timetable: Vec<&SessionPlan> = timetable.into_iter().collect();
    let mut degraded_checks = Vec::new();

    if teacher.assignment_for(plan.id).is_some() {
        return Assessment::new(Verdict::AlreadyAssigned, None, degraded_checks);
    }

    if let Some(matched) = subject_conflict_match(teacher, plan) {
        return Assessment::new(
            Verdict::SubjectConflict,
            Some(Evidence::Subject { matched }),
            degraded_checks,
        );
    }

    if let Some(clash) = teaching_overlap_match(teacher, plan, timetable.iter().copied()) {
        return Assessment::new(
            Verdict::TeachingOverlap,
            Some(Evidence::Teaching {
                session_id: clash.session_id,
                matched: clash.subject,
                overlap: clash.overlap,
            }),
            degraded_checks,
        );
    }
    degraded_checks.extend(
        teaching_fallbacks(teacher, plan, timetable.iter().copied())
            .into_iter()
            .map(|session_id| DegradedCheck::Teaching { session_id }),
    );

    if teacher.quota_reached() {
        return Assessment::new(Verdict::QuotaExceeded, None, degraded_checks);
    }

    if let Some((session_id, overlap)) = schedule_overlap_match(teacher, plan) {
        return Assessment::new(
            Verdict::ScheduleOverlap,
            Some(Evidence::Schedule {
                session_id,
                overlap,
            }),
            degraded_checks,
        );
    }
    degraded_checks.extend(
        schedule_fallbacks(teacher, plan)
            .into_iter()
            .map(|session_id| DegradedCheck::Schedule { session_id }),
    );

    if session.is_saturated() {
        return Assessment::new(Verdict::SessionFull, None, degraded_checks);
    }

    Assessment::new(Verdict::Eligible, None, degraded_checks)
}

/// Verdict for placing `teacher` in `session`. Safe to call repeatedly for list filtering.
pub fn evaluate<'a, I>(teacher: &Teacher, session: &Session, timetable: I) -> Verdict
where
    I: IntoIterator<Item = &'a SessionPlan>,
{
    assess(teacher, session, timetable).verdict
}
