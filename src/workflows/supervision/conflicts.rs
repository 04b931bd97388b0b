//! Stateless conflict predicates over teacher and session snapshots.
//!
//! Every predicate is total: missing optional data resolves to "no conflict". Two matching
//! modes are degraded approximations and are reported as such so callers can tell them apart:
//! subject matching by case-insensitive name when an identifier is missing, and start-time
//! equality when an end time is missing.

use serde::{Deserialize, Serialize};

use super::domain::{SessionId, SessionPlan, Subject, SubjectId, Teacher, TimeSlot};

/// How two subjects were found to be the same.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectMatch {
    ById(SubjectId),
    /// Name heuristic, used only when an identifier is absent on either side.
    ByName(String),
}

impl SubjectMatch {
    pub fn is_degraded(&self) -> bool {
        matches!(self, SubjectMatch::ByName(_))
    }
}

/// How two time slots were found to collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapMatch {
    /// Half-open intervals `[start, end)` intersect.
    Interval,
    /// Legacy compatibility: an end time was missing and the start times are equal.
    StartTimeOnly,
}

impl OverlapMatch {
    pub fn is_degraded(self) -> bool {
        matches!(self, OverlapMatch::StartTimeOnly)
    }
}

/// Subject-teaching conflict found against another session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeachingClash {
    pub session_id: SessionId,
    pub subject: SubjectMatch,
    pub overlap: OverlapMatch,
}

/// Compare two subjects, by identifier when both carry one.
pub fn match_subjects(left: &Subject, right: &Subject) -> Option<SubjectMatch> {
    match (left.id, right.id) {
        (Some(left_id), Some(right_id)) => {
            (left_id == right_id).then_some(SubjectMatch::ById(left_id))
        }
        _ => {
            let left_name = left.name.trim();
            let right_name = right.name.trim();
            if left_name.is_empty() || right_name.is_empty() {
                return None;
            }
            let folded = left_name.to_lowercase();
            (folded == right_name.to_lowercase()).then_some(SubjectMatch::ByName(folded))
        }
    }
}

/// First subject shared between the teacher and the exams of `plan`. Identifier matches win
/// over name matches so a heuristic hit never masks an exact one.
pub fn subject_conflict_match(teacher: &Teacher, plan: &SessionPlan) -> Option<SubjectMatch> {
    let mut heuristic = None;
    for taught in &teacher.subjects {
        for examined in plan.subjects() {
            match match_subjects(taught, examined) {
                Some(exact @ SubjectMatch::ById(_)) => return Some(exact),
                Some(by_name) if heuristic.is_none() => heuristic = Some(by_name),
                _ => {}
            }
        }
    }
    heuristic
}

/// Same-date slots collide when `a.start < b.end && b.start < a.end`; touching endpoints do
/// not. Without both end times only equal start times count.
pub fn slots_overlap(left: &TimeSlot, right: &TimeSlot) -> Option<OverlapMatch> {
    if left.date != right.date {
        return None;
    }

    match (left.end_minute(), right.end_minute()) {
        (Some(left_end), Some(right_end)) => (left.start_minute() < right_end
            && right.start_minute() < left_end)
            .then_some(OverlapMatch::Interval),
        _ => (left.start_minute() == right.start_minute())
            .then_some(OverlapMatch::StartTimeOnly),
    }
}

/// True when the teacher teaches a subject examined in the session.
pub fn subject_conflict(teacher: &Teacher, plan: &SessionPlan) -> bool {
    subject_conflict_match(teacher, plan).is_some()
}

/// First existing assignment of the teacher that collides with the candidate slot.
pub fn schedule_overlap_match(
    teacher: &Teacher,
    plan: &SessionPlan,
) -> Option<(SessionId, OverlapMatch)> {
    teacher.assignments.iter().find_map(|assignment| {
        slots_overlap(&assignment.slot, &plan.slot)
            .map(|overlap| (assignment.session_id, overlap))
    })
}

/// True when the teacher already supervises something at an overlapping time.
pub fn schedule_overlap(teacher: &Teacher, plan: &SessionPlan) -> bool {
    schedule_overlap_match(teacher, plan).is_some()
}

/// Scan every other session in `timetable` for an exam the teacher teaches that overlaps the
/// candidate. The candidate itself is skipped by identifier.
pub fn teaching_overlap_match<'a, I>(
    teacher: &Teacher,
    candidate: &SessionPlan,
    timetable: I,
) -> Option<TeachingClash>
where
    I: IntoIterator<Item = &'a SessionPlan>,
{
    if teacher.subjects.is_empty() {
        return None;
    }

    timetable
        .into_iter()
        .filter(|other| other.id != candidate.id)
        .find_map(|other| {
            let overlap = slots_overlap(&other.slot, &candidate.slot)?;
            let subject = subject_conflict_match(teacher, other)?;
            Some(TeachingClash {
                session_id: other.id,
                subject,
                overlap,
            })
        })
}

/// Same-date pair that can only be compared by start time.
fn compared_by_start_only(left: &TimeSlot, right: &TimeSlot) -> bool {
    left.date == right.date && (left.end.is_none() || right.end.is_none())
}

/// Assignments of the teacher that the schedule check can only compare with the candidate by
/// start time.
pub fn schedule_fallbacks(teacher: &Teacher, plan: &SessionPlan) -> Vec<SessionId> {
    teacher
        .assignments
        .iter()
        .filter(|assignment| compared_by_start_only(&assignment.slot, &plan.slot))
        .map(|assignment| assignment.session_id)
        .collect()
}

/// Sessions examining one of the teacher's subjects that the teaching check can only compare
/// with the candidate by start time.
pub fn teaching_fallbacks<'a, I>(
    teacher: &Teacher,
    candidate: &SessionPlan,
    timetable: I,
) -> Vec<SessionId>
where
    I: IntoIterator<Item = &'a SessionPlan>,
{
    if teacher.subjects.is_empty() {
        return Vec::new();
    }

    timetable
        .into_iter()
        .filter(|other| other.id != candidate.id)
        .filter(|other| compared_by_start_only(&other.slot, &candidate.slot))
        .filter(|other| subject_conflict_match(teacher, other).is_some())
        .map(|other| other.id)
        .collect()
}

/// True when the teacher is administering one of their own exams at the candidate's time.
pub fn teaching_overlap<'a, I>(teacher: &Teacher, candidate: &SessionPlan, timetable: I) -> bool
where
    I: IntoIterator<Item = &'a SessionPlan>,
{
    teaching_overlap_match(teacher, candidate, timetable).is_some()
}
