use serde::{Deserialize, Serialize};

/// Outcome of evaluating one (teacher, session) pairing. Variants are declared in the order the
/// evaluator checks them; the first failing check decides the verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    AlreadyAssigned,
    SubjectConflict,
    TeachingOverlap,
    QuotaExceeded,
    ScheduleOverlap,
    SessionFull,
    Eligible,
}

impl Verdict {
    pub const fn is_eligible(self) -> bool {
        matches!(self, Verdict::Eligible)
    }

    pub const fn label(self) -> &'static str {
        match self {
            Verdict::AlreadyAssigned => "already_assigned",
            Verdict::SubjectConflict => "subject_conflict",
            Verdict::TeachingOverlap => "teaching_overlap",
            Verdict::QuotaExceeded => "quota_exceeded",
            Verdict::ScheduleOverlap => "schedule_overlap",
            Verdict::SessionFull => "session_full",
            Verdict::Eligible => "eligible",
        }
    }

    /// Human readable reason suitable for a rejection message.
    pub fn summary(self) -> String {
        match self {
            Verdict::AlreadyAssigned => "teacher already supervises this session".to_string(),
            Verdict::SubjectConflict => {
                "teacher teaches a subject examined in this session".to_string()
            }
            Verdict::TeachingOverlap => {
                "teacher is examining one of their own subjects at the same time".to_string()
            }
            Verdict::QuotaExceeded => "teacher has reached their supervision quota".to_string(),
            Verdict::ScheduleOverlap => {
                "teacher already supervises an overlapping session".to_string()
            }
            Verdict::SessionFull => "session has no open supervision slot".to_string(),
            Verdict::Eligible => "teacher can supervise this session".to_string(),
        }
    }
}
