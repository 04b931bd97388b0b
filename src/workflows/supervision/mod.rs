//! Invigilator eligibility evaluation and assignment bookkeeping.
//!
//! [`conflicts`] holds the pure predicates, [`eligibility`] folds them into a single
//! [`Verdict`], and [`Ledger`] owns every wish, assignment and `registered` counter.

pub mod conflicts;
pub mod domain;
pub mod eligibility;
pub mod hook;
pub mod ledger;
pub mod views;

#[cfg(test)]
mod tests;

pub use conflicts::{OverlapMatch, SubjectMatch, TeachingClash};
pub use domain::{
    Assignment, AssignmentId, CancellationReceipt, Exam, ExamId, IntegrityError, PairState,
    Session, SessionId, SessionPlan, Subject, SubjectId, Teacher, TeacherId, TimeSlot, Wish,
    WishId,
};
pub use eligibility::{assess, evaluate, Assessment, DegradedCheck, Evidence, Verdict};
pub use hook::{NeedsRecalculationHook, RequiredCountPolicy};
pub use ledger::{Ledger, LedgerError};
pub use views::{SessionStatusView, SessionView, TeacherView};
