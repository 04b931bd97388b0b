use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tracing::{debug, info, warn};

use super::domain::{
    Assignment, AssignmentId, CancellationReceipt, IntegrityError, PairState, Session, SessionId,
    SessionPlan, Teacher, TeacherId, Wish, WishId,
};
use super::eligibility::{assess, Assessment, Verdict};
use super::hook::RequiredCountPolicy;
use super::views::{SessionStatusView, SessionView, TeacherView};

/// Mutable half of a session; the plan lives in the shared timetable.
#[derive(Debug)]
struct SessionCell {
    plan: Arc<SessionPlan>,
    registered: u32,
    required: u32,
    roster: BTreeSet<TeacherId>,
    wishes: BTreeMap<TeacherId, Wish>,
}

impl SessionCell {
    fn snapshot(&self) -> Session {
        Session {
            plan: Arc::clone(&self.plan),
            registered: self.registered,
            required: self.required,
        }
    }
}

/// Owner of wishes, assignments and the `registered` counters.
///
/// Every mutation locks the teacher first and the session second, then re-evaluates inside that
/// critical section. Sessions never lock each other, so unrelated sessions proceed in parallel
/// while quota checks for one teacher stay serialized.
#[derive(Debug)]
pub struct Ledger {
    timetable: Vec<Arc<SessionPlan>>,
    sessions: BTreeMap<SessionId, Mutex<SessionCell>>,
    teachers: BTreeMap<TeacherId, Mutex<Teacher>>,
    wish_sequence: AtomicU64,
    assignment_sequence: AtomicU64,
}

impl Ledger {
    /// Take ownership of a directory snapshot. Sessions must arrive with no registrations and
    /// teachers with no assignments; seed existing placements through
    /// [`Ledger::confirm_assignment`].
    pub fn new<T, S>(teachers: T, sessions: S) -> Result<Self, LedgerError>
    where
        T: IntoIterator<Item = Teacher>,
        S: IntoIterator<Item = Session>,
    {
        let mut timetable = Vec::new();
        let mut session_cells = BTreeMap::new();
        for session in sessions {
            session.plan.validate()?;
            if session.registered != 0 {
                return Err(IntegrityError::PreloadedRegistrations {
                    session: session.id(),
                    registered: session.registered,
                }
                .into());
            }
            if session_cells.contains_key(&session.id()) {
                return Err(IntegrityError::DuplicateSession(session.id()).into());
            }

            timetable.push(Arc::clone(&session.plan));
            session_cells.insert(
                session.id(),
                Mutex::new(SessionCell {
                    plan: session.plan,
                    registered: 0,
                    required: session.required,
                    roster: BTreeSet::new(),
                    wishes: BTreeMap::new(),
                }),
            );
        }
        timetable.sort_by_key(|plan| plan.id);

        let mut teacher_cells = BTreeMap::new();
        for teacher in teachers {
            if !teacher.assignments.is_empty() {
                return Err(IntegrityError::PreloadedAssignments(teacher.id).into());
            }
            if teacher_cells.contains_key(&teacher.id) {
                return Err(IntegrityError::DuplicateTeacher(teacher.id).into());
            }
            teacher_cells.insert(teacher.id, Mutex::new(teacher));
        }

        Ok(Self {
            timetable,
            sessions: session_cells,
            teachers: teacher_cells,
            wish_sequence: AtomicU64::new(1),
            assignment_sequence: AtomicU64::new(1),
        })
    }

    /// Verdict for the pair against current state.
    pub fn evaluate(
        &self,
        teacher_id: TeacherId,
        session_id: SessionId,
    ) -> Result<Verdict, LedgerError> {
        Ok(self.assess(teacher_id, session_id)?.verdict)
    }

    /// Verdict plus the evidence that produced it.
    pub fn assess(
        &self,
        teacher_id: TeacherId,
        session_id: SessionId,
    ) -> Result<Assessment, LedgerError> {
        let teacher = self.lock_teacher(teacher_id)?;
        let cell = self.lock_session(session_id)?;
        Ok(self.assess_locked(&teacher, &cell))
    }

    /// Record an advisory wish. Does not touch `registered`.
    pub fn submit_wish(
        &self,
        teacher_id: TeacherId,
        session_id: SessionId,
    ) -> Result<WishId, LedgerError> {
        let teacher = self.lock_teacher(teacher_id)?;
        let mut cell = self.lock_session(session_id)?;

        if cell.wishes.contains_key(&teacher_id) {
            debug!(%teacher_id, %session_id, "duplicate wish rejected");
            return Err(LedgerError::DuplicateWish);
        }

        let assessment = self.assess_locked(&teacher, &cell);
        if !assessment.verdict.is_eligible() {
            debug!(
                %teacher_id,
                %session_id,
                verdict = assessment.verdict.label(),
                "wish rejected"
            );
            return Err(LedgerError::Ineligible(assessment.verdict));
        }

        let wish = Wish {
            id: WishId(self.wish_sequence.fetch_add(1, Ordering::Relaxed)),
            teacher_id,
            session_id,
            submitted_at: Utc::now(),
        };
        let wish_id = wish.id;
        cell.wishes.insert(teacher_id, wish);

        info!(%teacher_id, %session_id, %wish_id, "wish submitted");
        Ok(wish_id)
    }

    /// Drop an active wish without it ever becoming an assignment.
    pub fn withdraw_wish(
        &self,
        teacher_id: TeacherId,
        session_id: SessionId,
    ) -> Result<Wish, LedgerError> {
        self.ensure_teacher(teacher_id)?;
        let mut cell = self.lock_session(session_id)?;
        let wish = cell.wishes.remove(&teacher_id).ok_or(LedgerError::NoWish)?;

        info!(%teacher_id, %session_id, wish_id = %wish.id, "wish withdrawn");
        Ok(wish)
    }

    /// Place a teacher in a session, either directly or by converting their wish.
    ///
    /// Eligibility is re-checked under the teacher and session locks, so of two confirmations
    /// racing for the last slot exactly one succeeds and the other sees `SessionFull`.
    pub fn confirm_assignment(
        &self,
        teacher_id: TeacherId,
        session_id: SessionId,
    ) -> Result<AssignmentId, LedgerError> {
        let mut teacher = self.lock_teacher(teacher_id)?;
        let mut cell = self.lock_session(session_id)?;

        let assessment = self.assess_locked(&teacher, &cell);
        if !assessment.verdict.is_eligible() {
            debug!(
                %teacher_id,
                %session_id,
                verdict = assessment.verdict.label(),
                "confirmation rejected"
            );
            return Err(LedgerError::Ineligible(assessment.verdict));
        }

        let assignment = Assignment {
            id: AssignmentId(self.assignment_sequence.fetch_add(1, Ordering::Relaxed)),
            teacher_id,
            session_id,
            slot: cell.plan.slot,
            confirmed_at: Utc::now(),
        };
        let assignment_id = assignment.id;

        teacher.assignments.push(assignment);
        cell.registered += 1;
        cell.roster.insert(teacher_id);
        let converted = cell.wishes.remove(&teacher_id).is_some();

        info!(
            %teacher_id,
            %session_id,
            %assignment_id,
            registered = cell.registered,
            required = cell.required,
            converted_wish = converted,
            "assignment confirmed"
        );
        Ok(assignment_id)
    }

    /// Withdraw a teacher from a confirmed slot, releasing its capacity unit.
    pub fn cancel_assignment(
        &self,
        teacher_id: TeacherId,
        session_id: SessionId,
    ) -> Result<CancellationReceipt, LedgerError> {
        let mut teacher = self.lock_teacher(teacher_id)?;
        let mut cell = self.lock_session(session_id)?;

        let position = teacher
            .assignments
            .iter()
            .position(|assignment| assignment.session_id == session_id)
            .ok_or(LedgerError::NotAssigned)?;
        let assignment = teacher.assignments.swap_remove(position);

        cell.registered = cell.registered.saturating_sub(1);
        cell.roster.remove(&teacher_id);
        let wish_removed = cell.wishes.remove(&teacher_id).is_some();

        info!(
            %teacher_id,
            %session_id,
            assignment_id = %assignment.id,
            registered = cell.registered,
            "assignment cancelled"
        );

        Ok(CancellationReceipt {
            assignment_id: assignment.id,
            teacher_id,
            session_id,
            registered_after: cell.registered,
            wish_removed,
            cancelled_at: Utc::now(),
        })
    }

    /// Replace the target supervisor count. Existing assignments are never evicted; a session
    /// left with `registered > required` is reported through [`Ledger::over_capacity_sessions`].
    pub fn revise_required_count(
        &self,
        session_id: SessionId,
        required: u32,
    ) -> Result<(), LedgerError> {
        let mut cell = self.lock_session(session_id)?;
        apply_required(&mut cell, required);
        Ok(())
    }

    /// Ask `policy` for a fresh count and apply it through
    /// [`Ledger::revise_required_count`].
    ///
    /// The policy sees a snapshot taken before it runs and holds no ledger lock, so it may read
    /// the ledger itself. A panicking policy leaves the session untouched.
    pub fn recalculate_required(
        &self,
        session_id: SessionId,
        policy: &dyn RequiredCountPolicy,
    ) -> Result<u32, LedgerError> {
        let snapshot = self.session(session_id)?;
        let required = policy.required_for(&snapshot);
        self.revise_required_count(session_id, required)?;
        Ok(required)
    }

    /// Where the pair sits in the wish/assignment lifecycle.
    pub fn pair_state(
        &self,
        teacher_id: TeacherId,
        session_id: SessionId,
    ) -> Result<PairState, LedgerError> {
        self.ensure_teacher(teacher_id)?;
        let cell = self.lock_session(session_id)?;
        let state = if cell.roster.contains(&teacher_id) {
            PairState::Assigned
        } else if cell.wishes.contains_key(&teacher_id) {
            PairState::Wished
        } else {
            PairState::Idle
        };
        Ok(state)
    }

    /// Teachers whose verdict for the session is `Eligible`, by identifier.
    pub fn eligible_teachers(&self, session_id: SessionId) -> Result<Vec<TeacherId>, LedgerError> {
        let mut eligible = Vec::new();
        for (teacher_id, teacher) in &self.teachers {
            let teacher = lock(teacher)?;
            let cell = self.lock_session(session_id)?;
            if self.assess_locked(&teacher, &cell).verdict.is_eligible() {
                eligible.push(*teacher_id);
            }
        }
        Ok(eligible)
    }

    /// Every session with the verdict it would get for this teacher.
    pub fn session_statuses(
        &self,
        teacher_id: TeacherId,
    ) -> Result<Vec<SessionStatusView>, LedgerError> {
        let teacher = self.lock_teacher(teacher_id)?;
        let mut statuses = Vec::with_capacity(self.sessions.len());
        for (session_id, cell) in &self.sessions {
            let cell = lock(cell)?;
            let assessment = self.assess_locked(&teacher, &cell);
            statuses.push(SessionStatusView::new(*session_id, assessment));
        }
        Ok(statuses)
    }

    /// Active wishes, optionally for a single session, ordered by session then teacher.
    pub fn wishes(&self, session_id: Option<SessionId>) -> Result<Vec<Wish>, LedgerError> {
        let mut wishes = Vec::new();
        for cell in self.selected_sessions(session_id)? {
            wishes.extend(lock(cell)?.wishes.values().cloned());
        }
        Ok(wishes)
    }

    /// Confirmed assignments, optionally for a single session, ordered by session then teacher.
    pub fn assignments(
        &self,
        session_id: Option<SessionId>,
    ) -> Result<Vec<Assignment>, LedgerError> {
        let rosters = self
            .selected_sessions(session_id)?
            .into_iter()
            .map(|cell| lock(cell).map(|cell| (cell.plan.id, cell.roster.clone())))
            .collect::<Result<Vec<_>, _>>()?;

        let mut assignments = Vec::new();
        for (session_id, roster) in rosters {
            for teacher_id in roster {
                let teacher = self.lock_teacher(teacher_id)?;
                if let Some(assignment) = teacher.assignment_for(session_id) {
                    assignments.push(assignment.clone());
                }
            }
        }
        Ok(assignments)
    }

    pub fn teacher(&self, teacher_id: TeacherId) -> Result<Teacher, LedgerError> {
        Ok(self.lock_teacher(teacher_id)?.clone())
    }

    pub fn session(&self, session_id: SessionId) -> Result<Session, LedgerError> {
        Ok(self.lock_session(session_id)?.snapshot())
    }

    pub fn teacher_view(&self, teacher_id: TeacherId) -> Result<TeacherView, LedgerError> {
        Ok(TeacherView::from_teacher(&*self.lock_teacher(teacher_id)?))
    }

    pub fn session_view(&self, session_id: SessionId) -> Result<SessionView, LedgerError> {
        Ok(SessionView::from_session(&self.session(session_id)?))
    }

    /// Views for every session, in identifier order.
    pub fn session_views(&self) -> Result<Vec<SessionView>, LedgerError> {
        self.sessions
            .values()
            .map(|cell| lock(cell).map(|cell| SessionView::from_session(&cell.snapshot())))
            .collect()
    }

    /// Sessions whose `registered` exceeds `required` after a downward revision.
    pub fn over_capacity_sessions(&self) -> Result<Vec<SessionView>, LedgerError> {
        Ok(self
            .session_views()?
            .into_iter()
            .filter(|view| view.over_capacity)
            .collect())
    }

    pub fn teacher_ids(&self) -> Vec<TeacherId> {
        self.teachers.keys().copied().collect()
    }

    pub fn session_ids(&self) -> Vec<SessionId> {
        self.sessions.keys().copied().collect()
    }

    fn assess_locked(&self, teacher: &Teacher, cell: &SessionCell) -> Assessment {
        let assessment = assess(
            teacher,
            &cell.snapshot(),
            self.timetable.iter().map(Arc::as_ref),
        );
        if assessment.is_degraded() {
            warn!(
                teacher_id = %teacher.id,
                session_id = %cell.plan.id,
                verdict = assessment.verdict.label(),
                evidence = ?assessment.evidence,
                degraded_checks = ?assessment.degraded_checks,
                "verdict relies on degraded matching"
            );
        }
        assessment
    }

    fn selected_sessions(
        &self,
        session_id: Option<SessionId>,
    ) -> Result<Vec<&Mutex<SessionCell>>, LedgerError> {
        match session_id {
            Some(session_id) => self
                .sessions
                .get(&session_id)
                .map(|cell| vec![cell])
                .ok_or(LedgerError::UnknownSession(session_id)),
            None => Ok(self.sessions.values().collect()),
        }
    }

    fn ensure_teacher(&self, teacher_id: TeacherId) -> Result<(), LedgerError> {
        if self.teachers.contains_key(&teacher_id) {
            Ok(())
        } else {
            Err(LedgerError::UnknownTeacher(teacher_id))
        }
    }

    fn lock_teacher(&self, teacher_id: TeacherId) -> Result<MutexGuard<'_, Teacher>, LedgerError> {
        self.teachers
            .get(&teacher_id)
            .ok_or(LedgerError::UnknownTeacher(teacher_id))
            .and_then(lock)
    }

    fn lock_session(
        &self,
        session_id: SessionId,
    ) -> Result<MutexGuard<'_, SessionCell>, LedgerError> {
        self.sessions
            .get(&session_id)
            .ok_or(LedgerError::UnknownSession(session_id))
            .and_then(lock)
    }
}

fn apply_required(cell: &mut SessionCell, required: u32) {
    let previous = std::mem::replace(&mut cell.required, required);
    info!(
        session_id = %cell.plan.id,
        previous,
        required,
        registered = cell.registered,
        "required supervisor count revised"
    );
    if cell.registered > required {
        warn!(
            session_id = %cell.plan.id,
            registered = cell.registered,
            required,
            "session is over capacity; existing assignments kept"
        );
    }
}

fn lock<T>(cell: &Mutex<T>) -> Result<MutexGuard<'_, T>, LedgerError> {
    cell.lock()
        .map_err(|err| LedgerError::LockPoisoned(err.to_string()))
}

/// Errors raised by ledger operations. All are recoverable by the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("teacher cannot be placed: {}", .0.summary())]
    Ineligible(Verdict),
    #[error("an active wish already exists for this teacher and session")]
    DuplicateWish,
    #[error("no active wish exists for this teacher and session")]
    NoWish,
    #[error("teacher is not assigned to this session")]
    NotAssigned,
    #[error("unknown {0}")]
    UnknownTeacher(TeacherId),
    #[error("unknown {0}")]
    UnknownSession(SessionId),
    #[error("invalid directory data: {0}")]
    Integrity(#[from] IntegrityError),
    #[error("ledger state lock poisoned: {0}")]
    LockPoisoned(String),
}
