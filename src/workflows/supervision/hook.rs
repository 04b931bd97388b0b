use super::domain::{Session, SessionId};
use super::ledger::{Ledger, LedgerError};

/// Narrow write access for the component that decides how many supervisors a session needs.
pub trait NeedsRecalculationHook: Send + Sync {
    fn revise_required_count(&self, session_id: SessionId, required: u32)
        -> Result<(), LedgerError>;
}

impl NeedsRecalculationHook for Ledger {
    fn revise_required_count(
        &self,
        session_id: SessionId,
        required: u32,
    ) -> Result<(), LedgerError> {
        Ledger::revise_required_count(self, session_id, required)
    }
}

/// Supervisor-need formula supplied by the caller; no formula ships with this crate.
pub trait RequiredCountPolicy {
    fn required_for(&self, session: &Session) -> u32;
}

impl<F> RequiredCountPolicy for F
where
    F: Fn(&Session) -> u32,
{
    fn required_for(&self, session: &Session) -> u32 {
        self(session)
    }
}
