//! Effects produced by step transitions

use super::state::{PendingWrite, ReportView};

/// Work the runtime performs after a transition; each one answers with an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Write a record through the ledger, answered by `WriteCompleted`/`WriteFailed`
    Persist(PendingWrite),

    /// Gather the current month's data, answered by `ReportLoaded`/`ReportFailed`
    FetchReport { view: ReportView },
}
