//! Events that can occur in a session

use crate::report::MonthlyReport;

/// Events that trigger step transitions
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    UserMessage { text: String },

    // Ledger events
    WriteCompleted,
    WriteFailed { message: String },
    ReportLoaded { report: MonthlyReport },
    ReportFailed { message: String },
}

impl Event {
    pub fn user_message(text: impl Into<String>) -> Self {
        Event::UserMessage { text: text.into() }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Event::UserMessage { .. } => "user_message",
            Event::WriteCompleted => "write_completed",
            Event::WriteFailed { .. } => "write_failed",
            Event::ReportLoaded { .. } => "report_loaded",
            Event::ReportFailed { .. } => "report_failed",
        }
    }
}
