//! Session state types

use crate::ledger::{Category, SharingType};
use crate::money::AmountPolicy;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

// ============================================================================
// Pending writes and report views
// ============================================================================

/// A record the conversation has fully collected and wants persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PendingWrite {
    Income {
        amount: u64,
        label: String,
    },
    Expense {
        amount: u64,
        description: String,
        sharing: SharingType,
        percentage: u8,
        category: Option<Category>,
    },
    Partner {
        name: String,
        phone: String,
    },
}

/// Which report a read-only menu option asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportView {
    /// Per-record listing of the month
    Expenses,
    /// Totals, shares and balance
    Summary,
}

// ============================================================================
// Session Step
// ============================================================================

/// Where a session is in the conversation
///
/// Scratch values collected along a flow live in the variant that needs them,
/// so leaving a step discards them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Step {
    /// Idle, waiting for a menu option
    #[default]
    Menu,

    WaitingSalary,

    WaitingSharedExpenseAmount,

    WaitingSharedExpenseDescription { amount: u64 },

    WaitingIndividualExpenseAmount,

    WaitingIndividualExpenseDescription { amount: u64 },

    WaitingPartnerName,

    WaitingPartnerPhone { partner_name: String },

    /// Waiting for "amount description category" in one message
    WaitingQuickExpense,

    /// Write in flight (transient, never outlives a turn)
    Saving { write: PendingWrite },

    /// Report fetch in flight (transient, never outlives a turn)
    LoadingReport { view: ReportView },
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::Menu => "menu",
            Step::WaitingSalary => "waiting_salary",
            Step::WaitingSharedExpenseAmount => "waiting_shared_expense_amount",
            Step::WaitingSharedExpenseDescription { .. } => "waiting_shared_expense_description",
            Step::WaitingIndividualExpenseAmount => "waiting_individual_expense_amount",
            Step::WaitingIndividualExpenseDescription { .. } => {
                "waiting_individual_expense_description"
            }
            Step::WaitingPartnerName => "waiting_partner_name",
            Step::WaitingPartnerPhone { .. } => "waiting_partner_phone",
            Step::WaitingQuickExpense => "waiting_quick_expense",
            Step::Saving { .. } => "saving",
            Step::LoadingReport { .. } => "loading_report",
        }
    }

    /// Steps that only exist while a ledger call is running
    pub fn is_transient(&self) -> bool {
        matches!(self, Step::Saving { .. } | Step::LoadingReport { .. })
    }
}

/// Scratch values of the current flow
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pending {
    pub amount: Option<u64>,
    pub partner_name: Option<String>,
}

impl Pending {
    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.amount.is_none() && self.partner_name.is_none()
    }
}

// ============================================================================
// Session
// ============================================================================

/// One phone's conversation, kept in memory only
#[derive(Debug, Clone)]
pub struct Session {
    pub phone: String,
    pub step: Step,
    pub last_activity: Instant,
}

impl Session {
    pub fn new(phone: impl Into<String>) -> Self {
        Self {
            phone: phone.into(),
            step: Step::Menu,
            last_activity: Instant::now(),
        }
    }

    pub fn reset(&mut self) {
        self.step = Step::Menu;
    }

    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    pub fn is_idle(&self, max_idle: Duration) -> bool {
        self.last_activity.elapsed() >= max_idle
    }

    pub fn pending(&self) -> Pending {
        match &self.step {
            Step::WaitingSharedExpenseDescription { amount }
            | Step::WaitingIndividualExpenseDescription { amount } => Pending {
                amount: Some(*amount),
                partner_name: None,
            },
            Step::WaitingPartnerPhone { partner_name } => Pending {
                amount: None,
                partner_name: Some(partner_name.clone()),
            },
            _ => Pending::default(),
        }
    }
}

/// Per-turn inputs the transition needs besides the step (immutable)
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub phone: String,
    /// Date shown in confirmations
    pub today: NaiveDate,
    pub policy: AmountPolicy,
}

impl SessionContext {
    pub fn new(phone: impl Into<String>, today: NaiveDate, policy: AmountPolicy) -> Self {
        Self {
            phone: phone.into(),
            today,
            policy,
        }
    }
}
