//! Pure step transition function
//!
//! Given the current step, the turn context and an event, decide the next
//! step, the reply text and the ledger work to run. No I/O happens here.

use super::input::{
    is_reset_keyword, parse_description, parse_partner_name, parse_partner_phone,
    parse_quick_expense, MenuOption,
};
use super::state::{PendingWrite, ReportView, SessionContext, Step};
use super::{Effect, Event};
use crate::ledger::{SharingType, DEFAULT_SHARE_PERCENTAGE, SALARY_LABEL};
use crate::messages;
use crate::money::parse_amount;
use crate::report::{format_expenses_report, format_monthly_summary, MonthlyReport};
use thiserror::Error;

/// Result of a step transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_step: Step,
    pub effects: Vec<Effect>,
    /// Text for the user; `None` while waiting on an effect
    pub reply: Option<String>,
}

impl TransitionResult {
    pub fn new(step: Step) -> Self {
        Self {
            new_step: step,
            effects: vec![],
            reply: None,
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_reply(mut self, reply: impl Into<String>) -> Self {
        self.reply = Some(reply.into());
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("Ledger call in progress, cannot accept message")]
    Busy,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
pub fn transition(
    step: &Step,
    context: &SessionContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (step, event) {
        // Reset keyword wins over every step, transient ones included
        (_, Event::UserMessage { text }) if is_reset_keyword(&text) => {
            Ok(TransitionResult::new(Step::Menu).with_reply(messages::main_menu()))
        }

        // ============================================================
        // Collecting input
        // ============================================================
        (Step::Menu, Event::UserMessage { text }) => Ok(handle_menu_option(&text)),

        (Step::WaitingSalary, Event::UserMessage { text }) => {
            Ok(match parse_amount(&text, context.policy) {
                Ok(amount) => save(PendingWrite::Income {
                    amount,
                    label: SALARY_LABEL.to_string(),
                }),
                Err(_) => stay(step, messages::invalid_salary_amount(context.policy)),
            })
        }

        (Step::WaitingSharedExpenseAmount, Event::UserMessage { text }) => Ok(
            handle_expense_amount(step, context, &text, SharingType::Shared),
        ),

        (Step::WaitingIndividualExpenseAmount, Event::UserMessage { text }) => Ok(
            handle_expense_amount(step, context, &text, SharingType::Individual),
        ),

        (Step::WaitingSharedExpenseDescription { amount }, Event::UserMessage { text }) => Ok(
            handle_expense_description(step, *amount, &text, SharingType::Shared),
        ),

        (Step::WaitingIndividualExpenseDescription { amount }, Event::UserMessage { text }) => Ok(
            handle_expense_description(step, *amount, &text, SharingType::Individual),
        ),

        (Step::WaitingPartnerName, Event::UserMessage { text }) => {
            Ok(match parse_partner_name(&text) {
                Some(partner_name) => {
                    let prompt = messages::partner_phone_prompt(&partner_name);
                    TransitionResult::new(Step::WaitingPartnerPhone { partner_name })
                        .with_reply(prompt)
                }
                None => stay(step, messages::partner_name_too_short()),
            })
        }

        (Step::WaitingPartnerPhone { partner_name }, Event::UserMessage { text }) => {
            Ok(match parse_partner_phone(&text) {
                Some(phone) => save(PendingWrite::Partner {
                    name: partner_name.clone(),
                    phone,
                }),
                None => stay(step, messages::invalid_partner_phone(partner_name)),
            })
        }

        (Step::WaitingQuickExpense, Event::UserMessage { text }) => {
            Ok(match parse_quick_expense(&text, context.policy) {
                Ok(quick) => save(PendingWrite::Expense {
                    amount: quick.amount,
                    description: quick.description,
                    sharing: SharingType::Shared,
                    percentage: DEFAULT_SHARE_PERCENTAGE,
                    category: Some(quick.category),
                }),
                Err(e) => stay(step, messages::quick_expense_error(&e, context.policy)),
            })
        }

        // Turns are serialized per phone, so this only happens if a turn was abandoned
        (Step::Saving { .. } | Step::LoadingReport { .. }, Event::UserMessage { .. }) => {
            Err(TransitionError::Busy)
        }

        // ============================================================
        // Ledger outcomes
        // ============================================================
        (Step::Saving { write }, Event::WriteCompleted) => Ok(TransitionResult::new(Step::Menu)
            .with_reply(confirmation(write, context))),

        (Step::Saving { .. }, Event::WriteFailed { .. }) => {
            Ok(TransitionResult::new(Step::Menu).with_reply(messages::save_failed()))
        }

        (Step::LoadingReport { view }, Event::ReportLoaded { report }) => {
            Ok(TransitionResult::new(Step::Menu).with_reply(render_report(*view, &report)))
        }

        (Step::LoadingReport { .. }, Event::ReportFailed { .. }) => {
            Ok(TransitionResult::new(Step::Menu).with_reply(messages::report_failed()))
        }

        (step, event) => Err(TransitionError::InvalidTransition(format!(
            "{} cannot handle {}",
            step.name(),
            event.name()
        ))),
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn stay(step: &Step, reply: String) -> TransitionResult {
    TransitionResult::new(step.clone()).with_reply(reply)
}

fn save(write: PendingWrite) -> TransitionResult {
    TransitionResult::new(Step::Saving {
        write: write.clone(),
    })
    .with_effect(Effect::Persist(write))
}

fn load(view: ReportView) -> TransitionResult {
    TransitionResult::new(Step::LoadingReport { view }).with_effect(Effect::FetchReport { view })
}

fn handle_menu_option(text: &str) -> TransitionResult {
    let Some(option) = MenuOption::parse(text) else {
        return TransitionResult::new(Step::Menu).with_reply(messages::invalid_option());
    };

    match option {
        MenuOption::Salary => {
            TransitionResult::new(Step::WaitingSalary).with_reply(messages::salary_prompt())
        }
        MenuOption::SharedExpense => TransitionResult::new(Step::WaitingSharedExpenseAmount)
            .with_reply(messages::shared_amount_prompt()),
        MenuOption::IndividualExpense => {
            TransitionResult::new(Step::WaitingIndividualExpenseAmount)
                .with_reply(messages::individual_amount_prompt())
        }
        MenuOption::ExpensesReport => load(ReportView::Expenses),
        MenuOption::ConfigurePartner => TransitionResult::new(Step::WaitingPartnerName)
            .with_reply(messages::partner_name_prompt()),
        MenuOption::MonthlySummary => load(ReportView::Summary),
        MenuOption::QuickExpense => TransitionResult::new(Step::WaitingQuickExpense)
            .with_reply(messages::quick_expense_prompt()),
    }
}

fn handle_expense_amount(
    step: &Step,
    context: &SessionContext,
    text: &str,
    sharing: SharingType,
) -> TransitionResult {
    let amount = match parse_amount(text, context.policy) {
        Ok(amount) => amount,
        Err(_) => return stay(step, messages::invalid_expense_amount(sharing, context.policy)),
    };

    let next = match sharing {
        SharingType::Shared => Step::WaitingSharedExpenseDescription { amount },
        SharingType::Individual => Step::WaitingIndividualExpenseDescription { amount },
    };
    TransitionResult::new(next).with_reply(messages::description_prompt(sharing, amount))
}

fn handle_expense_description(
    step: &Step,
    amount: u64,
    text: &str,
    sharing: SharingType,
) -> TransitionResult {
    match parse_description(text) {
        Some(description) => save(PendingWrite::Expense {
            amount,
            description,
            sharing,
            percentage: DEFAULT_SHARE_PERCENTAGE,
            category: None,
        }),
        None => stay(step, messages::empty_description(sharing, amount)),
    }
}

fn confirmation(write: &PendingWrite, context: &SessionContext) -> String {
    match write {
        PendingWrite::Income { amount, .. } => messages::salary_saved(*amount, context.today),
        PendingWrite::Expense {
            amount,
            description,
            sharing,
            category,
            ..
        } => messages::expense_saved(*amount, description, *sharing, *category, context.today),
        PendingWrite::Partner { name, phone } => messages::partner_saved(name, phone),
    }
}

fn render_report(view: ReportView, report: &MonthlyReport) -> String {
    let body = match view {
        ReportView::Expenses => format_expenses_report(&report.expenses),
        ReportView::Summary => format_monthly_summary(report),
    };
    messages::with_menu(&body)
}
