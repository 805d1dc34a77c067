//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::state::*;
use super::transition::*;
use super::*;
use crate::ledger::{Category, SharingType};
use crate::money::{format_number, AmountPolicy, DEFAULT_MAX_AMOUNT};
use crate::report::MonthlyReport;
use chrono::NaiveDate;
use proptest::prelude::*;

// ============================================================================
// Test Helpers
// ============================================================================

fn test_context() -> SessionContext {
    SessionContext::new(
        "+5491100000001",
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
        AmountPolicy::default(),
    )
}

fn empty_report() -> MonthlyReport {
    MonthlyReport {
        phone: "+5491100000001".to_string(),
        expenses: vec![],
        income: 0,
        partner: None,
        partner_salary: None,
    }
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_amount() -> impl Strategy<Value = u64> {
    1u64..=DEFAULT_MAX_AMOUNT
}

fn arb_sharing() -> impl Strategy<Value = SharingType> {
    prop_oneof![Just(SharingType::Shared), Just(SharingType::Individual)]
}

fn arb_category() -> impl Strategy<Value = Option<Category>> {
    proptest::option::of(proptest::sample::select(Category::ALL.to_vec()))
}

fn arb_pending_write() -> impl Strategy<Value = PendingWrite> {
    prop_oneof![
        arb_amount().prop_map(|amount| PendingWrite::Income {
            amount,
            label: "Sueldo".to_string()
        }),
        (arb_amount(), "[A-Za-z ]{1,20}", arb_sharing(), arb_category()).prop_map(
            |(amount, description, sharing, category)| PendingWrite::Expense {
                amount,
                description,
                sharing,
                percentage: 50,
                category,
            }
        ),
        ("[A-Za-z]{2,10}", "\\+[0-9]{8,15}")
            .prop_map(|(name, phone)| PendingWrite::Partner { name, phone }),
    ]
}

fn arb_waiting_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        Just(Step::Menu),
        Just(Step::WaitingSalary),
        Just(Step::WaitingSharedExpenseAmount),
        arb_amount().prop_map(|amount| Step::WaitingSharedExpenseDescription { amount }),
        Just(Step::WaitingIndividualExpenseAmount),
        arb_amount().prop_map(|amount| Step::WaitingIndividualExpenseDescription { amount }),
        Just(Step::WaitingPartnerName),
        "[A-Za-z]{2,10}".prop_map(|partner_name| Step::WaitingPartnerPhone { partner_name }),
        Just(Step::WaitingQuickExpense),
    ]
}

fn arb_transient_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        arb_pending_write().prop_map(|write| Step::Saving { write }),
        Just(Step::LoadingReport {
            view: ReportView::Expenses
        }),
        Just(Step::LoadingReport {
            view: ReportView::Summary
        }),
    ]
}

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![arb_waiting_step(), arb_transient_step()]
}

fn arb_amount_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        Just(Step::WaitingSalary),
        Just(Step::WaitingSharedExpenseAmount),
        Just(Step::WaitingIndividualExpenseAmount),
    ]
}

/// The reset keyword with random case and padding
fn arb_reset_text() -> impl Strategy<Value = String> {
    (
        prop_oneof![Just("menu"), Just("MENU"), Just("Menu"), Just("menú"), Just("MENÚ")],
        " {0,3}",
        " {0,3}",
    )
        .prop_map(|(word, pre, post)| format!("{pre}{word}{post}"))
}

fn arb_out_of_range_amount() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("0".to_string()),
        Just("000".to_string()),
        (DEFAULT_MAX_AMOUNT + 1..=u64::MAX / 2).prop_map(|n| n.to_string()),
        (DEFAULT_MAX_AMOUNT + 1..=10 * DEFAULT_MAX_AMOUNT).prop_map(format_number),
    ]
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        "[a-z0-9 ]{0,20}".prop_map(|text| Event::user_message(text)),
        Just(Event::WriteCompleted),
        "[a-z ]{1,20}".prop_map(|message| Event::WriteFailed { message }),
        Just(Event::ReportLoaded {
            report: empty_report()
        }),
        "[a-z ]{1,20}".prop_map(|message| Event::ReportFailed { message }),
    ]
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// The reset keyword returns to Menu from any step and drops pending values
    #[test]
    fn prop_reset_from_any_step(step in arb_step(), text in arb_reset_text()) {
        let result = transition(&step, &test_context(), Event::user_message(text)).unwrap();
        prop_assert_eq!(&result.new_step, &Step::Menu);
        prop_assert!(result.effects.is_empty());
        prop_assert_eq!(result.reply, Some(crate::messages::main_menu()));

        let mut session = Session::new("+5491100000001");
        session.step = result.new_step;
        prop_assert!(session.pending().is_empty());
    }

    /// Out-of-range amounts keep the step and never persist
    #[test]
    fn prop_out_of_range_amount_stays(step in arb_amount_step(), text in arb_out_of_range_amount()) {
        let result = transition(&step, &test_context(), Event::user_message(text)).unwrap();
        prop_assert_eq!(&result.new_step, &step);
        prop_assert!(result.effects.is_empty());
        prop_assert!(result.reply.is_some());
    }

    /// Valid amounts always leave the amount prompt
    #[test]
    fn prop_valid_amount_advances(step in arb_amount_step(), amount in arb_amount()) {
        let result = transition(&step, &test_context(), Event::user_message(format_number(amount))).unwrap();
        prop_assert_ne!(&result.new_step, &step);
        match result.new_step {
            Step::Saving { write: PendingWrite::Income { amount: saved, .. } } => {
                prop_assert_eq!(saved, amount);
                prop_assert_eq!(result.effects.len(), 1);
            }
            Step::WaitingSharedExpenseDescription { amount: pending }
            | Step::WaitingIndividualExpenseDescription { amount: pending } => {
                prop_assert_eq!(pending, amount);
                prop_assert!(result.effects.is_empty());
            }
            other => prop_assert!(false, "unexpected step {:?}", other),
        }
    }

    /// Every Persist effect matches the Saving step it enters
    #[test]
    fn prop_persist_matches_saving_step(step in arb_waiting_step(), text in "[a-zA-Z0-9 +.]{0,30}") {
        if let Ok(result) = transition(&step, &test_context(), Event::user_message(text)) {
            for effect in &result.effects {
                match effect {
                    Effect::Persist(write) => {
                        prop_assert_eq!(&result.new_step, &Step::Saving { write: write.clone() });
                    }
                    Effect::FetchReport { view } => {
                        prop_assert_eq!(&result.new_step, &Step::LoadingReport { view: *view });
                    }
                }
            }
            prop_assert!(result.effects.len() <= 1);
            // A step that waits on an effect has no reply yet
            prop_assert_eq!(result.new_step.is_transient(), result.reply.is_none());
        }
    }

    /// User messages never fail outside transient steps
    #[test]
    fn prop_user_message_accepted_when_waiting(step in arb_waiting_step(), text in ".{0,40}") {
        prop_assert!(transition(&step, &test_context(), Event::user_message(text)).is_ok());
    }

    /// Ledger outcomes always end the turn in Menu with a reply
    #[test]
    fn prop_transient_steps_resolve_to_menu(step in arb_transient_step(), event in arb_event()) {
        if matches!(event, Event::UserMessage { .. }) {
            return Ok(());
        }
        match transition(&step, &test_context(), event) {
            Ok(result) => {
                prop_assert_eq!(&result.new_step, &Step::Menu);
                prop_assert!(result.effects.is_empty());
                prop_assert!(result.reply.is_some());
            }
            Err(e) => prop_assert!(matches!(e, TransitionError::InvalidTransition(_))),
        }
    }

    /// Ledger events make no sense outside transient steps
    #[test]
    fn prop_ledger_events_rejected_when_waiting(step in arb_waiting_step(), event in arb_event()) {
        if matches!(event, Event::UserMessage { .. }) {
            return Ok(());
        }
        prop_assert!(transition(&step, &test_context(), event).is_err());
    }

    /// Descriptions reach the ledger trimmed
    #[test]
    fn prop_description_trimmed(amount in arb_amount(), sharing in arb_sharing(), word in "[A-Za-z]{1,15}", pad in " {0,4}") {
        let step = match sharing {
            SharingType::Shared => Step::WaitingSharedExpenseDescription { amount },
            SharingType::Individual => Step::WaitingIndividualExpenseDescription { amount },
        };
        let text = format!("{pad}{word}{pad}");
        let result = transition(&step, &test_context(), Event::user_message(text)).unwrap();
        prop_assert_eq!(
            result.effects,
            vec![Effect::Persist(PendingWrite::Expense {
                amount,
                description: word,
                sharing,
                percentage: 50,
                category: None,
            })]
        );
    }
}
