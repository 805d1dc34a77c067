//! Conversation runtime
//!
//! Owns the session store and runs each inbound message through the state
//! machine, executing ledger effects until the turn settles.

mod sessions;

#[cfg(test)]
pub mod testing;

pub use sessions::{spawn_eviction_task, SessionStore};

use crate::ledger::{
    canonical_phone, ExpenseRecord, IncomeRecord, Ledger, LedgerResult, Month, PartnerLink,
    UserProfile,
};
use crate::messages;
use crate::money::AmountPolicy;
use crate::report::MonthlyReport;
use crate::state_machine::{
    transition, Effect, Event, PendingWrite, ReportView, Session, SessionContext,
};
use chrono::Local;
use std::sync::Arc;
use tracing::Instrument;

/// Type alias for the runtime wired to a boxed ledger
pub type ProductionService = ConversationService<Arc<dyn Ledger>>;

/// One message as delivered by the transport
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Sender id, with or without the `whatsapp:` prefix
    pub from: String,
    pub body: String,
    pub display_name: Option<String>,
}

pub struct ConversationService<L: Ledger> {
    ledger: L,
    sessions: Arc<SessionStore>,
    policy: AmountPolicy,
}

impl<L: Ledger> ConversationService<L> {
    pub fn new(ledger: L, policy: AmountPolicy) -> Self {
        Self {
            ledger,
            sessions: Arc::new(SessionStore::new()),
            policy,
        }
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Handle one inbound message and return the reply text. Never fails.
    pub async fn handle(&self, message: InboundMessage) -> String {
        let phone = canonical_phone(&message.from);
        let request_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("message", %request_id, phone = %phone);

        async move {
            let (handle, created) = self.sessions.get_or_create(&phone).await;
            if created {
                tracing::info!("New session");
                if let Some(name) = message.display_name.as_deref().filter(|n| !n.trim().is_empty()) {
                    self.register_user(&phone, name).await;
                }
            }

            // Held for the whole turn so one phone's messages never interleave
            let mut session = handle.lock().await;
            session.touch();

            let context = SessionContext::new(phone, Local::now().date_naive(), self.policy);
            self.run_turn(&mut session, &context, Event::user_message(message.body))
                .await
        }
        .instrument(span)
        .await
    }

    async fn register_user(&self, phone: &str, name: &str) {
        let profile = UserProfile {
            phone: phone.to_string(),
            name: name.trim().to_string(),
        };
        if let Err(e) = self.ledger.register_user(&profile).await {
            tracing::warn!(error = %e, "Failed to register user");
        }
    }

    /// Drive transitions and effects until no events remain
    async fn run_turn(
        &self,
        session: &mut Session,
        context: &SessionContext,
        event: Event,
    ) -> String {
        let mut events_to_process = vec![event];
        let mut reply = None;

        while let Some(current_event) = events_to_process.pop() {
            let event_name = current_event.name();
            let result = match transition(&session.step, context, current_event) {
                Ok(r) => r,
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        phone = %session.phone,
                        step = session.step.name(),
                        "Transition failed, resetting session"
                    );
                    session.reset();
                    return messages::generic_error();
                }
            };

            let old_step = std::mem::replace(&mut session.step, result.new_step);
            tracing::debug!(
                event = event_name,
                from = old_step.name(),
                to = session.step.name(),
                pending = ?session.pending(),
                "Step transition"
            );

            if result.reply.is_some() {
                reply = result.reply;
            }

            for effect in result.effects {
                events_to_process.push(self.execute_effect(effect, context).await);
            }
        }

        match reply {
            Some(text) if !session.step.is_transient() => text,
            _ => {
                tracing::error!(step = session.step.name(), "Turn ended without settling, resetting session");
                session.reset();
                messages::generic_error()
            }
        }
    }

    /// Execute an effect and return the event describing its outcome
    async fn execute_effect(&self, effect: Effect, context: &SessionContext) -> Event {
        match effect {
            Effect::Persist(write) => match self.persist(write, &context.phone).await {
                Ok(()) => Event::WriteCompleted,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to persist record");
                    Event::WriteFailed {
                        message: e.to_string(),
                    }
                }
            },
            Effect::FetchReport { view } => {
                match self.load_report(view, &context.phone, Month::of(context.today)).await {
                    Ok(report) => Event::ReportLoaded { report },
                    Err(e) => {
                        tracing::error!(error = %e, ?view, "Failed to load report");
                        Event::ReportFailed {
                            message: e.to_string(),
                        }
                    }
                }
            }
        }
    }

    async fn persist(&self, write: PendingWrite, phone: &str) -> LedgerResult<()> {
        let timestamp = Local::now().naive_local();
        match write {
            PendingWrite::Income { amount, label } => {
                self.ledger
                    .record_income(&IncomeRecord {
                        timestamp,
                        phone: phone.to_string(),
                        amount,
                        description: label,
                    })
                    .await
            }
            PendingWrite::Expense {
                amount,
                description,
                sharing,
                percentage,
                category,
            } => {
                self.ledger
                    .record_expense(&ExpenseRecord {
                        timestamp,
                        phone: phone.to_string(),
                        amount,
                        description,
                        category,
                        sharing,
                        share_percentage: percentage,
                    })
                    .await
            }
            PendingWrite::Partner { name, phone: partner_phone } => {
                self.ledger
                    .link_partner(&PartnerLink {
                        phone: phone.to_string(),
                        partner_name: name,
                        partner_phone,
                        configured_at: timestamp,
                    })
                    .await
            }
        }
    }

    async fn load_report(
        &self,
        view: ReportView,
        phone: &str,
        month: Month,
    ) -> LedgerResult<MonthlyReport> {
        let expenses = self.ledger.fetch_monthly_expenses(phone, month).await?;
        let mut report = MonthlyReport {
            phone: phone.to_string(),
            expenses,
            income: 0,
            partner: None,
            partner_salary: None,
        };
        if view == ReportView::Expenses {
            return Ok(report);
        }

        report.income = self
            .ledger
            .fetch_monthly_income(phone, month)
            .await?
            .iter()
            .map(|income| income.amount)
            .fold(0, u64::saturating_add);

        if let Some(partner) = self.ledger.fetch_partner_link(phone).await? {
            report.partner_salary = self
                .ledger
                .latest_income(&partner.partner_phone)
                .await?
                .filter(IncomeRecord::is_salary)
                .map(|income| income.amount);
            report.partner = Some(partner);
        }
        Ok(report)
    }
}
