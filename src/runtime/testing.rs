//! Mock implementations for testing
//!
//! These mocks enable integration testing without real I/O.

use crate::ledger::{
    report_phones, normalize_phone, same_phone, ExpenseRecord, IncomeRecord, Ledger, LedgerError,
    LedgerResult, LedgerStats, Month, PartnerLink, UserProfile,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

// ============================================================================
// Mock Ledger
// ============================================================================

/// In-memory ledger with switchable failures
#[derive(Default)]
pub struct MockLedger {
    pub incomes: Mutex<Vec<IncomeRecord>>,
    pub expenses: Mutex<Vec<ExpenseRecord>>,
    pub partners: Mutex<Vec<PartnerLink>>,
    pub users: Mutex<Vec<UserProfile>>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write fail until turned off again
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every read fail until turned off again
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn recorded_expenses(&self) -> Vec<ExpenseRecord> {
        self.expenses.lock().unwrap().clone()
    }

    pub fn recorded_incomes(&self) -> Vec<IncomeRecord> {
        self.incomes.lock().unwrap().clone()
    }

    pub fn recorded_partners(&self) -> Vec<PartnerLink> {
        self.partners.lock().unwrap().clone()
    }

    pub fn recorded_users(&self) -> Vec<UserProfile> {
        self.users.lock().unwrap().clone()
    }

    /// Number of write calls that reached the ledger
    pub fn write_count(&self) -> usize {
        self.incomes.lock().unwrap().len()
            + self.expenses.lock().unwrap().len()
            + self.partners.lock().unwrap().len()
    }

    fn check_write(&self) -> LedgerResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(LedgerError::Unavailable("injected write failure".to_string()));
        }
        Ok(())
    }

    fn check_read(&self) -> LedgerResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(LedgerError::Unavailable("injected read failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Ledger for MockLedger {
    fn backend_name(&self) -> &'static str {
        "mock"
    }

    async fn verify(&self) -> LedgerResult<()> {
        self.check_read()
    }

    async fn record_income(&self, income: &IncomeRecord) -> LedgerResult<()> {
        self.check_write()?;
        self.incomes.lock().unwrap().push(income.clone());
        Ok(())
    }

    async fn record_expense(&self, expense: &ExpenseRecord) -> LedgerResult<()> {
        self.check_write()?;
        self.expenses.lock().unwrap().push(expense.clone());
        Ok(())
    }

    async fn fetch_monthly_expenses(
        &self,
        phone: &str,
        month: Month,
    ) -> LedgerResult<Vec<ExpenseRecord>> {
        self.check_read()?;
        let link = self.fetch_partner_link(phone).await?;
        let phones = report_phones(phone, link.as_ref());
        Ok(self
            .expenses
            .lock()
            .unwrap()
            .iter()
            .filter(|e| month.contains(&e.timestamp) && phones.contains(&normalize_phone(&e.phone)))
            .cloned()
            .collect())
    }

    async fn fetch_monthly_income(
        &self,
        phone: &str,
        month: Month,
    ) -> LedgerResult<Vec<IncomeRecord>> {
        self.check_read()?;
        Ok(self
            .incomes
            .lock()
            .unwrap()
            .iter()
            .filter(|i| month.contains(&i.timestamp) && same_phone(&i.phone, phone))
            .cloned()
            .collect())
    }

    async fn latest_income(&self, phone: &str) -> LedgerResult<Option<IncomeRecord>> {
        self.check_read()?;
        Ok(self
            .incomes
            .lock()
            .unwrap()
            .iter()
            .filter(|i| same_phone(&i.phone, phone))
            .max_by_key(|i| i.timestamp)
            .cloned())
    }

    async fn link_partner(&self, link: &PartnerLink) -> LedgerResult<()> {
        self.check_write()?;
        let mut partners = self.partners.lock().unwrap();
        partners.retain(|p| !same_phone(&p.phone, &link.phone));
        partners.push(link.clone());
        Ok(())
    }

    async fn fetch_partner_link(&self, phone: &str) -> LedgerResult<Option<PartnerLink>> {
        self.check_read()?;
        Ok(self
            .partners
            .lock()
            .unwrap()
            .iter()
            .find(|p| same_phone(&p.phone, phone))
            .cloned())
    }

    async fn register_user(&self, profile: &UserProfile) -> LedgerResult<()> {
        self.check_write()?;
        let mut users = self.users.lock().unwrap();
        if !users.iter().any(|u| same_phone(&u.phone, &profile.phone)) {
            users.push(profile.clone());
        }
        Ok(())
    }

    async fn stats(&self) -> LedgerResult<LedgerStats> {
        self.check_read()?;
        Ok(LedgerStats {
            incomes: self.incomes.lock().unwrap().len(),
            expenses: self.expenses.lock().unwrap().len(),
            partner_links: self.partners.lock().unwrap().len(),
            users: self.users.lock().unwrap().len(),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::SharingType;
    use crate::messages;
    use crate::money::AmountPolicy;
    use crate::runtime::{ConversationService, InboundMessage};
    use crate::state_machine::Step;
    use chrono::Local;
    use std::sync::Arc;

    const PHONE: &str = "whatsapp:+5491100000001";
    const PARTNER: &str = "whatsapp:+5491100000002";

    fn service() -> (ConversationService<Arc<MockLedger>>, Arc<MockLedger>) {
        let ledger = Arc::new(MockLedger::new());
        (
            ConversationService::new(Arc::clone(&ledger), AmountPolicy::default()),
            ledger,
        )
    }

    async fn send(service: &ConversationService<Arc<MockLedger>>, from: &str, body: &str) -> String {
        service
            .handle(InboundMessage {
                from: from.to_string(),
                body: body.to_string(),
                display_name: None,
            })
            .await
    }

    async fn step_of(service: &ConversationService<Arc<MockLedger>>, from: &str) -> Step {
        let phone = crate::ledger::canonical_phone(from);
        let (session, _) = service.sessions().get_or_create(&phone).await;
        let step = session.lock().await.step.clone();
        step
    }

    #[tokio::test]
    async fn test_first_message_gets_menu_error() {
        let (service, _) = service();
        let reply = send(&service, PHONE, "hola").await;
        assert!(reply.contains("Opción no válida"));
        assert!(reply.contains("GESTOR FINANCIERO"));
        assert_eq!(step_of(&service, PHONE).await, Step::Menu);
    }

    #[tokio::test]
    async fn test_shared_expense_end_to_end() {
        let (service, ledger) = service();
        send(&service, PHONE, "2").await;
        send(&service, PHONE, "50000").await;
        let reply = send(&service, PHONE, "Supermercado").await;

        assert!(reply.contains("50.000"));
        assert!(reply.contains("Supermercado"));
        assert_eq!(step_of(&service, PHONE).await, Step::Menu);

        let expenses = ledger.recorded_expenses();
        assert_eq!(expenses.len(), 1);
        assert_eq!(expenses[0].amount, 50_000);
        assert_eq!(expenses[0].description, "Supermercado");
        assert_eq!(expenses[0].sharing, SharingType::Shared);
        assert_eq!(expenses[0].share_percentage, 50);
        assert_eq!(expenses[0].phone, "+5491100000001");
    }

    #[tokio::test]
    async fn test_out_of_range_amount_makes_no_write() {
        let (service, ledger) = service();
        for (option, step) in [
            ("1", Step::WaitingSalary),
            ("2", Step::WaitingSharedExpenseAmount),
            ("3", Step::WaitingIndividualExpenseAmount),
        ] {
            send(&service, PHONE, option).await;
            for amount in ["0", "999999999"] {
                let reply = send(&service, PHONE, amount).await;
                assert!(reply.contains("monto válido"), "{reply}");
                assert_eq!(step_of(&service, PHONE).await, step);
            }
            send(&service, PHONE, "menu").await;
        }
        assert_eq!(ledger.write_count(), 0);
    }

    #[tokio::test]
    async fn test_reset_mid_flow_discards_pending_amount() {
        let (service, ledger) = service();
        send(&service, PHONE, "3").await;
        send(&service, PHONE, "15000").await;
        assert_eq!(
            step_of(&service, PHONE).await,
            Step::WaitingIndividualExpenseDescription { amount: 15_000 }
        );

        let reply = send(&service, PHONE, " MENÚ ").await;
        assert_eq!(reply, messages::main_menu());
        assert_eq!(step_of(&service, PHONE).await, Step::Menu);
        assert_eq!(ledger.write_count(), 0);
    }

    #[tokio::test]
    async fn test_save_failure_returns_to_menu() {
        let (service, ledger) = service();
        ledger.fail_writes(true);

        send(&service, PHONE, "1").await;
        let reply = send(&service, PHONE, "1.400.000").await;
        assert!(reply.contains("Error al guardar"));
        assert!(reply.contains("GESTOR FINANCIERO"));
        assert_eq!(step_of(&service, PHONE).await, Step::Menu);

        send(&service, PHONE, "5").await;
        send(&service, PHONE, "Ana").await;
        let reply = send(&service, PHONE, "+5491100000002").await;
        assert!(reply.contains("Error al guardar"));
        assert_eq!(step_of(&service, PHONE).await, Step::Menu);
    }

    #[tokio::test]
    async fn test_expense_save_failure_returns_to_menu() {
        let (service, ledger) = service();
        ledger.fail_writes(true);

        for (option, amount, description) in [("2", "50000", "Supermercado"), ("3", "15000", "Peluquería")] {
            send(&service, PHONE, option).await;
            send(&service, PHONE, amount).await;
            let reply = send(&service, PHONE, description).await;
            assert!(reply.contains("Error al guardar"), "{reply}");
            assert!(reply.contains("GESTOR FINANCIERO"));
            assert_eq!(step_of(&service, PHONE).await, Step::Menu);
        }

        send(&service, PHONE, "7").await;
        let reply = send(&service, PHONE, "25000 Cena con amigos comida").await;
        assert!(reply.contains("Error al guardar"), "{reply}");
        assert_eq!(step_of(&service, PHONE).await, Step::Menu);

        assert!(ledger.recorded_expenses().is_empty());
    }

    #[tokio::test]
    async fn test_report_failure_returns_to_menu() {
        let (service, ledger) = service();
        ledger.fail_reads(true);
        let reply = send(&service, PHONE, "4").await;
        assert!(reply.contains("No pude obtener"));
        assert_eq!(step_of(&service, PHONE).await, Step::Menu);
    }

    #[tokio::test]
    async fn test_empty_report() {
        let (service, _) = service();
        let reply = send(&service, PHONE, "4").await;
        assert!(reply.contains("No hay gastos registrados"));
        assert!(!reply.contains("Total"));
    }

    #[tokio::test]
    async fn test_summary_includes_partner_expenses_and_share() {
        let (service, _) = service();

        send(&service, PHONE, "5").await;
        send(&service, PHONE, "Ana").await;
        let reply = send(&service, PHONE, "+54 9 11 0000-0002").await;
        assert!(reply.contains("PAREJA CONFIGURADA"));

        send(&service, PHONE, "1").await;
        send(&service, PHONE, "1000000").await;
        send(&service, PARTNER, "1").await;
        send(&service, PARTNER, "800000").await;

        send(&service, PHONE, "2").await;
        send(&service, PHONE, "60000").await;
        send(&service, PHONE, "Alquiler").await;
        send(&service, PARTNER, "2").await;
        send(&service, PARTNER, "40000").await;
        send(&service, PARTNER, "Luz").await;

        let reply = send(&service, PHONE, "6").await;
        assert!(reply.contains("👥 Compartidos: $100.000"));
        assert!(reply.contains("🤝 Parte de cada uno: $50.000"));
        assert!(reply.contains("Ana (sueldo: $800.000)"));
        assert!(reply.contains("💵 Ingresos del mes: $1.000.000"));
        assert_eq!(step_of(&service, PHONE).await, Step::Menu);
    }

    #[tokio::test]
    async fn test_quick_expense_records_category() {
        let (service, ledger) = service();
        send(&service, PHONE, "7").await;
        let reply = send(&service, PHONE, "25000 cena con amigos comida").await;
        assert!(reply.contains("25.000"));
        assert!(reply.contains("comida"));

        let expenses = ledger.recorded_expenses();
        assert_eq!(expenses[0].description, "cena con amigos");
        assert_eq!(expenses[0].sharing, SharingType::Shared);
        assert_eq!(expenses[0].timestamp.date(), Local::now().date_naive());
    }

    #[tokio::test]
    async fn test_new_session_registers_user_once() {
        let (service, ledger) = service();
        for _ in 0..2 {
            service
                .handle(InboundMessage {
                    from: PHONE.to_string(),
                    body: "menu".to_string(),
                    display_name: Some("Juan".to_string()),
                })
                .await;
        }
        let users = ledger.recorded_users();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].name, "Juan");
        assert_eq!(users[0].phone, "+5491100000001");
    }

    #[tokio::test]
    async fn test_registration_failure_does_not_block_reply() {
        let (service, ledger) = service();
        ledger.fail_writes(true);
        let reply = service
            .handle(InboundMessage {
                from: PHONE.to_string(),
                body: "1".to_string(),
                display_name: Some("Juan".to_string()),
            })
            .await;
        assert!(reply.contains("INGRESAR SUELDO"));
    }

    #[tokio::test]
    async fn test_concurrent_phones_are_independent() {
        let (service, ledger) = service();
        let service = Arc::new(service);

        let mut handles = vec![];
        for i in 0..8 {
            let service = Arc::clone(&service);
            handles.push(tokio::spawn(async move {
                let from = format!("+54911000001{i:02}");
                send(&service, &from, "3").await;
                send(&service, &from, "1000").await;
                send(&service, &from, "Café").await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().contains("GASTO INDIVIDUAL REGISTRADO"));
        }
        assert_eq!(ledger.recorded_expenses().len(), 8);
        assert_eq!(service.sessions().len().await, 8);
    }

    #[tokio::test]
    async fn test_partner_link_is_upserted() {
        let (service, ledger) = service();
        for name in ["Ana", "Sofía"] {
            send(&service, PHONE, "5").await;
            send(&service, PHONE, name).await;
            send(&service, PHONE, "+5491100000002").await;
        }
        let partners = ledger.recorded_partners();
        assert_eq!(partners.len(), 1);
        assert_eq!(partners[0].partner_name, "Sofía");
    }

    #[tokio::test]
    async fn test_salary_recorded_with_label() {
        let (service, ledger) = service();
        send(&service, PHONE, "1").await;
        let reply = send(&service, PHONE, "1,400,000").await;
        assert!(reply.contains("SUELDO REGISTRADO"));
        let incomes = ledger.recorded_incomes();
        assert_eq!(incomes.len(), 1);
        assert!(incomes[0].is_salary());
        assert_eq!(incomes[0].amount, 1_400_000);
    }
}
