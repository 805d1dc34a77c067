//! Logging wrapper for ledger backends

use super::{
    ExpenseRecord, IncomeRecord, Ledger, LedgerResult, LedgerStats, Month, PartnerLink,
    UserProfile,
};
use async_trait::async_trait;
use std::time::Instant;

/// Logs duration and outcome of every gateway call
pub struct LoggingLedger<L> {
    inner: L,
}

impl<L: Ledger> LoggingLedger<L> {
    pub fn new(inner: L) -> Self {
        Self { inner }
    }

    fn log<T>(&self, operation: &'static str, started: Instant, result: &LedgerResult<T>) {
        let duration_ms = started.elapsed().as_millis();
        match result {
            Ok(_) => tracing::debug!(
                backend = self.inner.backend_name(),
                operation,
                duration_ms = %duration_ms,
                "Ledger call completed"
            ),
            Err(e) => tracing::error!(
                backend = self.inner.backend_name(),
                operation,
                duration_ms = %duration_ms,
                error = %e,
                "Ledger call failed"
            ),
        }
    }
}

#[async_trait]
impl<L: Ledger> Ledger for LoggingLedger<L> {
    fn backend_name(&self) -> &'static str {
        self.inner.backend_name()
    }

    async fn verify(&self) -> LedgerResult<()> {
        let started = Instant::now();
        let result = self.inner.verify().await;
        self.log("verify", started, &result);
        result
    }

    async fn record_income(&self, income: &IncomeRecord) -> LedgerResult<()> {
        let started = Instant::now();
        let result = self.inner.record_income(income).await;
        self.log("record_income", started, &result);
        if result.is_ok() {
            tracing::info!(phone = %income.phone, amount = income.amount, "Income recorded");
        }
        result
    }

    async fn record_expense(&self, expense: &ExpenseRecord) -> LedgerResult<()> {
        let started = Instant::now();
        let result = self.inner.record_expense(expense).await;
        self.log("record_expense", started, &result);
        if result.is_ok() {
            tracing::info!(
                phone = %expense.phone,
                amount = expense.amount,
                sharing = %expense.sharing,
                "Expense recorded"
            );
        }
        result
    }

    async fn fetch_monthly_expenses(
        &self,
        phone: &str,
        month: Month,
    ) -> LedgerResult<Vec<ExpenseRecord>> {
        let started = Instant::now();
        let result = self.inner.fetch_monthly_expenses(phone, month).await;
        self.log("fetch_monthly_expenses", started, &result);
        if let Ok(expenses) = &result {
            tracing::info!(%phone, count = expenses.len(), "Monthly expenses fetched");
        }
        result
    }

    async fn fetch_monthly_income(
        &self,
        phone: &str,
        month: Month,
    ) -> LedgerResult<Vec<IncomeRecord>> {
        let started = Instant::now();
        let result = self.inner.fetch_monthly_income(phone, month).await;
        self.log("fetch_monthly_income", started, &result);
        result
    }

    async fn latest_income(&self, phone: &str) -> LedgerResult<Option<IncomeRecord>> {
        let started = Instant::now();
        let result = self.inner.latest_income(phone).await;
        self.log("latest_income", started, &result);
        result
    }

    async fn link_partner(&self, link: &PartnerLink) -> LedgerResult<()> {
        let started = Instant::now();
        let result = self.inner.link_partner(link).await;
        self.log("link_partner", started, &result);
        if result.is_ok() {
            tracing::info!(phone = %link.phone, partner = %link.partner_phone, "Partner linked");
        }
        result
    }

    async fn fetch_partner_link(&self, phone: &str) -> LedgerResult<Option<PartnerLink>> {
        let started = Instant::now();
        let result = self.inner.fetch_partner_link(phone).await;
        self.log("fetch_partner_link", started, &result);
        result
    }

    async fn register_user(&self, profile: &UserProfile) -> LedgerResult<()> {
        let started = Instant::now();
        let result = self.inner.register_user(profile).await;
        self.log("register_user", started, &result);
        result
    }

    async fn stats(&self) -> LedgerResult<LedgerStats> {
        let started = Instant::now();
        let result = self.inner.stats().await;
        self.log("stats", started, &result);
        result
    }
}
