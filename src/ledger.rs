//! Persistence gateway for the finance ledger
//!
//! The conversation runtime only talks to the [`Ledger`] trait. Two backends
//! implement it: a local SQLite file and a Google spreadsheet.

mod logging;
mod records;
pub mod sheets;
pub mod sqlite;

pub use logging::LoggingLedger;
pub use records::*;

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Spreadsheet API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("Could not obtain access token: {0}")]
    Token(String),
    #[error("Malformed row in {table}: {reason}")]
    MalformedRow { table: &'static str, reason: String },
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Row counts per table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LedgerStats {
    pub incomes: usize,
    pub expenses: usize,
    pub partner_links: usize,
    pub users: usize,
}

/// Durable store for incomes, expenses, partner links and users
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Short backend name for logs and the health endpoint
    fn backend_name(&self) -> &'static str;

    /// Create missing tables/sheets. Idempotent.
    async fn verify(&self) -> LedgerResult<()>;

    /// Append an income. A salary income also updates the user's salary.
    async fn record_income(&self, income: &IncomeRecord) -> LedgerResult<()>;

    /// Append an expense
    async fn record_expense(&self, expense: &ExpenseRecord) -> LedgerResult<()>;

    /// Expenses of `phone` and of its linked partner within `month`
    async fn fetch_monthly_expenses(
        &self,
        phone: &str,
        month: Month,
    ) -> LedgerResult<Vec<ExpenseRecord>>;

    /// Incomes of `phone` within `month`
    async fn fetch_monthly_income(&self, phone: &str, month: Month)
        -> LedgerResult<Vec<IncomeRecord>>;

    /// Most recently recorded income of `phone`, any month
    async fn latest_income(&self, phone: &str) -> LedgerResult<Option<IncomeRecord>>;

    /// Create or overwrite the partner link of `link.phone`
    async fn link_partner(&self, link: &PartnerLink) -> LedgerResult<()>;

    async fn fetch_partner_link(&self, phone: &str) -> LedgerResult<Option<PartnerLink>>;

    /// Insert the user if the phone is not registered yet
    async fn register_user(&self, profile: &UserProfile) -> LedgerResult<()>;

    async fn stats(&self) -> LedgerResult<LedgerStats>;
}

/// Phones whose expenses make up the monthly report of `phone`
pub fn report_phones(phone: &str, link: Option<&PartnerLink>) -> Vec<String> {
    let mut phones = vec![normalize_phone(phone)];
    if let Some(link) = link {
        let partner = normalize_phone(&link.partner_phone);
        if !partner.is_empty() && !phones.contains(&partner) {
            phones.push(partner);
        }
    }
    phones
}

// ============================================================================
// Arc implementation for trait objects
// ============================================================================

#[async_trait]
impl<T: Ledger + ?Sized> Ledger for Arc<T> {
    fn backend_name(&self) -> &'static str {
        (**self).backend_name()
    }

    async fn verify(&self) -> LedgerResult<()> {
        (**self).verify().await
    }

    async fn record_income(&self, income: &IncomeRecord) -> LedgerResult<()> {
        (**self).record_income(income).await
    }

    async fn record_expense(&self, expense: &ExpenseRecord) -> LedgerResult<()> {
        (**self).record_expense(expense).await
    }

    async fn fetch_monthly_expenses(
        &self,
        phone: &str,
        month: Month,
    ) -> LedgerResult<Vec<ExpenseRecord>> {
        (**self).fetch_monthly_expenses(phone, month).await
    }

    async fn fetch_monthly_income(
        &self,
        phone: &str,
        month: Month,
    ) -> LedgerResult<Vec<IncomeRecord>> {
        (**self).fetch_monthly_income(phone, month).await
    }

    async fn latest_income(&self, phone: &str) -> LedgerResult<Option<IncomeRecord>> {
        (**self).latest_income(phone).await
    }

    async fn link_partner(&self, link: &PartnerLink) -> LedgerResult<()> {
        (**self).link_partner(link).await
    }

    async fn fetch_partner_link(&self, phone: &str) -> LedgerResult<Option<PartnerLink>> {
        (**self).fetch_partner_link(phone).await
    }

    async fn register_user(&self, profile: &UserProfile) -> LedgerResult<()> {
        (**self).register_user(profile).await
    }

    async fn stats(&self) -> LedgerResult<LedgerStats> {
        (**self).stats().await
    }
}
