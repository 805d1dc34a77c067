//! Google Sheets backed ledger
//!
//! Talks to the Sheets REST API (v4) directly. Each table is a sheet whose
//! first row holds the headers; data starts on row 2.

mod rows;
mod token;

pub use token::{TokenProvider, TokenSource};

use self::rows::{Row, SheetSpec, ALL_SHEETS, EXPENSES, INCOMES, PARTNERS, USERS};
use super::{
    report_phones, same_phone, ExpenseRecord, IncomeRecord, Ledger, LedgerError, LedgerResult,
    LedgerStats, Month, PartnerLink, UserProfile,
};
use async_trait::async_trait;
use chrono::Local;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

pub const DEFAULT_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// How long a successful sheet check is trusted before checking again
const VERIFIED_TTL: Duration = Duration::from_secs(300);

/// Connection settings for the spreadsheet backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetsConfig {
    pub spreadsheet_id: String,
    pub token: TokenSource,
    pub api_base: String,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetInfo {
    #[serde(default)]
    sheets: Vec<SheetInfo>,
}

#[derive(Debug, Deserialize)]
struct SheetInfo {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

pub struct SheetsLedger {
    client: Client,
    base_url: String,
    token: TokenProvider,
    verified_at: Mutex<Option<Instant>>,
}

impl SheetsLedger {
    pub fn new(config: SheetsConfig) -> LedgerResult<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        let base_url = format!(
            "{}/{}",
            config.api_base.trim_end_matches('/'),
            config.spreadsheet_id
        );
        Ok(Self {
            client,
            base_url,
            token: TokenProvider::new(config.token),
            verified_at: Mutex::new(None),
        })
    }

    // ==================== HTTP plumbing ====================

    async fn send(&self, request: RequestBuilder) -> LedgerResult<reqwest::Response> {
        let token = self.token.token().await?;
        let result = request.bearer_auth(token).send().await;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                self.invalidate().await;
                return Err(e.into());
            }
        };

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        self.invalidate().await;
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .map(|b| b.error.message)
            .unwrap_or(body);
        Err(LedgerError::Api {
            status: status.as_u16(),
            message,
        })
    }

    /// Drop cached token and sheet check after a failure
    async fn invalidate(&self) {
        self.token.invalidate().await;
        *self.verified_at.lock().await = None;
    }

    async fn sheet_titles(&self) -> LedgerResult<Vec<String>> {
        let request = self
            .client
            .get(&self.base_url)
            .query(&[("fields", "sheets.properties.title")]);
        let info: SpreadsheetInfo = self.send(request).await?.json().await?;
        Ok(info.sheets.into_iter().map(|s| s.properties.title).collect())
    }

    async fn add_sheet(&self, spec: SheetSpec) -> LedgerResult<()> {
        tracing::info!(sheet = spec.title, "Creating missing sheet");
        let body = json!({
            "requests": [{ "addSheet": { "properties": { "title": spec.title } } }]
        });
        let request = self
            .client
            .post(format!("{}:batchUpdate", self.base_url))
            .json(&body);
        self.send(request).await?;

        let headers: Vec<Value> = spec.headers.iter().map(|h| json!(h)).collect();
        self.write_row(spec, 1, headers).await
    }

    async fn append_row(&self, spec: SheetSpec, values: Vec<Value>) -> LedgerResult<()> {
        let request = self
            .client
            .post(format!("{}/values/{}!A1:append", self.base_url, spec.title))
            .query(&[
                ("valueInputOption", "RAW"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .json(&json!({ "values": [values] }));
        self.send(request).await?;
        Ok(())
    }

    /// Overwrite a row; `row_number` is 1-based like the sheet UI
    async fn write_row(&self, spec: SheetSpec, row_number: usize, values: Vec<Value>) -> LedgerResult<()> {
        let request = self
            .client
            .put(format!("{}/values/{}!A{row_number}", self.base_url, spec.title))
            .query(&[("valueInputOption", "RAW")])
            .json(&json!({ "values": [values] }));
        self.send(request).await?;
        Ok(())
    }

    /// Data rows (header excluded) as strings
    async fn read_rows(&self, spec: SheetSpec) -> LedgerResult<Vec<Row>> {
        let request = self
            .client
            .get(format!("{}/values/{}!A2:Z", self.base_url, spec.title));
        let range: ValueRange = self.send(request).await?.json().await?;
        Ok(range
            .values
            .iter()
            .map(|row| row.iter().map(rows::cell_to_string).collect())
            .collect())
    }

    // ==================== Sheet management ====================

    async fn ensure_sheets(&self, force: bool) -> LedgerResult<()> {
        if !force {
            if let Some(verified_at) = *self.verified_at.lock().await {
                if verified_at.elapsed() < VERIFIED_TTL {
                    return Ok(());
                }
            }
        }

        let titles = self.sheet_titles().await?;
        for spec in ALL_SHEETS {
            if !titles.iter().any(|t| t == spec.title) {
                self.add_sheet(spec).await?;
            }
        }

        *self.verified_at.lock().await = Some(Instant::now());
        Ok(())
    }

    /// Parse rows, skipping the ones that do not parse
    fn parse_rows<T>(
        spec: SheetSpec,
        rows: &[Row],
        parse: impl Fn(&[String]) -> LedgerResult<T>,
    ) -> Vec<T> {
        rows.iter()
            .filter(|row| row.iter().any(|c| !c.trim().is_empty()))
            .filter_map(|row| match parse(row.as_slice()) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!(sheet = spec.title, error = %e, "Skipping unreadable row");
                    None
                }
            })
            .collect()
    }

    async fn incomes_of(&self, phone: &str) -> LedgerResult<Vec<IncomeRecord>> {
        self.ensure_sheets(false).await?;
        let rows = self.read_rows(INCOMES).await?;
        Ok(Self::parse_rows(INCOMES, &rows, rows::income_from_row)
            .into_iter()
            .filter(|income| same_phone(&income.phone, phone))
            .collect())
    }

    /// Mirror a value onto the user's row once the main record is stored.
    /// Failures are logged only; the record itself already succeeded.
    async fn sync_user_column(&self, phone: &str, column: usize, value: Value) {
        if let Err(e) = self.update_user_column(phone, column, value).await {
            tracing::warn!(%phone, column, error = %e, "Failed to update user row");
        }
    }

    /// Rewrite one column of the user's row, if the user is registered
    async fn update_user_column(&self, phone: &str, column: usize, value: Value) -> LedgerResult<()> {
        let rows = self.read_rows(USERS).await?;
        let Some(index) = rows
            .iter()
            .position(|row| row.first().is_some_and(|p| same_phone(p, phone)))
        else {
            return Ok(());
        };

        let mut values = rows::row_to_values(&rows[index], USERS.headers.len());
        values[column] = value;
        self.write_row(USERS, index + 2, values).await
    }
}

#[async_trait]
impl Ledger for SheetsLedger {
    fn backend_name(&self) -> &'static str {
        "sheets"
    }

    async fn verify(&self) -> LedgerResult<()> {
        self.ensure_sheets(true).await
    }

    async fn record_income(&self, income: &IncomeRecord) -> LedgerResult<()> {
        self.ensure_sheets(false).await?;
        self.append_row(INCOMES, rows::income_to_row(income)).await?;
        if income.is_salary() {
            self.sync_user_column(&income.phone, rows::USER_SALARY_COLUMN, json!(income.amount))
                .await;
        }
        Ok(())
    }

    async fn record_expense(&self, expense: &ExpenseRecord) -> LedgerResult<()> {
        self.ensure_sheets(false).await?;
        self.append_row(EXPENSES, rows::expense_to_row(expense)).await
    }

    async fn fetch_monthly_expenses(
        &self,
        phone: &str,
        month: Month,
    ) -> LedgerResult<Vec<ExpenseRecord>> {
        let link = self.fetch_partner_link(phone).await?;
        let phones = report_phones(phone, link.as_ref());

        let rows = self.read_rows(EXPENSES).await?;
        Ok(Self::parse_rows(EXPENSES, &rows, rows::expense_from_row)
            .into_iter()
            .filter(|e| phones.iter().any(|p| same_phone(p, &e.phone)))
            .filter(|e| month.contains(&e.timestamp))
            .collect())
    }

    async fn fetch_monthly_income(
        &self,
        phone: &str,
        month: Month,
    ) -> LedgerResult<Vec<IncomeRecord>> {
        Ok(self
            .incomes_of(phone)
            .await?
            .into_iter()
            .filter(|income| month.contains(&income.timestamp))
            .collect())
    }

    async fn latest_income(&self, phone: &str) -> LedgerResult<Option<IncomeRecord>> {
        // Rows are appended, so the last matching row is the latest one
        Ok(self.incomes_of(phone).await?.pop())
    }

    async fn link_partner(&self, link: &PartnerLink) -> LedgerResult<()> {
        self.ensure_sheets(false).await?;
        let rows = self.read_rows(PARTNERS).await?;
        let existing = rows
            .iter()
            .position(|row| row.first().is_some_and(|p| same_phone(p, &link.phone)));

        let values = rows::partner_to_row(link);
        match existing {
            Some(index) => self.write_row(PARTNERS, index + 2, values).await?,
            None => self.append_row(PARTNERS, values).await?,
        }

        self.sync_user_column(&link.phone, rows::USER_PARTNER_COLUMN, json!(link.partner_phone))
            .await;
        Ok(())
    }

    async fn fetch_partner_link(&self, phone: &str) -> LedgerResult<Option<PartnerLink>> {
        self.ensure_sheets(false).await?;
        let rows = self.read_rows(PARTNERS).await?;
        Ok(Self::parse_rows(PARTNERS, &rows, rows::partner_from_row)
            .into_iter()
            .find(|link| same_phone(&link.phone, phone)))
    }

    async fn register_user(&self, profile: &UserProfile) -> LedgerResult<()> {
        self.ensure_sheets(false).await?;
        let rows = self.read_rows(USERS).await?;
        if rows
            .iter()
            .any(|row| row.first().is_some_and(|p| same_phone(p, &profile.phone)))
        {
            return Ok(());
        }
        let created_at = Local::now().naive_local();
        self.append_row(USERS, rows::user_to_row(profile, &created_at)).await
    }

    async fn stats(&self) -> LedgerResult<LedgerStats> {
        self.ensure_sheets(false).await?;
        Ok(LedgerStats {
            incomes: self.read_rows(INCOMES).await?.len(),
            expenses: self.read_rows(EXPENSES).await?.len(),
            partner_links: self.read_rows(PARTNERS).await?.len(),
            users: self.read_rows(USERS).await?.len(),
        })
    }
}
