//! SQLite-backed ledger
//!
//! Default backend for local runs and tests. Phones are stored both as
//! received and as digits-only keys so lookups use exact equality.

use super::{
    normalize_phone, report_phones, Category, ExpenseRecord, IncomeRecord, Ledger, LedgerError,
    LedgerResult, LedgerStats, Month, PartnerLink, SharingType, UserProfile,
};
use async_trait::async_trait;
use chrono::{Local, NaiveDateTime};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// SQL schema for initialization
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS incomes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    recorded_at TEXT NOT NULL,
    phone TEXT NOT NULL,
    phone_key TEXT NOT NULL,
    amount INTEGER NOT NULL,
    description TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_incomes_phone ON incomes(phone_key, recorded_at);

CREATE TABLE IF NOT EXISTS expenses (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    recorded_at TEXT NOT NULL,
    phone TEXT NOT NULL,
    phone_key TEXT NOT NULL,
    amount INTEGER NOT NULL,
    description TEXT NOT NULL,
    sharing TEXT NOT NULL,
    share_percentage INTEGER NOT NULL DEFAULT 50,
    category TEXT
);

CREATE INDEX IF NOT EXISTS idx_expenses_phone ON expenses(phone_key, recorded_at);

CREATE TABLE IF NOT EXISTS partner_links (
    phone_key TEXT PRIMARY KEY,
    phone TEXT NOT NULL,
    partner_name TEXT NOT NULL,
    partner_phone TEXT NOT NULL,
    configured_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS users (
    phone_key TEXT PRIMARY KEY,
    phone TEXT NOT NULL,
    name TEXT NOT NULL,
    salary INTEGER,
    partner_phone TEXT,
    created_at TEXT NOT NULL
);
";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn format_timestamp(timestamp: &NaiveDateTime) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

fn parse_timestamp(table: &'static str, value: &str) -> LedgerResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT).map_err(|e| {
        LedgerError::MalformedRow {
            table,
            reason: format!("bad timestamp {value:?}: {e}"),
        }
    })
}

fn month_pattern(month: Month) -> String {
    format!("{:04}-{:02}-%", month.year, month.month)
}

fn to_sql_amount(amount: u64) -> LedgerResult<i64> {
    i64::try_from(amount).map_err(|_| LedgerError::MalformedRow {
        table: "amount",
        reason: format!("amount {amount} does not fit in storage"),
    })
}

fn from_sql_amount(table: &'static str, amount: i64) -> LedgerResult<u64> {
    u64::try_from(amount).map_err(|_| LedgerError::MalformedRow {
        table,
        reason: format!("negative amount {amount}"),
    })
}

type ExpenseRow = (String, String, i64, String, String, i64, Option<String>);

fn expense_from_row(row: ExpenseRow) -> LedgerResult<ExpenseRecord> {
    let (recorded_at, phone, amount, description, sharing, share_percentage, category) = row;
    Ok(ExpenseRecord {
        timestamp: parse_timestamp("expenses", &recorded_at)?,
        phone,
        amount: from_sql_amount("expenses", amount)?,
        description,
        category: category.as_deref().and_then(Category::parse),
        sharing: SharingType::parse(&sharing),
        share_percentage: u8::try_from(share_percentage).unwrap_or(super::DEFAULT_SHARE_PERCENTAGE),
    })
}

type IncomeRow = (String, String, i64, String);

fn income_from_row(row: IncomeRow) -> LedgerResult<IncomeRecord> {
    let (recorded_at, phone, amount, description) = row;
    Ok(IncomeRecord {
        timestamp: parse_timestamp("incomes", &recorded_at)?,
        phone,
        amount: from_sql_amount("incomes", amount)?,
        description,
    })
}

/// Thread-safe SQLite ledger handle
#[derive(Clone)]
pub struct SqliteLedger {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteLedger {
    /// Open or create the ledger at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> LedgerResult<Self> {
        let conn = Connection::open(path)?;
        let ledger = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        ledger.run_migrations()?;
        Ok(ledger)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> LedgerResult<Self> {
        let conn = Connection::open_in_memory()?;
        let ledger = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        ledger.run_migrations()?;
        Ok(ledger)
    }

    fn conn(&self) -> LedgerResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| LedgerError::Unavailable("connection lock poisoned".to_string()))
    }

    fn run_migrations(&self) -> LedgerResult<()> {
        self.conn()?.execute_batch(SCHEMA)?;
        Ok(())
    }

    // ==================== Writes ====================

    fn insert_income(&self, income: &IncomeRecord) -> LedgerResult<()> {
        let mut conn = self.conn()?;
        let phone_key = normalize_phone(&income.phone);
        let amount = to_sql_amount(income.amount)?;
        // Income row and user salary land together or not at all
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO incomes (recorded_at, phone, phone_key, amount, description)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                format_timestamp(&income.timestamp),
                income.phone,
                phone_key,
                amount,
                income.description
            ],
        )?;

        if income.is_salary() {
            tx.execute(
                "UPDATE users SET salary = ?1 WHERE phone_key = ?2",
                params![amount, phone_key],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn insert_expense(&self, expense: &ExpenseRecord) -> LedgerResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO expenses (recorded_at, phone, phone_key, amount, description, sharing, share_percentage, category)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                format_timestamp(&expense.timestamp),
                expense.phone,
                normalize_phone(&expense.phone),
                to_sql_amount(expense.amount)?,
                expense.description,
                expense.sharing.as_str(),
                i64::from(expense.share_percentage),
                expense.category.map(Category::as_str),
            ],
        )?;
        Ok(())
    }

    fn upsert_partner_link(&self, link: &PartnerLink) -> LedgerResult<()> {
        let mut conn = self.conn()?;
        let phone_key = normalize_phone(&link.phone);
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO partner_links (phone_key, phone, partner_name, partner_phone, configured_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(phone_key) DO UPDATE SET
                phone = excluded.phone,
                partner_name = excluded.partner_name,
                partner_phone = excluded.partner_phone,
                configured_at = excluded.configured_at",
            params![
                phone_key,
                link.phone,
                link.partner_name,
                link.partner_phone,
                format_timestamp(&link.configured_at)
            ],
        )?;
        tx.execute(
            "UPDATE users SET partner_phone = ?1 WHERE phone_key = ?2",
            params![link.partner_phone, phone_key],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn insert_user(&self, profile: &UserProfile) -> LedgerResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO users (phone_key, phone, name, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                normalize_phone(&profile.phone),
                profile.phone,
                profile.name,
                format_timestamp(&Local::now().naive_local())
            ],
        )?;
        Ok(())
    }

    // ==================== Reads ====================

    fn select_partner_link(&self, phone: &str) -> LedgerResult<Option<PartnerLink>> {
        let conn = self.conn()?;
        let row: Option<(String, String, String, String)> = conn
            .query_row(
                "SELECT phone, partner_name, partner_phone, configured_at
                 FROM partner_links WHERE phone_key = ?1",
                params![normalize_phone(phone)],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;

        row.map(|(phone, partner_name, partner_phone, configured_at)| {
            Ok(PartnerLink {
                phone,
                partner_name,
                partner_phone,
                configured_at: parse_timestamp("partner_links", &configured_at)?,
            })
        })
        .transpose()
    }

    fn select_expenses(&self, phone_keys: &[String], month: Month) -> LedgerResult<Vec<ExpenseRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT recorded_at, phone, amount, description, sharing, share_percentage, category
             FROM expenses
             WHERE phone_key = ?1 AND recorded_at LIKE ?2
             ORDER BY recorded_at, id",
        )?;

        let pattern = month_pattern(month);
        let mut expenses = Vec::new();
        for key in phone_keys {
            let rows = stmt.query_map(params![key, pattern], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                ))
            })?;
            for row in rows {
                expenses.push(expense_from_row(row?)?);
            }
        }

        expenses.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(expenses)
    }

    fn select_incomes(&self, phone: &str, month: Option<Month>) -> LedgerResult<Vec<IncomeRecord>> {
        let conn = self.conn()?;
        let pattern = month.map_or_else(|| "%".to_string(), month_pattern);
        let mut stmt = conn.prepare(
            "SELECT recorded_at, phone, amount, description
             FROM incomes
             WHERE phone_key = ?1 AND recorded_at LIKE ?2
             ORDER BY recorded_at, id",
        )?;
        let rows = stmt.query_map(params![normalize_phone(phone), pattern], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        })?;

        let incomes = rows
            .map(|row| income_from_row(row?))
            .collect::<LedgerResult<Vec<_>>>()?;
        Ok(incomes)
    }

    fn count(&self, table: &str) -> LedgerResult<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

#[async_trait]
impl Ledger for SqliteLedger {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn verify(&self) -> LedgerResult<()> {
        self.run_migrations()
    }

    async fn record_income(&self, income: &IncomeRecord) -> LedgerResult<()> {
        self.insert_income(income)
    }

    async fn record_expense(&self, expense: &ExpenseRecord) -> LedgerResult<()> {
        self.insert_expense(expense)
    }

    async fn fetch_monthly_expenses(
        &self,
        phone: &str,
        month: Month,
    ) -> LedgerResult<Vec<ExpenseRecord>> {
        let link = self.select_partner_link(phone)?;
        let phones = report_phones(phone, link.as_ref());
        self.select_expenses(&phones, month)
    }

    async fn fetch_monthly_income(
        &self,
        phone: &str,
        month: Month,
    ) -> LedgerResult<Vec<IncomeRecord>> {
        self.select_incomes(phone, Some(month))
    }

    async fn latest_income(&self, phone: &str) -> LedgerResult<Option<IncomeRecord>> {
        Ok(self.select_incomes(phone, None)?.pop())
    }

    async fn link_partner(&self, link: &PartnerLink) -> LedgerResult<()> {
        self.upsert_partner_link(link)
    }

    async fn fetch_partner_link(&self, phone: &str) -> LedgerResult<Option<PartnerLink>> {
        self.select_partner_link(phone)
    }

    async fn register_user(&self, profile: &UserProfile) -> LedgerResult<()> {
        self.insert_user(profile)
    }

    async fn stats(&self) -> LedgerResult<LedgerStats> {
        Ok(LedgerStats {
            incomes: self.count("incomes")?,
            expenses: self.count("expenses")?,
            partner_links: self.count("partner_links")?,
            users: self.count("users")?,
        })
    }
}
