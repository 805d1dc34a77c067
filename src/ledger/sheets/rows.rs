//! Sheet layouts and row conversion
//!
//! Cells are written raw and read back as formatted strings, so every reader
//! here is lenient: amounts accept grouping separators, missing columns get
//! the same defaults older rows were written with.

use crate::ledger::{
    Category, ExpenseRecord, IncomeRecord, LedgerError, LedgerResult, PartnerLink, SharingType,
    UserProfile, DEFAULT_SHARE_PERCENTAGE,
};
use crate::money::parse_digits;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::{json, Value};

/// A sheet and its header row
#[derive(Debug, Clone, Copy)]
pub struct SheetSpec {
    pub title: &'static str,
    pub headers: &'static [&'static str],
}

pub const INCOMES: SheetSpec = SheetSpec {
    title: "ingresos",
    headers: &["fecha", "telefono", "monto", "descripcion"],
};

pub const EXPENSES: SheetSpec = SheetSpec {
    title: "gastos",
    headers: &[
        "fecha",
        "telefono",
        "monto",
        "descripcion",
        "tipo",
        "porcentaje",
        "categoria",
    ],
};

pub const PARTNERS: SheetSpec = SheetSpec {
    title: "parejas",
    headers: &["telefono", "nombre_pareja", "telefono_pareja", "fecha_config"],
};

pub const USERS: SheetSpec = SheetSpec {
    title: "usuarios",
    headers: &["telefono", "nombre", "sueldo", "telefono_pareja", "fecha_creacion"],
};

pub const ALL_SHEETS: [SheetSpec; 4] = [INCOMES, EXPENSES, PARTNERS, USERS];

/// Column index of `sueldo` in the users sheet
pub const USER_SALARY_COLUMN: usize = 2;
/// Column index of `telefono_pareja` in the users sheet
pub const USER_PARTNER_COLUMN: usize = 3;

const DATE_FORMAT: &str = "%d/%m/%Y";
const TIME_FORMAT: &str = "%H:%M:%S";

pub type Row = Vec<String>;

/// Render a timestamp the way the sheets store it: `dd/mm/yyyy HH:MM:SS`
pub fn format_sheet_timestamp(timestamp: &NaiveDateTime) -> String {
    format!(
        "{} {}",
        timestamp.format(DATE_FORMAT),
        timestamp.format(TIME_FORMAT)
    )
}

/// Parse a sheet date cell; the time part is optional
pub fn parse_sheet_timestamp(value: &str) -> Option<NaiveDateTime> {
    let mut parts = value.trim().splitn(2, ' ');
    let date = NaiveDate::parse_from_str(parts.next()?, DATE_FORMAT).ok()?;
    let time = parts
        .next()
        .and_then(|t| NaiveTime::parse_from_str(t.trim(), TIME_FORMAT).ok())
        .unwrap_or(NaiveTime::MIN);
    Some(date.and_time(time))
}

/// Convert an API cell value to the string the rest of the code works with
pub fn cell_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn cell(row: &[String], index: usize) -> &str {
    row.get(index).map_or("", |s| s.trim())
}

fn malformed(table: &'static str, reason: impl Into<String>) -> LedgerError {
    LedgerError::MalformedRow {
        table,
        reason: reason.into(),
    }
}

fn parse_timestamp_cell(table: &'static str, value: &str) -> LedgerResult<NaiveDateTime> {
    parse_sheet_timestamp(value).ok_or_else(|| malformed(table, format!("bad date {value:?}")))
}

fn parse_amount_cell(value: &str) -> u64 {
    parse_digits(value).unwrap_or(0)
}

// ============================================================================
// Incomes
// ============================================================================

pub fn income_to_row(income: &IncomeRecord) -> Vec<Value> {
    vec![
        json!(format_sheet_timestamp(&income.timestamp)),
        json!(income.phone),
        json!(income.amount),
        json!(income.description),
    ]
}

pub fn income_from_row(row: &[String]) -> LedgerResult<IncomeRecord> {
    Ok(IncomeRecord {
        timestamp: parse_timestamp_cell(INCOMES.title, cell(row, 0))?,
        phone: cell(row, 1).to_string(),
        amount: parse_amount_cell(cell(row, 2)),
        description: cell(row, 3).to_string(),
    })
}

// ============================================================================
// Expenses
// ============================================================================

pub fn expense_to_row(expense: &ExpenseRecord) -> Vec<Value> {
    vec![
        json!(format_sheet_timestamp(&expense.timestamp)),
        json!(expense.phone),
        json!(expense.amount),
        json!(expense.description),
        json!(expense.sharing.as_str()),
        json!(expense.share_percentage),
        json!(expense.category.map_or("", Category::as_str)),
    ]
}

pub fn expense_from_row(row: &[String]) -> LedgerResult<ExpenseRecord> {
    let description = match cell(row, 3) {
        "" => "Sin descripción".to_string(),
        d => d.to_string(),
    };
    let share_percentage = cell(row, 5)
        .parse::<u8>()
        .ok()
        .filter(|p| *p <= 100)
        .unwrap_or(DEFAULT_SHARE_PERCENTAGE);

    Ok(ExpenseRecord {
        timestamp: parse_timestamp_cell(EXPENSES.title, cell(row, 0))?,
        phone: cell(row, 1).to_string(),
        amount: parse_amount_cell(cell(row, 2)),
        description,
        category: Category::parse(cell(row, 6)),
        sharing: SharingType::parse(cell(row, 4)),
        share_percentage,
    })
}

// ============================================================================
// Partner links
// ============================================================================

pub fn partner_to_row(link: &PartnerLink) -> Vec<Value> {
    vec![
        json!(link.phone),
        json!(link.partner_name),
        json!(link.partner_phone),
        json!(format_sheet_timestamp(&link.configured_at)),
    ]
}

pub fn partner_from_row(row: &[String]) -> LedgerResult<PartnerLink> {
    if cell(row, 2).is_empty() {
        return Err(malformed(PARTNERS.title, "missing partner phone"));
    }
    Ok(PartnerLink {
        phone: cell(row, 0).to_string(),
        partner_name: cell(row, 1).to_string(),
        partner_phone: cell(row, 2).to_string(),
        configured_at: parse_timestamp_cell(PARTNERS.title, cell(row, 3))?,
    })
}

// ============================================================================
// Users
// ============================================================================

pub fn user_to_row(profile: &UserProfile, created_at: &NaiveDateTime) -> Vec<Value> {
    vec![
        json!(profile.phone),
        json!(profile.name),
        json!(""),
        json!(""),
        json!(format_sheet_timestamp(created_at)),
    ]
}

/// Existing user row as API values, padded to the full header width
pub fn row_to_values(row: &[String], width: usize) -> Vec<Value> {
    (0..width).map(|i| json!(cell(row, i))).collect()
}
