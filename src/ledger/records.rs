//! Ledger record types

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Description stored with salary incomes
pub const SALARY_LABEL: &str = "Sueldo";

/// Share of a shared expense owed by each party unless stated otherwise
pub const DEFAULT_SHARE_PERCENTAGE: u8 = 50;

/// Prefix the messaging transport puts in front of sender ids
const TRANSPORT_PREFIX: &str = "whatsapp:";

/// Sender id with the transport prefix removed, e.g. `+5491123456789`
pub fn canonical_phone(sender: &str) -> String {
    let trimmed = sender.trim();
    trimmed
        .strip_prefix(TRANSPORT_PREFIX)
        .unwrap_or(trimmed)
        .trim()
        .to_string()
}

/// Digits-only form used to compare phones across records
pub fn normalize_phone(phone: &str) -> String {
    canonical_phone(phone)
        .chars()
        .filter(char::is_ascii_digit)
        .collect()
}

/// Whether two phone strings denote the same number
pub fn same_phone(a: &str, b: &str) -> bool {
    let a = normalize_phone(a);
    !a.is_empty() && a == normalize_phone(b)
}

// ============================================================================
// Calendar month
// ============================================================================

/// A calendar month; filtering compares year and month only
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Month {
    pub year: i32,
    pub month: u32,
}

impl Month {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn contains(&self, timestamp: &NaiveDateTime) -> bool {
        timestamp.year() == self.year && timestamp.month() == self.month
    }
}

// ============================================================================
// Expense classification
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SharingType {
    #[serde(rename = "compartido")]
    Shared,
    #[serde(rename = "individual")]
    Individual,
}

impl SharingType {
    pub fn as_str(self) -> &'static str {
        match self {
            SharingType::Shared => "compartido",
            SharingType::Individual => "individual",
        }
    }

    /// Unknown or empty values fall back to individual
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "compartido" | "shared" => SharingType::Shared,
            _ => SharingType::Individual,
        }
    }
}

impl fmt::Display for SharingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed set of categories accepted by the quick-expense flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Comida,
    Supermercado,
    Transporte,
    Servicios,
    Salud,
    Hogar,
    Ocio,
    Ropa,
    Educacion,
    Otros,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Category::Comida,
        Category::Supermercado,
        Category::Transporte,
        Category::Servicios,
        Category::Salud,
        Category::Hogar,
        Category::Ocio,
        Category::Ropa,
        Category::Educacion,
        Category::Otros,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Comida => "comida",
            Category::Supermercado => "supermercado",
            Category::Transporte => "transporte",
            Category::Servicios => "servicios",
            Category::Salud => "salud",
            Category::Hogar => "hogar",
            Category::Ocio => "ocio",
            Category::Ropa => "ropa",
            Category::Educacion => "educacion",
            Category::Otros => "otros",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_lowercase();
        match value.as_str() {
            "educación" => Some(Category::Educacion),
            "súper" | "super" => Some(Category::Supermercado),
            _ => Self::ALL.into_iter().find(|c| c.as_str() == value),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Records
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomeRecord {
    pub timestamp: NaiveDateTime,
    pub phone: String,
    pub amount: u64,
    pub description: String,
}

impl IncomeRecord {
    pub fn is_salary(&self) -> bool {
        self.description == SALARY_LABEL
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseRecord {
    pub timestamp: NaiveDateTime,
    pub phone: String,
    pub amount: u64,
    pub description: String,
    pub category: Option<Category>,
    pub sharing: SharingType,
    pub share_percentage: u8,
}

impl ExpenseRecord {
    /// Part of this expense owed by one party (zero for individual expenses)
    pub fn party_share(&self) -> u64 {
        match self.sharing {
            SharingType::Shared => {
                let share = u128::from(self.amount) * u128::from(self.share_percentage) / 100;
                u64::try_from(share).unwrap_or(u64::MAX)
            }
            SharingType::Individual => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartnerLink {
    pub phone: String,
    pub partner_name: String,
    pub partner_phone: String,
    pub configured_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub phone: String,
    pub name: String,
}
