//! Parsing of free-text user input

use crate::ledger::Category;
use crate::money::{parse_amount, AmountPolicy};
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

const RESET_KEYWORDS: [&str; 2] = ["menu", "menú"];

pub const MIN_PARTNER_NAME_CHARS: usize = 2;
pub const MIN_QUICK_DESCRIPTION_CHARS: usize = 2;

/// `menu` (or `menú`) in any case, surrounding whitespace ignored
pub fn is_reset_keyword(text: &str) -> bool {
    let normalized = text.trim().to_lowercase();
    RESET_KEYWORDS.contains(&normalized.as_str())
}

/// Main menu entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuOption {
    Salary,
    SharedExpense,
    IndividualExpense,
    ExpensesReport,
    ConfigurePartner,
    MonthlySummary,
    QuickExpense,
}

impl MenuOption {
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim() {
            "1" => Some(MenuOption::Salary),
            "2" => Some(MenuOption::SharedExpense),
            "3" => Some(MenuOption::IndividualExpense),
            "4" => Some(MenuOption::ExpensesReport),
            "5" => Some(MenuOption::ConfigurePartner),
            "6" => Some(MenuOption::MonthlySummary),
            "7" => Some(MenuOption::QuickExpense),
            _ => None,
        }
    }
}

/// Trimmed description, `None` when nothing is left
pub fn parse_description(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

pub fn parse_partner_name(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (trimmed.chars().count() >= MIN_PARTNER_NAME_CHARS).then(|| trimmed.to_string())
}

fn phone_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^\+?\d{8,15}$").ok())
        .as_ref()
}

/// Phone number with separators removed, `None` if it doesn't look like one
pub fn parse_partner_phone(text: &str) -> Option<String> {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '.' | '(' | ')'))
        .collect();
    phone_pattern()?
        .is_match(&cleaned)
        .then_some(cleaned)
}

// ============================================================================
// Quick expense
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuickExpense {
    pub amount: u64,
    pub description: String,
    pub category: Category,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuickExpenseError {
    #[error("expected: amount description category")]
    Usage,
    #[error("invalid amount")]
    Amount,
    #[error("description too short")]
    Description,
    #[error("unknown category {0:?}")]
    Category(String),
}

/// Parse `amount description... category` from a single message
pub fn parse_quick_expense(
    text: &str,
    policy: AmountPolicy,
) -> Result<QuickExpense, QuickExpenseError> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let [first, middle @ .., last] = tokens.as_slice() else {
        return Err(QuickExpenseError::Usage);
    };
    if middle.is_empty() {
        return Err(QuickExpenseError::Usage);
    }

    let amount = parse_amount(first, policy).map_err(|_| QuickExpenseError::Amount)?;

    let description = middle.join(" ");
    if description.chars().count() < MIN_QUICK_DESCRIPTION_CHARS {
        return Err(QuickExpenseError::Description);
    }

    let category =
        Category::parse(last).ok_or_else(|| QuickExpenseError::Category((*last).to_string()))?;

    Ok(QuickExpense {
        amount,
        description,
        category,
    })
}
