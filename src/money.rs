//! Amount parsing, validation and display
//!
//! Amounts are whole currency units. Users type them with `.`, `,` or spaces
//! as grouping separators ("1.400.000", "1,400,000", "1 400 000"); replies
//! always render them with `.` every three digits.

use thiserror::Error;

/// Smallest amount accepted by the amount prompts
pub const DEFAULT_MIN_AMOUNT: u64 = 1;

/// Largest amount accepted by the amount prompts (guards against a phone
/// number typed into an amount field)
pub const DEFAULT_MAX_AMOUNT: u64 = 100_000_000;

/// Inclusive bounds for user-entered amounts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmountPolicy {
    pub min: u64,
    pub max: u64,
}

impl Default for AmountPolicy {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN_AMOUNT,
            max: DEFAULT_MAX_AMOUNT,
        }
    }
}

impl AmountPolicy {
    pub fn new(min: u64, max: u64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, amount: u64) -> bool {
        (self.min..=self.max).contains(&amount)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,
    #[error("amount contains non-digit characters")]
    NotNumeric,
    #[error("amount is outside the accepted range")]
    OutOfRange,
}

/// Strip grouping separators (whitespace, `.` and `,`) from raw input
fn strip_separators(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace() && *c != '.' && *c != ',')
        .collect()
}

/// Parse the digits of a grouped number without applying any bounds
pub fn parse_digits(text: &str) -> Result<u64, AmountError> {
    let clean = strip_separators(text);
    if clean.is_empty() {
        return Err(AmountError::Empty);
    }
    if !clean.chars().all(|c| c.is_ascii_digit()) {
        return Err(AmountError::NotNumeric);
    }
    // All-digit input that still fails to parse can only have overflowed
    clean.parse::<u64>().map_err(|_| AmountError::OutOfRange)
}

/// Parse a user-entered amount and check it against the policy
pub fn parse_amount(text: &str, policy: AmountPolicy) -> Result<u64, AmountError> {
    let amount = parse_digits(text)?;
    if policy.contains(amount) {
        Ok(amount)
    } else {
        Err(AmountError::OutOfRange)
    }
}

#[cfg(test)]
pub fn is_valid_amount(text: &str, policy: AmountPolicy) -> bool {
    parse_amount(text, policy).is_ok()
}

/// Render an amount with `.` as thousands separator (1400000 -> "1.400.000")
pub fn format_number(value: u64) -> String {
    let digits = value.to_string();
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push('.');
        }
        out.push(c);
    }
    out
}

/// Same as [`format_number`] with a leading `-` for negative values
pub fn format_signed(value: i64) -> String {
    if value < 0 {
        format!("-{}", format_number(value.unsigned_abs()))
    } else {
        format_number(value.unsigned_abs())
    }
}
