//! Environment configuration

use crate::ledger::sheets::{SheetsConfig, TokenSource, DEFAULT_API_BASE};
use crate::money::{AmountPolicy, DEFAULT_MAX_AMOUNT, DEFAULT_MIN_AMOUNT};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_IDLE_MINUTES: u64 = 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} is not a valid value: {value:?}")]
    Invalid { name: &'static str, value: String },
    #[error("Unknown LEDGER_BACKEND {0:?} (expected sqlite or sheets)")]
    UnknownBackend(String),
    #[error("GOOGLE_SHEETS_ID is required for the sheets backend")]
    MissingSpreadsheetId,
    #[error("Set GOOGLE_SHEETS_ACCESS_TOKEN or GOOGLE_SHEETS_TOKEN_COMMAND for the sheets backend")]
    MissingToken,
    #[error("MIN_AMOUNT ({min}) must not exceed MAX_AMOUNT ({max})")]
    EmptyAmountRange { min: u64, max: u64 },
}

/// Where records are kept
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerBackend {
    Sqlite { path: PathBuf },
    Sheets(SheetsConfig),
}

impl LedgerBackend {
    pub fn name(&self) -> &'static str {
        match self {
            LedgerBackend::Sqlite { .. } => "sqlite",
            LedgerBackend::Sheets(_) => "sheets",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotConfig {
    pub port: u16,
    pub backend: LedgerBackend,
    pub policy: AmountPolicy,
    /// Sessions idle this long are dropped
    pub session_idle: Duration,
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; blank values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port = parse_var(&var, "PORT")?.unwrap_or(DEFAULT_PORT);
        let min = parse_var(&var, "MIN_AMOUNT")?.unwrap_or(DEFAULT_MIN_AMOUNT);
        let max = parse_var(&var, "MAX_AMOUNT")?.unwrap_or(DEFAULT_MAX_AMOUNT);
        if min > max {
            return Err(ConfigError::EmptyAmountRange { min, max });
        }
        let idle_minutes: u64 = parse_var(&var, "SESSION_IDLE_MINUTES")?.unwrap_or(DEFAULT_IDLE_MINUTES);
        let idle_secs = idle_minutes
            .checked_mul(60)
            .ok_or_else(|| ConfigError::Invalid {
                name: "SESSION_IDLE_MINUTES",
                value: idle_minutes.to_string(),
            })?;

        let spreadsheet_id = var("GOOGLE_SHEETS_ID");
        let backend_name = var("LEDGER_BACKEND")
            .map(|b| b.to_lowercase())
            .unwrap_or_else(|| {
                let default = if spreadsheet_id.is_some() { "sheets" } else { "sqlite" };
                default.to_string()
            });

        let backend = match backend_name.as_str() {
            "sqlite" => LedgerBackend::Sqlite {
                path: var("FINANCE_DB_PATH").map_or_else(
                    || {
                        let home = var("HOME").unwrap_or_else(|| "/tmp".to_string());
                        PathBuf::from(format!("{home}/.finance-bot/finance.db"))
                    },
                    PathBuf::from,
                ),
            },
            "sheets" => {
                let spreadsheet_id = spreadsheet_id.ok_or(ConfigError::MissingSpreadsheetId)?;
                let token = match (var("GOOGLE_SHEETS_ACCESS_TOKEN"), var("GOOGLE_SHEETS_TOKEN_COMMAND")) {
                    (Some(token), _) => TokenSource::Static(token),
                    (None, Some(command)) => TokenSource::Command(command),
                    (None, None) => return Err(ConfigError::MissingToken),
                };
                LedgerBackend::Sheets(SheetsConfig {
                    spreadsheet_id,
                    token,
                    api_base: var("GOOGLE_SHEETS_API_BASE")
                        .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
                })
            }
            other => return Err(ConfigError::UnknownBackend(other.to_string())),
        };

        Ok(Self {
            port,
            backend,
            policy: AmountPolicy::new(min, max),
            session_idle: Duration::from_secs(idle_secs),
        })
    }
}

fn parse_var<T: std::str::FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError> {
    var(name)
        .map(|value| {
            value
                .parse()
                .map_err(|_| ConfigError::Invalid { name, value })
        })
        .transpose()
}
