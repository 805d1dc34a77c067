//! Access token for the spreadsheet API
//!
//! Either a fixed token from configuration or the output of a command such as
//! `gcloud auth print-access-token`. Command tokens are cached for
//! [`TOKEN_TTL`] and dropped as soon as a request fails.

use crate::ledger::{LedgerError, LedgerResult};
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::sync::Mutex;

pub const TOKEN_TTL: Duration = Duration::from_secs(300); // 5 minutes

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenSource {
    Static(String),
    Command(String),
}

pub struct TokenProvider {
    source: TokenSource,
    cached: Mutex<Option<(String, Instant)>>,
}

impl TokenProvider {
    pub fn new(source: TokenSource) -> Self {
        Self {
            source,
            cached: Mutex::new(None),
        }
    }

    /// Current token, running the token command when the cache is cold
    pub async fn token(&self) -> LedgerResult<String> {
        let command = match &self.source {
            TokenSource::Static(token) => return Ok(token.clone()),
            TokenSource::Command(command) => command,
        };

        let mut cached = self.cached.lock().await;
        if let Some((token, fetched_at)) = cached.as_ref() {
            if fetched_at.elapsed() < TOKEN_TTL {
                return Ok(token.clone());
            }
        }

        tracing::info!("Refreshing spreadsheet access token");
        let token = run_token_command(command).await?;
        *cached = Some((token.clone(), Instant::now()));
        Ok(token)
    }

    /// Forget the cached token so the next call fetches a fresh one
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }
}

async fn run_token_command(command: &str) -> LedgerResult<String> {
    let output = Command::new("sh")
        .arg("-c")
        .arg(command)
        .output()
        .await
        .map_err(|e| LedgerError::Token(format!("failed to run token command: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(LedgerError::Token(format!(
            "token command exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if token.is_empty() {
        return Err(LedgerError::Token("token command printed nothing".to_string()));
    }
    Ok(token)
}
