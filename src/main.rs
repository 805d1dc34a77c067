//! Finance bot - WhatsApp personal-finance assistant
//!
//! A menu-driven conversation that records salaries, shared and individual
//! expenses and a partner link, and reports the month's totals.

mod api;
mod config;
mod ledger;
mod messages;
mod money;
mod report;
mod runtime;
mod state_machine;

use api::{create_router, AppState};
use config::{BotConfig, LedgerBackend};
use ledger::sheets::SheetsLedger;
use ledger::sqlite::SqliteLedger;
use ledger::{Ledger, LoggingLedger};
use runtime::{spawn_eviction_task, ConversationService};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env is fine; the environment may already be set
    let _ = dotenv::dotenv();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "finance_bot=info,tower_http=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = BotConfig::from_env()?;
    tracing::info!(backend = config.backend.name(), port = config.port, "Configuration loaded");

    let ledger = open_ledger(&config.backend)?;
    tracing::info!(backend = ledger.backend_name(), "Verifying ledger");
    ledger.verify().await?;

    let service = ConversationService::new(ledger, config.policy);
    spawn_eviction_task(Arc::clone(service.sessions()), config.session_idle);
    tracing::info!(
        min_amount = config.policy.min,
        max_amount = config.policy.max,
        idle_minutes = config.session_idle.as_secs() / 60,
        "Conversation service ready"
    );

    let app = create_router(AppState::new(service)).layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Finance bot listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn open_ledger(backend: &LedgerBackend) -> Result<Arc<dyn Ledger>, Box<dyn std::error::Error>> {
    Ok(match backend {
        LedgerBackend::Sqlite { path } => {
            // Ensure database directory exists
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            tracing::info!(path = %path.display(), "Opening database");
            Arc::new(LoggingLedger::new(SqliteLedger::open(path)?))
        }
        LedgerBackend::Sheets(sheets) => {
            tracing::info!(spreadsheet = %sheets.spreadsheet_id, "Using spreadsheet ledger");
            Arc::new(LoggingLedger::new(SheetsLedger::new(sheets.clone())?))
        }
    })
}
