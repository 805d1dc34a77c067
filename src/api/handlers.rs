//! HTTP request handlers

use super::twiml::message_response;
use super::types::{ErrorResponse, HealthResponse, MessageRequest, MessageResponse, WebhookForm};
use super::AppState;
use crate::ledger::{Ledger, LedgerStats};
use crate::runtime::InboundMessage;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Messaging webhook, answered with TwiML
        .route("/webhook", post(webhook))
        // Same conversation over JSON
        .route("/api/messages", post(post_message))
        .route("/api/stats", get(stats))
        .route("/health", get(health))
        .with_state(state)
}

// ============================================================
// Messages
// ============================================================

async fn webhook(
    State(state): State<AppState>,
    Form(form): Form<WebhookForm>,
) -> Result<Response, AppError> {
    let from = form
        .from
        .filter(|f| !f.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing From".to_string()))?;

    let reply = state
        .service
        .handle(InboundMessage {
            from,
            body: form.body,
            display_name: form.profile_name,
        })
        .await;

    Ok((
        [(header::CONTENT_TYPE, "text/xml; charset=utf-8")],
        message_response(&reply),
    )
        .into_response())
}

async fn post_message(
    State(state): State<AppState>,
    Json(req): Json<MessageRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    if req.from.trim().is_empty() {
        return Err(AppError::BadRequest("Missing from".to_string()));
    }

    let reply = state
        .service
        .handle(InboundMessage {
            from: req.from,
            body: req.body,
            display_name: req.display_name,
        })
        .await;

    Ok(Json(MessageResponse { reply }))
}

// ============================================================
// Status
// ============================================================

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        backend: state.service.ledger().backend_name().to_string(),
        active_sessions: state.service.sessions().len().await,
    })
}

async fn stats(State(state): State<AppState>) -> Result<Json<LedgerStats>, AppError> {
    state
        .service
        .ledger()
        .stats()
        .await
        .map(Json)
        .map_err(|e| AppError::Internal(e.to_string()))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
