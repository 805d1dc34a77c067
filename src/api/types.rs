//! API request and response types

use serde::{Deserialize, Serialize};

/// Form fields posted by the messaging webhook
#[derive(Debug, Deserialize)]
pub struct WebhookForm {
    #[serde(rename = "From")]
    pub from: Option<String>,
    #[serde(rename = "Body", default)]
    pub body: String,
    #[serde(rename = "ProfileName")]
    pub profile_name: Option<String>,
}

/// Request to deliver a message through the JSON endpoint
#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub from: String,
    pub body: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Reply produced for a message
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub reply: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub backend: String,
    pub active_sessions: usize,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
