//! HTTP surface of the bot
//!
//! The messaging webhook answers with TwiML; a JSON endpoint drives the same
//! conversation for other clients and tests.

mod handlers;
mod twiml;
mod types;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::runtime::ProductionService;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ProductionService>,
}

impl AppState {
    pub fn new(service: ProductionService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}
