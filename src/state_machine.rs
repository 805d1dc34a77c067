//! Session state machine
//!
//! Elm-style: a pure `transition` decides the next step, the reply and the
//! ledger effects; the runtime executes effects and feeds outcomes back as events.

mod effect;
pub mod event;
pub mod input;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::Event;
pub use state::{PendingWrite, ReportView, Session, SessionContext, Step};
pub use transition::{transition, TransitionError};
