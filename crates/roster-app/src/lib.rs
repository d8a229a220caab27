//! View State Coordinator for Roster.
//!
//! Elm-style: [`update::update`] is a pure reducer over [`state::AppState`];
//! [`runtime::Coordinator`] executes the effects it returns and feeds async
//! results back as events. Presentation layers only dispatch
//! [`events::Action`]s and read [`state::ViewState`].

pub mod common;
pub mod effects;
pub mod events;
pub mod runtime;
pub mod state;
pub mod update;

pub use events::Action;
pub use runtime::Coordinator;
pub use state::{DetailOrigin, Mode, ViewState};
