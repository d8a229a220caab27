//! Effect handlers for the coordinator runtime.
//!
//! Handlers are pure async functions that return `AppEvent`. They perform the
//! I/O and never touch state; the runtime spawns them and feeds the result
//! back through the inbox.

pub mod records;
pub mod session;

pub use records::*;
pub use session::*;
