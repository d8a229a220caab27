//! Shared data model for the roster workspace.
//!
//! These types cross every boundary (remote store wire format, credential
//! cache, view state), so they only depend on `serde`.

mod record;
mod school;

pub use record::{Principal, RecordId, StudentFields, StudentRecord};
pub use school::{School, UnknownSchool};
