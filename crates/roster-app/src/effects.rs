//! Coordinator effect types.
//!
//! Effects are commands returned by the reducer that the runtime executes.
//! This keeps the reducer pure: it only mutates state and returns effects,
//! never performs I/O or spawns tasks directly.
//!
//! Record effects carry the channel they must use; the runtime never looks
//! up "the current channel" on its own.

use roster_core::{Channel, Identity};
use roster_types::{RecordId, StudentFields};
use tokio_util::sync::CancellationToken;

use crate::common::TaskId;

#[derive(Debug)]
pub enum AppEffect {
    /// Restore the previous session from the credential cache.
    RestoreSession { task: TaskId },

    /// Run the interactive sign-in flow.
    SignIn { task: TaskId },

    /// Sign out with the identity provider.
    SignOut { task: TaskId },

    /// Cancel a running task (the runtime calls `token.cancel()`).
    CancelTask { token: Option<CancellationToken> },

    /// Bind a fresh channel for the identity (anonymous when `None`).
    Bind { identity: Option<Identity> },

    FetchRecords {
        task: TaskId,
        channel: Option<Channel>,
    },
    CreateRecord {
        task: TaskId,
        channel: Option<Channel>,
        fields: StudentFields,
    },
    UpdateRecord {
        task: TaskId,
        channel: Option<Channel>,
        id: RecordId,
        fields: StudentFields,
    },
    DeleteRecord {
        task: TaskId,
        channel: Option<Channel>,
        id: RecordId,
    },
}
