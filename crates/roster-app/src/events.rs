//! Coordinator event types.
//!
//! All inputs (presentation actions and async results) are converted to
//! `AppEvent` before being processed by the reducer.
//!
//! ## Task Lifecycle Events
//!
//! Async work uses a uniform lifecycle:
//! - The runtime emits `AppEvent::TaskStarted` as soon as a task is spawned
//! - The runtime emits `AppEvent::TaskCompleted` with the result event when done
//! - The reducer is the only place that mutates `TaskState`
//!
//! Record results additionally carry the [`Generation`] of the channel they
//! were issued on, so results from a superseded binding are discarded.

use roster_core::{Channel, ClientError, ClientResult, Generation, Session};
use roster_types::{RecordId, StudentFields, StudentRecord};

use crate::common::{TaskCompleted, TaskKind, TaskStarted};

/// Operations the presentation layer invokes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    SignIn,
    SignOut,
    /// Abandon a pending interactive sign-in.
    CancelSignIn,
    /// Re-fetch the roster and return to the list.
    ShowList,
    StartAdd,
    StartEdit(StudentRecord),
    StartView(StudentRecord),
    Submit(StudentFields),
    Remove(RecordId),
    CloseDetail,
    CancelEdit,
}

/// What a submit was asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitIntent {
    Create,
    Update(RecordId),
}

#[derive(Debug)]
pub enum AppEvent {
    /// Coordinator started; restore the previous session.
    Startup,
    Action(Action),

    Restored(Session),
    SignedIn(ClientResult<Session>),
    SignedOut(ClientResult<Session>),

    ChannelBound(Channel),
    BindFailed(ClientError),

    RecordsFetched {
        generation: Option<Generation>,
        result: ClientResult<Vec<StudentRecord>>,
    },
    Submitted {
        generation: Option<Generation>,
        intent: SubmitIntent,
        result: ClientResult<()>,
    },
    Deleted {
        generation: Option<Generation>,
        id: RecordId,
        result: ClientResult<()>,
    },

    TaskStarted {
        kind: TaskKind,
        started: TaskStarted,
    },
    TaskCompleted {
        kind: TaskKind,
        completed: TaskCompleted<Box<AppEvent>>,
    },
}

impl From<Action> for AppEvent {
    fn from(action: Action) -> Self {
        AppEvent::Action(action)
    }
}
