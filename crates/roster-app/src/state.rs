//! Application state composition.
//!
//! ## State Hierarchy
//!
//! ```text
//! AppState
//! ├── session: Session           (who is signed in)
//! ├── channel: Option<Channel>   (active binding; None until the first bind)
//! ├── view: ViewState            (what the presentation layer reads)
//! ├── task_seq: TaskSeq          (async task id generator)
//! └── tasks: Tasks               (task lifecycle state)
//! ```
//!
//! Everything here is mutated only by [`crate::update::update`].

use roster_core::{Channel, Generation, Session};
use roster_types::{Principal, RecordId, StudentFields, StudentRecord};

use crate::common::{TaskSeq, Tasks};

/// Where a detail view returns to when closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailOrigin {
    Browsing,
    Editing,
}

impl DetailOrigin {
    pub fn mode(self) -> Mode {
        match self {
            DetailOrigin::Browsing => Mode::Browsing,
            DetailOrigin::Editing => Mode::Editing,
        }
    }
}

/// UI mode of the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Anonymous,
    /// Record list visible.
    Browsing,
    /// Form visible; the edit target decides between add and update.
    Editing,
    /// One record highlighted.
    Detail { from: DetailOrigin },
}

/// Client-only view state. Never persisted.
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    pub mode: Mode,
    /// Snapshot from the last successful list fetch.
    pub records: Vec<StudentRecord>,
    /// Record shown in the detail view.
    pub selected: Option<StudentRecord>,
    /// Record being edited; `None` while adding.
    pub edit_target: Option<StudentRecord>,
    /// Form draft.
    pub form: StudentFields,
    /// Transient status message; each new one replaces the last.
    pub message: Option<String>,
    /// Signed-in principal, for the welcome line.
    pub principal: Option<Principal>,
}

impl ViewState {
    /// Drops everything tied to the signed-in user.
    pub fn reset(&mut self) {
        self.mode = Mode::Anonymous;
        self.records.clear();
        self.selected = None;
        self.edit_target = None;
        self.form = StudentFields::default();
        self.principal = None;
    }

    pub fn record(&self, id: RecordId) -> Option<&StudentRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
    }
}

#[derive(Debug, Default)]
pub struct AppState {
    pub session: Session,
    pub channel: Option<Channel>,
    pub view: ViewState,
    pub task_seq: TaskSeq,
    pub tasks: Tasks,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generation record results must carry to be applied.
    pub fn generation(&self) -> Option<Generation> {
        self.channel.as_ref().map(Channel::generation)
    }
}
