use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(pub u64);

#[derive(Debug, Default)]
pub struct TaskSeq {
    next: u64,
}

impl TaskSeq {
    pub fn next_id(&mut self) -> TaskId {
        let id = TaskId(self.next);
        self.next = self.next.wrapping_add(1);
        id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Restore,
    SignIn,
    SignOut,
    ListFetch,
    Submit,
    Delete,
}

#[derive(Debug, Clone)]
pub struct TaskStarted {
    pub id: TaskId,
    pub cancel: Option<CancellationToken>,
}

#[derive(Debug)]
pub struct TaskCompleted<E> {
    pub id: TaskId,
    pub result: E,
}

/// Task lifecycle state (stored in AppState, mutated only by reducer).
///
/// Latest-only: starting a task replaces the active id, so completions of
/// older tasks of the same kind are dropped.
#[derive(Debug, Default, Clone)]
pub struct TaskState {
    pub active: Option<TaskId>,
    pub cancel: Option<CancellationToken>,
}

impl TaskState {
    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    pub fn on_started(&mut self, started: &TaskStarted) {
        self.active = Some(started.id);
        self.cancel = started.cancel.clone();
    }

    pub fn finish_if_active(&mut self, id: TaskId) -> bool {
        let ok = self.active == Some(id);
        if ok {
            self.clear();
        }
        ok
    }

    pub fn clear(&mut self) {
        self.active = None;
        self.cancel = None;
    }
}

#[derive(Debug, Default, Clone)]
pub struct Tasks {
    pub restore: TaskState,
    pub sign_in: TaskState,
    pub sign_out: TaskState,
    pub list_fetch: TaskState,
    pub submit: TaskState,
    pub delete: TaskState,
}

impl Tasks {
    pub fn state_mut(&mut self, kind: TaskKind) -> &mut TaskState {
        match kind {
            TaskKind::Restore => &mut self.restore,
            TaskKind::SignIn => &mut self.sign_in,
            TaskKind::SignOut => &mut self.sign_out,
            TaskKind::ListFetch => &mut self.list_fetch,
            TaskKind::Submit => &mut self.submit,
            TaskKind::Delete => &mut self.delete,
        }
    }

    /// True while a create, update or delete is in flight.
    pub fn is_mutation_running(&self) -> bool {
        self.submit.is_running() || self.delete.is_running()
    }

    /// Forgets in-flight record tasks so their completions are dropped.
    pub fn abandon_record_tasks(&mut self) {
        self.list_fetch.clear();
        self.submit.clear();
        self.delete.clear();
    }
}
