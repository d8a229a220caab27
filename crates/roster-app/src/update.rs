//! Coordinator reducer (update function).
//!
//! All state mutations happen here. The runtime calls `update(app, event)`
//! and executes the returned effects.

use roster_core::{ClientError, Generation};
use roster_types::{RecordId, StudentFields};

use crate::effects::AppEffect;
use crate::events::{Action, AppEvent, SubmitIntent};
use crate::state::{AppState, DetailOrigin, Mode};

pub const MSG_ADDED: &str = "Student added successfully";
pub const MSG_UPDATED: &str = "Student updated successfully";
pub const MSG_SUBMIT_FAILED: &str = "Failed to add/update student";
pub const MSG_DELETED: &str = "Student deleted successfully";
pub const MSG_DELETE_FAILED: &str = "Failed to delete student";
pub const MSG_FETCH_FAILED: &str = "Failed to fetch students";
pub const MSG_SIGNED_OUT: &str = "Signed out";
pub const MSG_BUSY: &str = "Another request is still in progress";

/// The main reducer function.
///
/// Takes the current state and an event, mutates state, and returns effects
/// for the runtime to execute.
pub fn update(app: &mut AppState, event: AppEvent) -> Vec<AppEffect> {
    match event {
        AppEvent::Startup => {
            let task = app.task_seq.next_id();
            vec![AppEffect::RestoreSession { task }]
        }
        AppEvent::Action(action) => handle_action(app, action),

        AppEvent::Restored(session) if app.session.is_authenticated() => {
            tracing::debug!(
                restored = session.is_authenticated(),
                "dropping restore that finished after a sign-in"
            );
            vec![]
        }
        AppEvent::Restored(session) | AppEvent::SignedIn(Ok(session)) => {
            app.view.principal = session.principal().cloned();
            let identity = session.identity().cloned();
            app.session = session;
            vec![AppEffect::Bind { identity }]
        }
        AppEvent::SignedIn(Err(err)) => {
            app.view
                .set_message(format!("Sign in failed: {}", auth_reason(&err)));
            vec![]
        }
        AppEvent::SignedOut(Ok(session)) => {
            app.session = session;
            app.tasks.abandon_record_tasks();
            app.view.reset();
            app.view.set_message(MSG_SIGNED_OUT);
            vec![AppEffect::Bind { identity: None }]
        }
        AppEvent::SignedOut(Err(err)) => {
            app.view
                .set_message(format!("Sign out failed: {}", auth_reason(&err)));
            vec![]
        }

        AppEvent::ChannelBound(channel) => {
            app.channel = Some(channel);
            if app.session.is_authenticated() {
                fetch_records(app)
            } else {
                vec![]
            }
        }
        AppEvent::BindFailed(err) => {
            tracing::warn!(error = %err, "could not bind channel");
            app.view
                .set_message(format!("Could not reach the record store: {err}"));
            vec![]
        }

        AppEvent::RecordsFetched { generation, result } => {
            if is_stale(app, generation) {
                return vec![];
            }
            match result {
                Ok(records) => app.view.records = records,
                Err(err) => {
                    tracing::warn!(error = %err, "list fetch failed");
                    app.view.set_message(MSG_FETCH_FAILED);
                }
            }
            if app.view.mode == Mode::Anonymous && app.session.is_authenticated() {
                app.view.mode = Mode::Browsing;
            }
            vec![]
        }
        AppEvent::Submitted {
            generation,
            intent,
            result,
        } => {
            if is_stale(app, generation) {
                return vec![];
            }
            handle_submitted(app, intent, result)
        }
        AppEvent::Deleted {
            generation,
            id,
            result,
        } => {
            if is_stale(app, generation) {
                return vec![];
            }
            handle_deleted(app, id, result)
        }

        AppEvent::TaskStarted { kind, started } => {
            app.tasks.state_mut(kind).on_started(&started);
            vec![]
        }
        AppEvent::TaskCompleted { kind, completed } => {
            let ok = app.tasks.state_mut(kind).finish_if_active(completed.id);
            if ok {
                update(app, *completed.result)
            } else {
                tracing::debug!(?kind, id = completed.id.0, "dropping result of superseded task");
                vec![]
            }
        }
    }
}

fn handle_action(app: &mut AppState, action: Action) -> Vec<AppEffect> {
    match action {
        Action::SignIn => {
            if app.tasks.restore.is_running()
                || app.tasks.sign_in.is_running()
                || app.session.is_authenticated()
            {
                tracing::debug!("session restore or sign-in pending, or already signed in");
                return vec![];
            }
            let task = app.task_seq.next_id();
            vec![AppEffect::SignIn { task }]
        }
        Action::CancelSignIn => match app.tasks.sign_in.cancel.clone() {
            Some(token) => vec![AppEffect::CancelTask { token: Some(token) }],
            None => vec![],
        },
        Action::SignOut => {
            if app.tasks.sign_out.is_running() || !app.session.is_authenticated() {
                tracing::debug!("sign-out already running or not signed in");
                return vec![];
            }
            let task = app.task_seq.next_id();
            vec![AppEffect::SignOut { task }]
        }
        action if app.view.mode == Mode::Anonymous => {
            tracing::debug!(?action, "ignoring record action while signed out");
            vec![]
        }
        Action::ShowList => {
            app.view.mode = Mode::Browsing;
            app.view.selected = None;
            clear_form(app);
            fetch_records(app)
        }
        Action::StartAdd => {
            clear_form(app);
            app.view.selected = None;
            app.view.mode = Mode::Editing;
            vec![]
        }
        Action::StartEdit(record) => {
            app.view.form = record.fields.clone();
            app.view.edit_target = Some(record);
            app.view.selected = None;
            app.view.mode = Mode::Editing;
            vec![]
        }
        Action::StartView(record) => {
            let from = match app.view.mode {
                Mode::Editing => DetailOrigin::Editing,
                Mode::Detail { from } => from,
                _ => DetailOrigin::Browsing,
            };
            app.view.selected = Some(record);
            app.view.mode = Mode::Detail { from };
            vec![]
        }
        Action::CloseDetail => {
            if let Mode::Detail { from } = app.view.mode {
                app.view.mode = from.mode();
                app.view.selected = None;
            }
            vec![]
        }
        Action::CancelEdit => {
            if app.view.mode == Mode::Editing {
                clear_form(app);
                app.view.mode = Mode::Browsing;
            }
            vec![]
        }
        Action::Submit(fields) => submit(app, fields),
        Action::Remove(id) => {
            if app.tasks.is_mutation_running() {
                app.view.set_message(MSG_BUSY);
                return vec![];
            }
            let task = app.task_seq.next_id();
            vec![AppEffect::DeleteRecord {
                task,
                channel: app.channel.clone(),
                id,
            }]
        }
    }
}

fn submit(app: &mut AppState, fields: StudentFields) -> Vec<AppEffect> {
    if app.view.mode != Mode::Editing {
        tracing::debug!(mode = ?app.view.mode, "ignoring submit outside the form");
        return vec![];
    }

    let missing = fields.missing_fields();
    app.view.form = fields;
    if !missing.is_empty() {
        app.view
            .set_message(format!("Missing required fields: {}", missing.join(", ")));
        return vec![];
    }
    if app.tasks.is_mutation_running() {
        app.view.set_message(MSG_BUSY);
        return vec![];
    }

    let task = app.task_seq.next_id();
    let channel = app.channel.clone();
    let fields = app.view.form.clone();
    match &app.view.edit_target {
        Some(target) => vec![AppEffect::UpdateRecord {
            task,
            channel,
            id: target.id,
            fields,
        }],
        None => vec![AppEffect::CreateRecord {
            task,
            channel,
            fields,
        }],
    }
}

fn handle_submitted(
    app: &mut AppState,
    intent: SubmitIntent,
    result: Result<(), ClientError>,
) -> Vec<AppEffect> {
    if let Err(err) = result {
        tracing::warn!(error = %err, ?intent, "submit failed");
        app.view.set_message(MSG_SUBMIT_FAILED);
        return vec![];
    }

    app.view.set_message(match intent {
        SubmitIntent::Create => MSG_ADDED,
        SubmitIntent::Update(_) => MSG_UPDATED,
    });
    clear_form(app);
    app.view.mode = match app.view.mode {
        Mode::Editing => Mode::Browsing,
        Mode::Detail {
            from: DetailOrigin::Editing,
        } => Mode::Detail {
            from: DetailOrigin::Browsing,
        },
        mode => mode,
    };
    fetch_records(app)
}

fn handle_deleted(
    app: &mut AppState,
    id: RecordId,
    result: Result<(), ClientError>,
) -> Vec<AppEffect> {
    match result {
        Ok(()) => {}
        Err(err) if err.is_not_found() => {
            tracing::debug!(%id, "record was already deleted");
        }
        Err(err) => {
            tracing::warn!(error = %err, %id, "delete failed");
            app.view.set_message(MSG_DELETE_FAILED);
            return vec![];
        }
    }

    app.view.set_message(MSG_DELETED);
    if app.view.selected.as_ref().is_some_and(|r| r.id == id) {
        app.view.selected = None;
        if matches!(app.view.mode, Mode::Detail { .. }) {
            app.view.mode = Mode::Browsing;
        }
    }
    if app.view.edit_target.as_ref().is_some_and(|r| r.id == id) {
        clear_form(app);
        app.view.mode = match app.view.mode {
            Mode::Editing => Mode::Browsing,
            Mode::Detail { .. } => Mode::Detail {
                from: DetailOrigin::Browsing,
            },
            mode => mode,
        };
    }
    fetch_records(app)
}

fn fetch_records(app: &mut AppState) -> Vec<AppEffect> {
    let task = app.task_seq.next_id();
    vec![AppEffect::FetchRecords {
        task,
        channel: app.channel.clone(),
    }]
}

fn clear_form(app: &mut AppState) {
    app.view.edit_target = None;
    app.view.form = StudentFields::default();
}

fn is_stale(app: &AppState, generation: Option<Generation>) -> bool {
    let current = app.generation();
    let stale = generation != current;
    if stale {
        tracing::debug!(?generation, ?current, "discarding result from superseded channel");
    }
    stale
}

fn auth_reason(err: &ClientError) -> String {
    match err {
        ClientError::AuthFailure(reason) => reason.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use roster_core::store::{MemoryConnector, MemoryRecordStore};
    use roster_core::{Channel, ChannelBinder, Identity, Session, StoreError};
    use roster_types::{Principal, School, StudentRecord};
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::common::{TaskCompleted, TaskId, TaskKind, TaskStarted};

    fn fields(first: &str) -> StudentFields {
        StudentFields {
            first_name: first.to_string(),
            last_name: "B".to_string(),
            fathers_name: "C".to_string(),
            mothers_name: "D".to_string(),
            phone_number: "1".to_string(),
            email: "a@b.com".to_string(),
            school: School::Tumba,
        }
    }

    fn record(id: u64, first: &str) -> StudentRecord {
        StudentRecord::new(RecordId(id), fields(first))
    }

    fn identity() -> Identity {
        Identity::new(Principal::new("2vxsx-fae"), "tok", u64::MAX)
    }

    struct Harness {
        app: AppState,
        binder: ChannelBinder,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                app: AppState::new(),
                binder: ChannelBinder::new(Arc::new(MemoryConnector::new(
                    MemoryRecordStore::new(),
                ))),
            }
        }

        fn bind(&mut self) -> Channel {
            let identity = self.app.session.identity().cloned();
            self.binder.bind(identity.as_ref()).unwrap()
        }

        /// Signed in, bound and browsing `records`.
        fn browsing(records: Vec<StudentRecord>) -> Self {
            let mut h = Self::new();
            update(
                &mut h.app,
                AppEvent::SignedIn(Ok(Session::authenticated(identity()))),
            );
            let channel = h.bind();
            update(&mut h.app, AppEvent::ChannelBound(channel));
            let generation = h.app.generation();
            update(
                &mut h.app,
                AppEvent::RecordsFetched {
                    generation,
                    result: Ok(records),
                },
            );
            assert_eq!(h.app.view.mode, Mode::Browsing);
            h
        }

        fn act(&mut self, action: Action) -> Vec<AppEffect> {
            update(&mut self.app, AppEvent::Action(action))
        }

        fn start(&mut self, kind: TaskKind, id: TaskId, cancel: Option<CancellationToken>) {
            update(
                &mut self.app,
                AppEvent::TaskStarted {
                    kind,
                    started: TaskStarted { id, cancel },
                },
            );
        }

        fn complete(&mut self, kind: TaskKind, id: TaskId, event: AppEvent) -> Vec<AppEffect> {
            update(
                &mut self.app,
                AppEvent::TaskCompleted {
                    kind,
                    completed: TaskCompleted {
                        id,
                        result: Box::new(event),
                    },
                },
            )
        }
    }

    fn task_of(effects: &[AppEffect]) -> TaskId {
        match effects {
            [
                AppEffect::CreateRecord { task, .. }
                | AppEffect::UpdateRecord { task, .. }
                | AppEffect::DeleteRecord { task, .. }
                | AppEffect::FetchRecords { task, .. }
                | AppEffect::SignIn { task }
                | AppEffect::SignOut { task }
                | AppEffect::RestoreSession { task },
            ] => *task,
            other => panic!("expected a single task effect, got {other:?}"),
        }
    }

    #[test]
    fn test_startup_restores_session() {
        let mut app = AppState::new();
        let effects = update(&mut app, AppEvent::Startup);
        assert!(matches!(effects.as_slice(), [AppEffect::RestoreSession { .. }]));
        assert_eq!(app.view.mode, Mode::Anonymous);
    }

    #[test]
    fn test_restored_session_binds_then_fetches_then_browses() {
        let mut h = Harness::new();
        let effects = update(
            &mut h.app,
            AppEvent::Restored(Session::authenticated(identity())),
        );
        assert!(matches!(
            effects.as_slice(),
            [AppEffect::Bind { identity: Some(_) }]
        ));
        assert_eq!(
            h.app.view.principal.as_ref().map(Principal::as_str),
            Some("2vxsx-fae")
        );

        let channel = h.bind();
        let effects = update(&mut h.app, AppEvent::ChannelBound(channel));
        assert!(matches!(
            effects.as_slice(),
            [AppEffect::FetchRecords {
                channel: Some(_),
                ..
            }]
        ));
        assert_eq!(h.app.view.mode, Mode::Anonymous);

        let generation = h.app.generation();
        update(
            &mut h.app,
            AppEvent::RecordsFetched {
                generation,
                result: Ok(vec![record(1, "A")]),
            },
        );
        assert_eq!(h.app.view.mode, Mode::Browsing);
        assert_eq!(h.app.view.records.len(), 1);
    }

    #[test]
    fn test_restored_anonymous_session_stays_anonymous() {
        let mut h = Harness::new();
        let effects = update(&mut h.app, AppEvent::Restored(Session::anonymous()));
        assert!(matches!(
            effects.as_slice(),
            [AppEffect::Bind { identity: None }]
        ));
        let channel = h.bind();
        assert!(update(&mut h.app, AppEvent::ChannelBound(channel)).is_empty());
        assert_eq!(h.app.view.mode, Mode::Anonymous);
    }

    #[test]
    fn test_sign_in_failure_keeps_anonymous() {
        let mut h = Harness::new();
        let effects = h.act(Action::SignIn);
        let task = task_of(&effects);
        h.start(TaskKind::SignIn, task, Some(CancellationToken::new()));

        let effects = h.complete(
            TaskKind::SignIn,
            task,
            AppEvent::SignedIn(Err(ClientError::auth("UserInterrupt"))),
        );
        assert!(effects.is_empty());
        assert!(!h.app.session.is_authenticated());
        assert!(h.app.session.identity().is_none());
        assert_eq!(h.app.view.mode, Mode::Anonymous);
        assert_eq!(
            h.app.view.message.as_deref(),
            Some("Sign in failed: UserInterrupt")
        );
    }

    #[test]
    fn test_second_sign_in_while_pending_is_ignored() {
        let mut h = Harness::new();
        let task = task_of(&h.act(Action::SignIn));
        h.start(TaskKind::SignIn, task, None);
        assert!(h.act(Action::SignIn).is_empty());
    }

    #[test]
    fn test_cancel_sign_in_cancels_the_pending_token() {
        let mut h = Harness::new();
        assert!(h.act(Action::CancelSignIn).is_empty());

        let task = task_of(&h.act(Action::SignIn));
        let token = CancellationToken::new();
        h.start(TaskKind::SignIn, task, Some(token.clone()));

        let effects = h.act(Action::CancelSignIn);
        let [AppEffect::CancelTask { token: Some(sent) }] = effects.as_slice() else {
            panic!("expected cancel effect, got {effects:?}");
        };
        sent.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_record_actions_ignored_while_anonymous() {
        let mut h = Harness::new();
        assert!(h.act(Action::StartAdd).is_empty());
        assert!(h.act(Action::ShowList).is_empty());
        assert!(h.act(Action::Remove(RecordId(1))).is_empty());
        assert!(h.act(Action::Submit(fields("A"))).is_empty());
        assert_eq!(h.app.view.mode, Mode::Anonymous);
    }

    #[test]
    fn test_add_submits_create_and_refreshes_on_success() {
        let mut h = Harness::browsing(vec![]);
        h.act(Action::StartAdd);
        assert_eq!(h.app.view.mode, Mode::Editing);
        assert!(h.app.view.edit_target.is_none());

        let effects = h.act(Action::Submit(fields("A")));
        let [AppEffect::CreateRecord {
            task,
            channel: Some(_),
            fields: sent,
        }] = effects.as_slice()
        else {
            panic!("expected create effect, got {effects:?}");
        };
        assert_eq!(sent, &fields("A"));
        let task = *task;
        h.start(TaskKind::Submit, task, None);

        let generation = h.app.generation();
        let effects = h.complete(
            TaskKind::Submit,
            task,
            AppEvent::Submitted {
                generation,
                intent: SubmitIntent::Create,
                result: Ok(()),
            },
        );
        assert!(matches!(effects.as_slice(), [AppEffect::FetchRecords { .. }]));
        assert_eq!(h.app.view.mode, Mode::Browsing);
        assert_eq!(h.app.view.message.as_deref(), Some(MSG_ADDED));
        assert_eq!(h.app.view.form, StudentFields::default());
    }

    #[test]
    fn test_edit_prefills_form_and_submits_update() {
        let target = record(4, "A");
        let mut h = Harness::browsing(vec![target.clone()]);
        h.act(Action::StartEdit(target.clone()));
        assert_eq!(h.app.view.form, target.fields);
        assert_eq!(h.app.view.edit_target, Some(target));

        let effects = h.act(Action::Submit(fields("Z")));
        assert!(matches!(
            effects.as_slice(),
            [AppEffect::UpdateRecord {
                id: RecordId(4),
                ..
            }]
        ));
    }

    #[test]
    fn test_submit_with_missing_fields_sets_message() {
        let mut h = Harness::browsing(vec![]);
        h.act(Action::StartAdd);
        let mut draft = fields("A");
        draft.email = "  ".to_string();
        draft.last_name.clear();

        assert!(h.act(Action::Submit(draft.clone())).is_empty());
        assert_eq!(h.app.view.mode, Mode::Editing);
        assert_eq!(
            h.app.view.message.as_deref(),
            Some("Missing required fields: lastName, email")
        );
        assert_eq!(h.app.view.form, draft);
    }

    #[test]
    fn test_overlapping_mutation_is_refused() {
        let mut h = Harness::browsing(vec![record(1, "A")]);
        h.act(Action::StartAdd);
        let task = task_of(&h.act(Action::Submit(fields("A"))));
        h.start(TaskKind::Submit, task, None);

        assert!(h.act(Action::Submit(fields("B"))).is_empty());
        assert_eq!(h.app.view.message.as_deref(), Some(MSG_BUSY));
        assert!(h.act(Action::Remove(RecordId(1))).is_empty());
    }

    #[test]
    fn test_submit_failure_keeps_mode_and_form() {
        let mut h = Harness::browsing(vec![]);
        h.act(Action::StartAdd);
        let task = task_of(&h.act(Action::Submit(fields("A"))));
        h.start(TaskKind::Submit, task, None);

        let generation = h.app.generation();
        let effects = h.complete(
            TaskKind::Submit,
            task,
            AppEvent::Submitted {
                generation,
                intent: SubmitIntent::Create,
                result: Err(StoreError::transport("connection refused").into()),
            },
        );
        assert!(effects.is_empty());
        assert_eq!(h.app.view.mode, Mode::Editing);
        assert_eq!(h.app.view.message.as_deref(), Some(MSG_SUBMIT_FAILED));
        assert_eq!(h.app.view.form, fields("A"));
    }

    #[test]
    fn test_result_from_superseded_generation_is_discarded() {
        let mut h = Harness::browsing(vec![record(1, "A")]);
        let old = h.app.generation();

        let channel = h.bind();
        update(&mut h.app, AppEvent::ChannelBound(channel));
        assert_ne!(h.app.generation(), old);

        let effects = update(
            &mut h.app,
            AppEvent::RecordsFetched {
                generation: old,
                result: Ok(vec![record(9, "Stale")]),
            },
        );
        assert!(effects.is_empty());
        assert_eq!(h.app.view.records, vec![record(1, "A")]);

        update(
            &mut h.app,
            AppEvent::Submitted {
                generation: old,
                intent: SubmitIntent::Create,
                result: Ok(()),
            },
        );
        assert_eq!(h.app.view.message, None);
    }

    #[test]
    fn test_sign_out_clears_view_and_drops_in_flight_results() {
        let mut h = Harness::browsing(vec![record(1, "A")]);
        h.act(Action::StartView(record(1, "A")));
        h.act(Action::CloseDetail);
        h.act(Action::StartAdd);
        let submit = task_of(&h.act(Action::Submit(fields("B"))));
        h.start(TaskKind::Submit, submit, None);

        let sign_out = task_of(&h.act(Action::SignOut));
        h.start(TaskKind::SignOut, sign_out, None);
        let effects = h.complete(
            TaskKind::SignOut,
            sign_out,
            AppEvent::SignedOut(Ok(Session::anonymous())),
        );
        assert!(matches!(
            effects.as_slice(),
            [AppEffect::Bind { identity: None }]
        ));
        assert_eq!(h.app.view.mode, Mode::Anonymous);
        assert!(h.app.view.records.is_empty());
        assert!(h.app.view.selected.is_none());
        assert!(h.app.view.edit_target.is_none());
        assert_eq!(h.app.view.message.as_deref(), Some(MSG_SIGNED_OUT));

        let generation = h.app.generation();
        let effects = h.complete(
            TaskKind::Submit,
            submit,
            AppEvent::Submitted {
                generation,
                intent: SubmitIntent::Create,
                result: Ok(()),
            },
        );
        assert!(effects.is_empty());
        assert_eq!(h.app.view.message.as_deref(), Some(MSG_SIGNED_OUT));
    }

    #[test]
    fn test_sign_out_failure_keeps_session() {
        let mut h = Harness::browsing(vec![]);
        update(
            &mut h.app,
            AppEvent::SignedOut(Err(ClientError::auth("provider unreachable"))),
        );
        assert!(h.app.session.is_authenticated());
        assert_eq!(h.app.view.mode, Mode::Browsing);
        assert_eq!(
            h.app.view.message.as_deref(),
            Some("Sign out failed: provider unreachable")
        );
    }

    #[test]
    fn test_detail_returns_to_previous_mode() {
        let mut h = Harness::browsing(vec![record(1, "A")]);
        h.act(Action::StartView(record(1, "A")));
        assert_eq!(
            h.app.view.mode,
            Mode::Detail {
                from: DetailOrigin::Browsing
            }
        );
        h.act(Action::CloseDetail);
        assert_eq!(h.app.view.mode, Mode::Browsing);
        assert!(h.app.view.selected.is_none());

        h.act(Action::StartEdit(record(1, "A")));
        h.act(Action::StartView(record(1, "A")));
        h.act(Action::CloseDetail);
        assert_eq!(h.app.view.mode, Mode::Editing);

        h.act(Action::CancelEdit);
        assert_eq!(h.app.view.mode, Mode::Browsing);
        assert!(h.app.view.edit_target.is_none());
    }

    #[test]
    fn test_deleting_selected_record_returns_to_browsing() {
        let mut h = Harness::browsing(vec![record(1, "A"), record(2, "B")]);
        h.act(Action::StartView(record(1, "A")));
        let task = task_of(&h.act(Action::Remove(RecordId(1))));
        h.start(TaskKind::Delete, task, None);

        let generation = h.app.generation();
        let effects = h.complete(
            TaskKind::Delete,
            task,
            AppEvent::Deleted {
                generation,
                id: RecordId(1),
                result: Ok(()),
            },
        );
        assert!(matches!(effects.as_slice(), [AppEffect::FetchRecords { .. }]));
        assert_eq!(h.app.view.mode, Mode::Browsing);
        assert!(h.app.view.selected.is_none());
        assert_eq!(h.app.view.message.as_deref(), Some(MSG_DELETED));
    }

    #[test]
    fn test_delete_not_found_is_benign_and_other_errors_are_not() {
        let mut h = Harness::browsing(vec![record(1, "A")]);
        let generation = h.app.generation();

        update(
            &mut h.app,
            AppEvent::Deleted {
                generation,
                id: RecordId(1),
                result: Err(StoreError::not_found("student 1").into()),
            },
        );
        assert_eq!(h.app.view.message.as_deref(), Some(MSG_DELETED));

        let effects = update(
            &mut h.app,
            AppEvent::Deleted {
                generation,
                id: RecordId(1),
                result: Err(StoreError::unauthorized("denied").into()),
            },
        );
        assert!(effects.is_empty());
        assert_eq!(h.app.view.message.as_deref(), Some(MSG_DELETE_FAILED));
    }

    #[test]
    fn test_failed_fetch_after_sign_in_still_browses() {
        let mut h = Harness::new();
        update(
            &mut h.app,
            AppEvent::SignedIn(Ok(Session::authenticated(identity()))),
        );
        let channel = h.bind();
        update(&mut h.app, AppEvent::ChannelBound(channel));
        let generation = h.app.generation();
        update(
            &mut h.app,
            AppEvent::RecordsFetched {
                generation,
                result: Err(StoreError::transport("connection refused").into()),
            },
        );
        assert_eq!(h.app.view.mode, Mode::Browsing);
        assert!(h.app.view.records.is_empty());
        assert_eq!(h.app.view.message.as_deref(), Some(MSG_FETCH_FAILED));
    }

    #[test]
    fn test_show_list_leaves_form_and_refetches() {
        let mut h = Harness::browsing(vec![record(1, "A")]);
        h.act(Action::StartEdit(record(1, "A")));
        let effects = h.act(Action::ShowList);
        assert!(matches!(effects.as_slice(), [AppEffect::FetchRecords { .. }]));
        assert_eq!(h.app.view.mode, Mode::Browsing);
        assert!(h.app.view.edit_target.is_none());
    }

    #[test]
    fn test_latest_fetch_wins() {
        let mut h = Harness::browsing(vec![]);
        let first = task_of(&h.act(Action::ShowList));
        h.start(TaskKind::ListFetch, first, None);
        let second = task_of(&h.act(Action::ShowList));
        h.start(TaskKind::ListFetch, second, None);

        let generation = h.app.generation();
        h.complete(
            TaskKind::ListFetch,
            first,
            AppEvent::RecordsFetched {
                generation,
                result: Ok(vec![record(1, "Old")]),
            },
        );
        assert!(h.app.view.records.is_empty());

        h.complete(
            TaskKind::ListFetch,
            second,
            AppEvent::RecordsFetched {
                generation,
                result: Ok(vec![record(2, "New")]),
            },
        );
        assert_eq!(h.app.view.records, vec![record(2, "New")]);
    }

    /// The view may only leave `Anonymous` for an authenticated session.
    fn assert_view_follows_session(app: &AppState) {
        assert_eq!(app.session.is_authenticated(), app.session.identity().is_some());
        if app.view.mode != Mode::Anonymous {
            assert!(
                app.session.is_authenticated(),
                "mode {:?} with an anonymous session",
                app.view.mode
            );
        }
        assert_eq!(app.view.principal.as_ref(), app.session.principal());
        if let Some(channel) = &app.channel
            && app.view.mode != Mode::Anonymous
        {
            assert_eq!(channel.principal(), app.session.principal());
        }
    }

    #[test]
    fn test_sign_in_waits_for_session_restore() {
        let mut h = Harness::new();
        let restore = task_of(&update(&mut h.app, AppEvent::Startup));
        h.start(TaskKind::Restore, restore, None);

        assert!(h.act(Action::SignIn).is_empty());

        h.complete(
            TaskKind::Restore,
            restore,
            AppEvent::Restored(Session::anonymous()),
        );
        assert!(matches!(
            h.act(Action::SignIn).as_slice(),
            [AppEffect::SignIn { .. }]
        ));
    }

    #[test]
    fn test_restore_finishing_after_sign_in_is_dropped() {
        let mut h = Harness::new();
        let restore = task_of(&update(&mut h.app, AppEvent::Startup));
        h.start(TaskKind::Restore, restore, None);
        assert_view_follows_session(&h.app);

        // A sign-in that got going before the restore settled.
        let sign_in = h.app.task_seq.next_id();
        h.start(TaskKind::SignIn, sign_in, None);
        h.complete(
            TaskKind::SignIn,
            sign_in,
            AppEvent::SignedIn(Ok(Session::authenticated(identity()))),
        );
        assert_view_follows_session(&h.app);
        let channel = h.bind();
        update(&mut h.app, AppEvent::ChannelBound(channel));
        let generation = h.app.generation();
        update(
            &mut h.app,
            AppEvent::RecordsFetched {
                generation,
                result: Ok(vec![record(1, "A")]),
            },
        );
        assert_eq!(h.app.view.mode, Mode::Browsing);
        assert_view_follows_session(&h.app);

        let effects = h.complete(
            TaskKind::Restore,
            restore,
            AppEvent::Restored(Session::anonymous()),
        );
        assert!(effects.is_empty());
        assert_eq!(h.app.view.mode, Mode::Browsing);
        assert!(h.app.session.is_authenticated());
        assert_eq!(h.app.generation(), generation);
        assert_view_follows_session(&h.app);

        // Record actions still go out on the signed-in channel.
        h.act(Action::StartAdd);
        let effects = h.act(Action::Submit(fields("B")));
        let [AppEffect::CreateRecord {
            channel: Some(channel),
            ..
        }] = effects.as_slice()
        else {
            panic!("expected create effect, got {effects:?}");
        };
        assert_eq!(channel.principal().map(Principal::as_str), Some("2vxsx-fae"));
    }

    #[test]
    fn test_view_follows_session_across_transitions() {
        let mut h = Harness::new();
        let step = |h: &mut Harness, event: AppEvent| {
            let effects = update(&mut h.app, event);
            assert_view_follows_session(&h.app);
            if effects
                .iter()
                .any(|effect| matches!(effect, AppEffect::Bind { .. }))
            {
                let channel = h.bind();
                update(&mut h.app, AppEvent::ChannelBound(channel));
                assert_view_follows_session(&h.app);
            }
        };

        step(&mut h, AppEvent::Restored(Session::authenticated(identity())));
        let generation = h.app.generation();
        step(
            &mut h,
            AppEvent::RecordsFetched {
                generation,
                result: Ok(vec![record(1, "A")]),
            },
        );
        assert_eq!(h.app.view.mode, Mode::Browsing);

        // A second restore or sign-in result while signed in changes nothing.
        step(&mut h, AppEvent::Restored(Session::anonymous()));
        assert!(h.app.session.is_authenticated());

        step(&mut h, AppEvent::SignedOut(Ok(Session::anonymous())));
        assert_eq!(h.app.view.mode, Mode::Anonymous);

        step(
            &mut h,
            AppEvent::SignedIn(Err(ClientError::auth("UserInterrupt"))),
        );
        step(
            &mut h,
            AppEvent::SignedIn(Ok(Session::authenticated(identity()))),
        );
        let generation = h.app.generation();
        step(
            &mut h,
            AppEvent::RecordsFetched {
                generation,
                result: Err(ClientError::Remote(StoreError::transport("down"))),
            },
        );
        assert_eq!(h.app.view.mode, Mode::Browsing);
    }

    #[test]
    fn test_start_edit_from_detail_clears_selection() {
        let mut h = Harness::browsing(vec![record(1, "A"), record(2, "B")]);
        h.act(Action::StartView(record(1, "A")));
        assert!(h.app.view.selected.is_some());

        h.act(Action::StartEdit(record(1, "A")));
        assert_eq!(h.app.view.mode, Mode::Editing);
        assert!(h.app.view.selected.is_none());

        h.act(Action::CancelEdit);
        h.act(Action::StartView(record(2, "B")));
        h.act(Action::StartAdd);
        assert_eq!(h.app.view.mode, Mode::Editing);
        assert!(h.app.view.selected.is_none());
        assert!(h.app.view.edit_target.is_none());
    }
}
