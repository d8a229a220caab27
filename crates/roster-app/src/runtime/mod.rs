//! Coordinator runtime: owns state, executes effects.
//!
//! This is the "Elm runtime" boundary: all side effects happen here.
//! The reducer stays pure and produces effects; this module executes them.
//!
//! ## Inbox Pattern
//!
//! - Spawned handlers send their result (wrapped in `TaskCompleted`) to `inbox_tx`
//! - `run_until_idle` drains `inbox_rx` until no task is in flight
//! - `TaskStarted` and channel binding are dispatched synchronously, so the
//!   reducer sees a task as running before the next action arrives

mod handlers;
mod inbox;

use std::future::Future;
use std::sync::Arc;

use inbox::{AppEventReceiver, AppEventSender};
use roster_core::{ChannelBinder, Connector, Session, SessionStore};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::common::{TaskCompleted, TaskId, TaskKind, TaskStarted};
use crate::effects::AppEffect;
use crate::events::{Action, AppEvent};
use crate::state::{AppState, ViewState};
use crate::update;

/// View State Coordinator.
///
/// Holds the session store, the channel binder and the application state.
/// The presentation layer calls [`dispatch`](Self::dispatch) and reads
/// [`view`](Self::view).
pub struct Coordinator {
    /// Application state.
    pub state: AppState,
    sessions: Arc<SessionStore>,
    binder: ChannelBinder,
    /// Inbox sender - handlers send events here.
    inbox_tx: AppEventSender,
    /// Inbox receiver - drained by `run_until_idle`.
    inbox_rx: AppEventReceiver,
    /// Spawned tasks whose completion hasn't been received yet.
    in_flight: usize,
}

impl Coordinator {
    pub fn new(sessions: Arc<SessionStore>, connector: Arc<dyn Connector>) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        Self {
            state: AppState::new(),
            sessions,
            binder: ChannelBinder::new(connector),
            inbox_tx,
            inbox_rx,
            in_flight: 0,
        }
    }

    pub fn view(&self) -> &ViewState {
        &self.state.view
    }

    pub fn session(&self) -> &Session {
        &self.state.session
    }

    /// Starts restoring the previous session.
    pub fn start(&mut self) {
        self.dispatch_event(AppEvent::Startup);
    }

    /// Applies a presentation action. Async work it starts keeps running
    /// until [`run_until_idle`](Self::run_until_idle) collects it.
    pub fn dispatch(&mut self, action: Action) {
        self.dispatch_event(AppEvent::Action(action));
    }

    /// Dispatches `action` and waits for everything it started.
    pub async fn perform(&mut self, action: Action) {
        self.dispatch(action);
        self.run_until_idle().await;
    }

    pub fn is_idle(&self) -> bool {
        self.in_flight == 0
    }

    /// Processes inbox events until no task is in flight.
    pub async fn run_until_idle(&mut self) {
        while !self.is_idle() {
            if !self.next_event().await {
                break;
            }
        }
    }

    /// Waits for and processes one inbox event. Returns false when idle.
    pub async fn next_event(&mut self) -> bool {
        if self.is_idle() {
            return false;
        }
        let Some(event) = self.inbox_rx.recv().await else {
            return false;
        };
        if matches!(event, AppEvent::TaskCompleted { .. }) {
            self.in_flight = self.in_flight.saturating_sub(1);
        }
        self.dispatch_event(event);
        true
    }

    // ========================================================================
    // Effect Dispatch
    // ========================================================================

    fn dispatch_event(&mut self, event: AppEvent) {
        let effects = update::update(&mut self.state, event);
        self.execute_effects(effects);
    }

    fn execute_effects(&mut self, effects: Vec<AppEffect>) {
        for effect in effects {
            self.execute_effect(effect);
        }
    }

    /// Spawns an async task with a uniform TaskStarted/TaskCompleted lifecycle.
    fn spawn_task<F, Fut>(&mut self, kind: TaskKind, id: TaskId, cancelable: bool, f: F)
    where
        F: FnOnce(Option<CancellationToken>) -> Fut + Send + 'static,
        Fut: Future<Output = AppEvent> + Send + 'static,
    {
        let cancel = cancelable.then(CancellationToken::new);
        let started = TaskStarted {
            id,
            cancel: cancel.clone(),
        };
        self.dispatch_event(AppEvent::TaskStarted { kind, started });

        self.in_flight += 1;
        let tx = self.inbox_tx.clone();
        tokio::spawn(async move {
            let inner = f(cancel).await;
            let completed = TaskCompleted {
                id,
                result: Box::new(inner),
            };
            let _ = tx.send(AppEvent::TaskCompleted { kind, completed });
        });
    }

    fn execute_effect(&mut self, effect: AppEffect) {
        match effect {
            AppEffect::RestoreSession { task } => {
                let sessions = Arc::clone(&self.sessions);
                self.spawn_task(TaskKind::Restore, task, false, move |_| {
                    handlers::restore_session(sessions)
                });
            }
            AppEffect::SignIn { task } => {
                let sessions = Arc::clone(&self.sessions);
                self.spawn_task(TaskKind::SignIn, task, true, move |cancel| {
                    handlers::sign_in(sessions, cancel)
                });
            }
            AppEffect::SignOut { task } => {
                let sessions = Arc::clone(&self.sessions);
                self.spawn_task(TaskKind::SignOut, task, false, move |_| {
                    handlers::sign_out(sessions)
                });
            }
            AppEffect::CancelTask { token } => {
                if let Some(cancel) = token {
                    cancel.cancel();
                }
            }

            AppEffect::Bind { identity } => {
                let event = match self.binder.bind(identity.as_ref()) {
                    Ok(channel) => AppEvent::ChannelBound(channel),
                    Err(err) => AppEvent::BindFailed(err),
                };
                self.dispatch_event(event);
            }

            AppEffect::FetchRecords { task, channel } => {
                self.spawn_task(TaskKind::ListFetch, task, false, move |_| {
                    handlers::fetch_records(channel)
                });
            }
            AppEffect::CreateRecord {
                task,
                channel,
                fields,
            } => {
                self.spawn_task(TaskKind::Submit, task, false, move |_| {
                    handlers::create_record(channel, fields)
                });
            }
            AppEffect::UpdateRecord {
                task,
                channel,
                id,
                fields,
            } => {
                self.spawn_task(TaskKind::Submit, task, false, move |_| {
                    handlers::update_record(channel, id, fields)
                });
            }
            AppEffect::DeleteRecord { task, channel, id } => {
                self.spawn_task(TaskKind::Delete, task, false, move |_| {
                    handlers::delete_record(channel, id)
                });
            }
        }
    }
}
