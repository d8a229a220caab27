use std::sync::Arc;

use roster_core::SessionStore;
use tokio_util::sync::CancellationToken;

use crate::events::AppEvent;

/// Restores the previous session. Never fails.
pub async fn restore_session(sessions: Arc<SessionStore>) -> AppEvent {
    AppEvent::Restored(sessions.restore().await)
}

/// Runs the interactive sign-in until it resolves or `cancel` fires.
pub async fn sign_in(sessions: Arc<SessionStore>, cancel: Option<CancellationToken>) -> AppEvent {
    let cancel = cancel.unwrap_or_default();
    AppEvent::SignedIn(sessions.sign_in_cancellable(cancel).await)
}

pub async fn sign_out(sessions: Arc<SessionStore>) -> AppEvent {
    AppEvent::SignedOut(sessions.sign_out().await)
}
