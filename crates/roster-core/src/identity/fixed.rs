use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use futures_util::FutureExt;
use tokio_util::sync::CancellationToken;

use super::{AuthFuture, Identity, IdentityProvider};
use crate::error::ClientError;

/// Identity provider with a preset outcome.
///
/// Backs offline mode and tests; no user interaction happens.
#[derive(Debug)]
pub struct FixedIdentityProvider {
    outcome: Mutex<Result<Identity, String>>,
    logout_failure: Mutex<Option<String>>,
    logins: AtomicUsize,
}

impl FixedIdentityProvider {
    /// Every login succeeds with `identity`.
    pub fn accepting(identity: Identity) -> Self {
        Self::with_outcome(Ok(identity))
    }

    /// Every login is rejected with `reason`.
    pub fn rejecting(reason: impl Into<String>) -> Self {
        Self::with_outcome(Err(reason.into()))
    }

    fn with_outcome(outcome: Result<Identity, String>) -> Self {
        Self {
            outcome: Mutex::new(outcome),
            logout_failure: Mutex::new(None),
            logins: AtomicUsize::new(0),
        }
    }

    /// Replaces the outcome of subsequent logins.
    pub fn set_outcome(&self, outcome: Result<Identity, String>) {
        *self.outcome.lock().unwrap_or_else(PoisonError::into_inner) = outcome;
    }

    /// Makes subsequent logouts fail with `reason` (`None` restores success).
    pub fn set_logout_failure(&self, reason: Option<String>) {
        *self
            .logout_failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = reason;
    }

    /// Number of login attempts so far.
    pub fn login_count(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }
}

impl IdentityProvider for FixedIdentityProvider {
    fn login(&self, cancel: CancellationToken) -> AuthFuture<'_, Identity> {
        async move {
            self.logins.fetch_add(1, Ordering::SeqCst);
            if cancel.is_cancelled() {
                return Err(ClientError::auth("sign-in cancelled"));
            }
            self.outcome
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
                .map_err(ClientError::AuthFailure)
        }
        .boxed()
    }

    fn logout(&self) -> AuthFuture<'_, ()> {
        async move {
            match self
                .logout_failure
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
            {
                Some(reason) => Err(ClientError::AuthFailure(reason)),
                None => Ok(()),
            }
        }
        .boxed()
    }
}
