//! Session Store: who, if anyone, is signed in.
//!
//! A [`Session`] only holds `Option<Identity>`, so "authenticated" and
//! "has an identity" cannot disagree. The [`SessionStore`] drives transitions
//! through an [`IdentityProvider`] and mirrors the identity into a
//! [`CredentialCache`] so the next start can restore it.

use std::sync::{Arc, Mutex, PoisonError};

use roster_types::Principal;
use tokio_util::sync::CancellationToken;

use crate::error::ClientResult;
use crate::identity::{CredentialCache, Identity, IdentityProvider};

/// Authentication status plus the current identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    identity: Option<Identity>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self { identity: None }
    }

    pub fn authenticated(identity: Identity) -> Self {
        Self {
            identity: Some(identity),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.identity.as_ref().map(Identity::principal)
    }
}

pub struct SessionStore {
    provider: Arc<dyn IdentityProvider>,
    cache: Option<CredentialCache>,
    session: Mutex<Session>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("cache", &self.cache)
            .field("session", &self.current())
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    pub fn new(provider: Arc<dyn IdentityProvider>, cache: CredentialCache) -> Self {
        Self {
            provider,
            cache: Some(cache),
            session: Mutex::new(Session::anonymous()),
        }
    }

    /// A store that never touches the disk; `restore` finds no cached session.
    pub fn ephemeral(provider: Arc<dyn IdentityProvider>) -> Self {
        Self {
            provider,
            cache: None,
            session: Mutex::new(Session::anonymous()),
        }
    }

    pub fn current(&self) -> Session {
        self.session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set(&self, session: Session) -> Session {
        *self.session.lock().unwrap_or_else(PoisonError::into_inner) = session.clone();
        session
    }

    /// Restores a still-valid session from the credential cache.
    ///
    /// Never fails: a missing, unreadable or expired cache gives an anonymous
    /// session. Expired caches are deleted. A session that is already signed
    /// in is returned as is.
    pub async fn restore(&self) -> Session {
        let current = self.current();
        if current.is_authenticated() {
            tracing::debug!("already signed in; skipping restore");
            return current;
        }

        let Some(cache) = &self.cache else {
            return self.set(Session::anonymous());
        };

        let identity = match cache.load() {
            Ok(identity) => identity,
            Err(err) => {
                tracing::warn!(
                    error = format!("{err:#}"),
                    "ignoring unreadable credential cache"
                );
                None
            }
        };

        let session = match identity {
            Some(identity) if identity.is_expired() => {
                tracing::info!(principal = %identity.principal(), "cached session expired");
                if let Err(err) = cache.clear() {
                    tracing::warn!(
                        error = format!("{err:#}"),
                        "failed to remove expired credentials"
                    );
                }
                Session::anonymous()
            }
            Some(identity) => {
                tracing::info!(principal = %identity.principal(), "session restored");
                Session::authenticated(identity)
            }
            None => Session::anonymous(),
        };
        self.set(session)
    }

    /// Interactive sign-in. On failure the session is left unchanged.
    pub async fn sign_in(&self) -> ClientResult<Session> {
        self.sign_in_cancellable(CancellationToken::new()).await
    }

    /// Sign-in that gives up when `cancel` fires.
    pub async fn sign_in_cancellable(&self, cancel: CancellationToken) -> ClientResult<Session> {
        let identity = self.provider.login(cancel).await.inspect_err(|err| {
            tracing::info!(error = %err, "sign-in failed");
        })?;

        if let Some(cache) = &self.cache
            && let Err(err) = cache.save(&identity)
        {
            tracing::warn!(error = format!("{err:#}"), "failed to cache credentials");
        }

        tracing::info!(principal = %identity.principal(), "signed in");
        Ok(self.set(Session::authenticated(identity)))
    }

    /// Signs out with the provider and forgets the cached credentials.
    ///
    /// Already anonymous: no-op. On provider failure the session is unchanged.
    pub async fn sign_out(&self) -> ClientResult<Session> {
        let current = self.current();
        let Some(identity) = current.identity() else {
            return Ok(current);
        };

        self.provider.logout().await.inspect_err(|err| {
            tracing::info!(error = %err, "sign-out failed");
        })?;

        if let Some(cache) = &self.cache
            && let Err(err) = cache.clear()
        {
            tracing::warn!(
                error = format!("{err:#}"),
                "failed to remove cached credentials"
            );
        }

        tracing::info!(principal = %identity.principal(), "signed out");
        Ok(self.set(Session::anonymous()))
    }
}
