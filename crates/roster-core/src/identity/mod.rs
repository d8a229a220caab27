//! Identity provider boundary.
//!
//! An [`Identity`] is what a successful login yields: the principal plus the
//! credential the channel presents to the record store. Tokens are never
//! logged or displayed.

mod browser;
mod credentials;
mod fixed;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use roster_types::Principal;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

pub use browser::BrowserIdentityProvider;
pub use credentials::CredentialCache;
pub use fixed::FixedIdentityProvider;

use crate::error::ClientResult;

pub(crate) fn now_millis_u64() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|d| u64::try_from(d.as_millis()).ok())
        .unwrap_or(u64::MAX)
}

/// The authenticated user's principal and credential.
///
/// Fields are private: an identity is replaced wholesale, never edited.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    principal: Principal,
    token: String,
    /// Expiry timestamp in milliseconds since epoch
    expires: u64,
}

impl Identity {
    pub fn new(principal: Principal, token: impl Into<String>, expires: u64) -> Self {
        Self {
            principal,
            token: token.into(),
            expires,
        }
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    /// Credential presented to the record store.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Expiry in milliseconds since epoch.
    pub fn expires_millis(&self) -> u64 {
        self.expires
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        i64::try_from(self.expires)
            .ok()
            .and_then(DateTime::from_timestamp_millis)
    }

    /// Returns true if the credential is expired.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(now_millis_u64())
    }

    pub fn is_expired_at(&self, now_millis: u64) -> bool {
        now_millis >= self.expires
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("principal", &self.principal)
            .field("token", &"<redacted>")
            .field("expires", &self.expires)
            .finish()
    }
}

/// Future returned by identity provider calls.
pub type AuthFuture<'a, T> = Pin<Box<dyn Future<Output = ClientResult<T>> + Send + 'a>>;

/// External identity provider: one interactive login, one logout.
///
/// Failures are `ClientError::AuthFailure`.
pub trait IdentityProvider: Send + Sync {
    /// Runs the interactive login flow until it completes, fails, or `cancel` fires.
    fn login(&self, cancel: CancellationToken) -> AuthFuture<'_, Identity>;

    /// Invalidates the session with the provider.
    fn logout(&self) -> AuthFuture<'_, ()>;
}
