//! Browser-based login against an external identity provider.
//!
//! The provider page is opened with a loopback `redirect_uri`; once the user
//! authenticates, the provider redirects to
//! `http://127.0.0.1:<port>/callback?state=..&principal=..&token=..&expires_in=..`.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::DateTime;
use futures_util::FutureExt;
use roster_types::Principal;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use url::Url;

use super::{AuthFuture, Identity, IdentityProvider, now_millis_u64};
use crate::config::IdentityConfig;
use crate::error::{ClientError, ClientResult};

const CALLBACK_PATH: &str = "/callback";

/// Lifetime assumed when the provider doesn't report one.
const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(8 * 60 * 60);

type UrlNotice = Arc<dyn Fn(&str) + Send + Sync>;

/// Identity provider that drives an interactive browser login.
#[derive(Clone)]
pub struct BrowserIdentityProvider {
    provider_url: String,
    callback_port: u16,
    timeout: Duration,
    open_browser: bool,
    on_url: Option<UrlNotice>,
}

impl fmt::Debug for BrowserIdentityProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrowserIdentityProvider")
            .field("provider_url", &self.provider_url)
            .field("callback_port", &self.callback_port)
            .field("timeout", &self.timeout)
            .field("open_browser", &self.open_browser)
            .finish_non_exhaustive()
    }
}

impl BrowserIdentityProvider {
    pub fn new(provider_url: impl Into<String>) -> Self {
        Self {
            provider_url: provider_url.into(),
            callback_port: 0,
            timeout: Duration::from_secs(120),
            open_browser: true,
            on_url: None,
        }
    }

    /// Builds a provider from the `[identity]` config section.
    pub fn from_config(config: &IdentityConfig) -> Result<Self> {
        Ok(Self::new(config.provider_url()?)
            .with_callback_port(config.callback_port)
            .with_timeout(config.login_timeout()))
    }

    #[must_use]
    pub fn with_callback_port(mut self, port: u16) -> Self {
        self.callback_port = port;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Don't launch a browser; the URL is only reported through `on_url`.
    #[must_use]
    pub fn without_browser(mut self) -> Self {
        self.open_browser = false;
        self
    }

    /// Called with the authorization URL before waiting for the callback.
    #[must_use]
    pub fn on_url(mut self, notice: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_url = Some(Arc::new(notice));
        self
    }

    fn authorize_url(&self, port: u16, state: &str) -> ClientResult<Url> {
        let mut url = Url::parse(&self.provider_url).map_err(|e| {
            ClientError::auth(format!("invalid provider URL '{}': {e}", self.provider_url))
        })?;
        url.query_pairs_mut()
            .append_pair(
                "redirect_uri",
                &format!("http://127.0.0.1:{port}{CALLBACK_PATH}"),
            )
            .append_pair("state", state);
        Ok(url)
    }

    async fn run_login(&self, cancel: CancellationToken) -> ClientResult<Identity> {
        let listener = TcpListener::bind(("127.0.0.1", self.callback_port))
            .await
            .map_err(|e| ClientError::auth(format!("could not start callback listener: {e}")))?;
        let port = listener
            .local_addr()
            .map_err(|e| ClientError::auth(format!("could not start callback listener: {e}")))?
            .port();

        let state = uuid::Uuid::new_v4().to_string();
        let url = self.authorize_url(port, &state)?;
        tracing::info!(port, "waiting for identity provider callback");

        if let Some(notice) = &self.on_url {
            notice(url.as_str());
        }
        if self.open_browser
            && let Err(err) = open::that(url.as_str())
        {
            tracing::warn!(error = %err, "failed to open browser");
        }

        let deadline = tokio::time::sleep(self.timeout);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    return Err(ClientError::auth("sign-in cancelled"));
                }
                () = &mut deadline => {
                    return Err(ClientError::auth("timed out waiting for sign-in"));
                }
                accepted = listener.accept() => {
                    let (stream, _) = accepted.map_err(|e| {
                        ClientError::auth(format!("callback listener failed: {e}"))
                    })?;
                    match handle_connection(stream, &state).await {
                        Callback::Completed(identity) => return Ok(identity),
                        Callback::Failed(reason) => return Err(ClientError::AuthFailure(reason)),
                        Callback::Ignored | Callback::Rejected(_) => {}
                    }
                }
            }
        }
    }
}

impl IdentityProvider for BrowserIdentityProvider {
    fn login(&self, cancel: CancellationToken) -> AuthFuture<'_, Identity> {
        self.run_login(cancel).boxed()
    }

    /// The provider keeps no server-side session for this client.
    fn logout(&self) -> AuthFuture<'_, ()> {
        async { Ok(()) }.boxed()
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Callback {
    /// Not the callback path (e.g. a favicon request).
    Ignored,
    /// Callback with a missing or wrong `state`; keep waiting.
    Rejected(String),
    /// The provider reported an error.
    Failed(String),
    Completed(Identity),
}

async fn handle_connection(mut stream: TcpStream, expected_state: &str) -> Callback {
    let mut buffer = [0u8; 4096];
    let read = stream.read(&mut buffer).await.unwrap_or(0);
    let request = String::from_utf8_lossy(&buffer[..read]);

    let callback = parse_callback(&request, expected_state, now_millis_u64());
    let response = match &callback {
        Callback::Completed(_) => html_response(
            "200 OK",
            "Sign-in complete",
            "You can close this window.",
        ),
        Callback::Failed(reason) => html_response(
            "400 Bad Request",
            "Sign-in failed",
            &escape_html(reason),
        ),
        Callback::Rejected(_) => html_response(
            "400 Bad Request",
            "Sign-in failed",
            "This sign-in link is not valid. Return to the terminal and try again.",
        ),
        Callback::Ignored => html_response("404 Not Found", "Not found", ""),
    };
    if let Err(err) = stream.write_all(response.as_bytes()).await {
        tracing::debug!(error = %err, "failed to write callback response");
    }
    if let Callback::Rejected(reason) = &callback {
        tracing::warn!(%reason, "ignoring callback");
    }
    callback
}

fn parse_callback(request: &str, expected_state: &str, now_millis: u64) -> Callback {
    let Some(path) = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
    else {
        return Callback::Ignored;
    };
    let Ok(url) = Url::parse(&format!("http://localhost{path}")) else {
        return Callback::Ignored;
    };
    if url.path() != CALLBACK_PATH {
        return Callback::Ignored;
    }

    let param = |name: &str| {
        url.query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
            .filter(|v| !v.is_empty())
    };

    match param("state") {
        Some(state) if state == expected_state => {}
        Some(_) => return Callback::Rejected("state mismatch".to_string()),
        None => return Callback::Rejected("missing state".to_string()),
    }

    if let Some(error) = param("error") {
        return Callback::Failed(error);
    }

    let Some(principal) = param("principal") else {
        return Callback::Failed("provider did not return a principal".to_string());
    };
    let Some(token) = param("token") else {
        return Callback::Failed("provider did not return a credential".to_string());
    };

    let expires = if let Some(secs) = param("expires_in") {
        match secs.parse::<u64>() {
            Ok(secs) => now_millis.saturating_add(secs.saturating_mul(1000)),
            Err(_) => return Callback::Failed(format!("invalid expires_in '{secs}'")),
        }
    } else if let Some(at) = param("expires_at") {
        match DateTime::parse_from_rfc3339(&at)
            .ok()
            .and_then(|dt| u64::try_from(dt.timestamp_millis()).ok())
        {
            Some(millis) => millis,
            None => return Callback::Failed(format!("invalid expires_at '{at}'")),
        }
    } else {
        let ttl = u64::try_from(DEFAULT_SESSION_TTL.as_millis()).unwrap_or(u64::MAX);
        now_millis.saturating_add(ttl)
    };

    Callback::Completed(Identity::new(Principal::new(principal), token, expires))
}

fn html_response(status: &str, title: &str, message: &str) -> String {
    let body = format!("<html><body><h3>{title}</h3><p>{message}</p></body></html>");
    format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
