//! Command handlers.
//!
//! Every store-backed command builds a fresh [`Coordinator`], lets it restore
//! the cached session, then drives it with the same actions an interactive
//! front end would send.

pub mod auth;
pub mod config;
pub mod records;

use std::sync::Arc;

use anyhow::{Context, Result};
use roster_app::Coordinator;
use roster_core::config::{Config, paths};
use roster_core::identity::{
    BrowserIdentityProvider, CredentialCache, FixedIdentityProvider, IdentityProvider,
};
use roster_core::logging::{self, WorkerGuard};
use roster_core::store::{HttpConnector, MemoryConnector, MemoryRecordStore};
use roster_core::{Connector, Identity, SessionStore};
use roster_types::Principal;

pub const NOT_SIGNED_IN: &str = "Not signed in. Run `roster login` first.";

const OFFLINE_PRINCIPAL: &str = "offline-demo";

/// Resolved settings shared by store-backed commands.
pub struct Env {
    pub config: Config,
    pub offline: bool,
    _log_guard: Option<WorkerGuard>,
}

impl Env {
    /// Loads config (file, then environment, then `--store-url`) and installs logging.
    pub fn load(store_url: Option<String>, offline: bool) -> Result<Self> {
        let mut config = Config::load().context("load config")?.with_env_overrides();
        if let Some(url) = store_url.filter(|u| !u.trim().is_empty()) {
            config.store.url = url;
        }

        let log_guard =
            logging::init(&config.logging, &paths::roster_home()).context("init logging")?;
        tracing::debug!(store_url = %config.store.url, offline, "configuration loaded");

        Ok(Self {
            config,
            offline,
            _log_guard: log_guard,
        })
    }

    fn coordinator(&self) -> Result<Coordinator> {
        if self.offline {
            let identity = Identity::new(Principal::new(OFFLINE_PRINCIPAL), "offline", u64::MAX);
            let provider = Arc::new(FixedIdentityProvider::accepting(identity));
            let connector = MemoryConnector::new(MemoryRecordStore::new()).require_identity();
            return Ok(Coordinator::new(
                Arc::new(SessionStore::ephemeral(provider)),
                Arc::new(connector),
            ));
        }

        let provider: Arc<dyn IdentityProvider> =
            match BrowserIdentityProvider::from_config(&self.config.identity) {
                Ok(provider) => Arc::new(provider.on_url(|url| {
                    println!("Open this URL in your browser to sign in:\n{url}");
                })),
                // Cached sessions stay usable; only a new sign-in needs the provider.
                Err(err) => Arc::new(FixedIdentityProvider::rejecting(format!("{err:#}"))),
            };
        let connector: Arc<dyn Connector> = Arc::new(
            HttpConnector::from_config(&self.config.store).context("configure record store")?,
        );

        Ok(Coordinator::new(
            Arc::new(SessionStore::new(
                provider,
                CredentialCache::default_location(),
            )),
            connector,
        ))
    }

    /// Starts a coordinator and waits for the cached session to be restored.
    pub async fn open(&self) -> Result<Coordinator> {
        let mut app = self.coordinator()?;
        app.start();
        app.run_until_idle().await;
        Ok(app)
    }

    /// Like [`open`](Self::open), but requires a session and a loaded roster.
    ///
    /// Offline mode signs the demo identity in on the spot.
    pub async fn open_signed_in(&self) -> Result<Coordinator> {
        let mut app = self.open().await?;
        if self.offline && !app.session().is_authenticated() {
            app.perform(roster_app::Action::SignIn).await;
        }
        if !app.session().is_authenticated() {
            anyhow::bail!(NOT_SIGNED_IN);
        }
        // Startup only ever leaves failure messages behind.
        if let Some(message) = &app.view().message {
            anyhow::bail!("{message}");
        }
        Ok(app)
    }
}

/// Prints the status message when it is `expected`, otherwise fails with it.
pub fn expect_message(app: &Coordinator, expected: &str) -> Result<()> {
    match app.view().message.as_deref() {
        Some(message) if message == expected => {
            println!("{message}");
            Ok(())
        }
        Some(message) => anyhow::bail!("{message}"),
        None => anyhow::bail!("No response from the record store"),
    }
}
