//! Core Roster library: identity-scoped access to a remote student record store.
//!
//! Leaf-first:
//! - [`session`]: sign-in state, restored from the credential cache.
//! - [`channel`]: binds an identity to a record store transport, one generation at a time.
//! - [`client`]: record operations over a bound channel.
//!
//! The view state coordinator that drives these lives in `roster-app`.

pub mod channel;
pub mod client;
pub mod config;
pub mod error;
pub mod identity;
pub mod logging;
pub mod session;
pub mod store;

pub use channel::{Channel, ChannelBinder, Connector, Generation};
pub use client::RecordClient;
pub use error::{ClientError, ClientResult, StoreError, StoreErrorKind, StoreResult};
pub use identity::{Identity, IdentityProvider};
pub use session::{Session, SessionStore};
pub use store::RecordStore;
