//! Channel binding.
//!
//! A [`Channel`] ties a record store transport to one identity (or to none).
//! The [`ChannelBinder`] owns the current generation. Every successful
//! [`bind`](ChannelBinder::bind) hands out a channel under the next
//! [`Generation`], and all channels handed out earlier report themselves stale.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use roster_types::Principal;

use crate::error::ClientResult;
use crate::identity::Identity;
use crate::store::RecordStore;

/// Monotonic tag of a channel binding. The first bind is generation 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Builds the record store transport for an identity.
pub trait Connector: Send + Sync {
    /// `None` asks for an anonymous transport.
    fn connect(&self, identity: Option<&Identity>) -> ClientResult<Arc<dyn RecordStore>>;
}

/// An authorized conduit to the record store. Never mutated after construction.
#[derive(Clone)]
pub struct Channel {
    generation: Generation,
    principal: Option<Principal>,
    store: Arc<dyn RecordStore>,
    current: Arc<AtomicU64>,
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("generation", &self.generation)
            .field("principal", &self.principal)
            .field("current", &self.is_current())
            .finish_non_exhaustive()
    }
}

impl Channel {
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Principal the channel is scoped to; `None` for an anonymous channel.
    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    /// False once a later bind has superseded this channel.
    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::SeqCst) == self.generation.0
    }

    pub(crate) fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }
}

/// Issues channels; only the most recently bound one is current.
pub struct ChannelBinder {
    connector: Arc<dyn Connector>,
    current: Arc<AtomicU64>,
}

impl fmt::Debug for ChannelBinder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelBinder")
            .field("generation", &self.current.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl ChannelBinder {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            current: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Binds a new channel for `identity` and makes it the active one.
    ///
    /// If the connector fails, the previously active channel stays active and
    /// no generation is consumed.
    pub fn bind(&mut self, identity: Option<&Identity>) -> ClientResult<Channel> {
        let store = self.connector.connect(identity).inspect_err(|err| {
            tracing::warn!(error = %err, "channel bind failed; keeping previous channel");
        })?;

        let generation = Generation(self.current.load(Ordering::SeqCst) + 1);
        let channel = Channel {
            generation,
            principal: identity.map(|id| id.principal().clone()),
            store,
            current: Arc::clone(&self.current),
        };
        self.current.store(generation.0, Ordering::SeqCst);

        tracing::info!(
            %generation,
            principal = channel.principal().map_or("anonymous", Principal::as_str),
            "channel bound"
        );
        Ok(channel)
    }

}
