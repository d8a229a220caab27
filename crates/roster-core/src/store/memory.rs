use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures_util::FutureExt;
use roster_types::{RecordId, StudentFields, StudentRecord};

use super::{RecordStore, StoreFuture};
use crate::channel::Connector;
use crate::error::{ClientResult, StoreError, StoreResult};
use crate::identity::Identity;

#[derive(Debug, Default)]
struct Inner {
    next_id: u64,
    records: Vec<StudentRecord>,
}

/// In-process record store.
///
/// Ids come from a counter and are never reused; records keep insertion order.
/// Clones share the same roster.
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordStore {
    inner: Arc<Mutex<Inner>>,
    latency: Option<Duration>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every call, to keep operations in flight in tests.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Current roster, without going through a channel.
    pub fn snapshot(&self) -> Vec<StudentRecord> {
        self.lock(|inner| inner.records.clone())
    }

    fn lock<T>(&self, f: impl FnOnce(&mut Inner) -> T) -> T {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    async fn delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn insert(&self, fields: StudentFields) -> RecordId {
        self.lock(|inner| {
            inner.next_id += 1;
            let id = RecordId(inner.next_id);
            inner.records.push(StudentRecord::new(id, fields));
            id
        })
    }

    fn replace(&self, id: RecordId, fields: StudentFields) -> StoreResult<()> {
        self.lock(|inner| {
            let record = inner
                .records
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or_else(|| StoreError::not_found(format!("student {id}")))?;
            record.fields = fields;
            Ok(())
        })
    }

    fn remove(&self, id: RecordId) -> StoreResult<()> {
        self.lock(|inner| {
            let pos = inner
                .records
                .iter()
                .position(|r| r.id == id)
                .ok_or_else(|| StoreError::not_found(format!("student {id}")))?;
            inner.records.remove(pos);
            Ok(())
        })
    }
}

impl RecordStore for MemoryRecordStore {
    fn list(&self) -> StoreFuture<'_, Vec<StudentRecord>> {
        async move {
            self.delay().await;
            Ok(self.snapshot())
        }
        .boxed()
    }

    fn create(&self, fields: StudentFields) -> StoreFuture<'_, ()> {
        async move {
            self.delay().await;
            let id = self.insert(fields);
            tracing::debug!(%id, "created record");
            Ok(())
        }
        .boxed()
    }

    fn update(&self, id: RecordId, fields: StudentFields) -> StoreFuture<'_, ()> {
        async move {
            self.delay().await;
            self.replace(id, fields)
        }
        .boxed()
    }

    fn delete(&self, id: RecordId) -> StoreFuture<'_, ()> {
        async move {
            self.delay().await;
            self.remove(id)
        }
        .boxed()
    }
}

/// Connects every identity to one shared [`MemoryRecordStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    store: MemoryRecordStore,
    require_identity: bool,
}

impl MemoryConnector {
    pub fn new(store: MemoryRecordStore) -> Self {
        Self {
            store,
            require_identity: false,
        }
    }

    /// Anonymous channels get a store that answers every call with `Unauthorized`.
    #[must_use]
    pub fn require_identity(mut self) -> Self {
        self.require_identity = true;
        self
    }

    pub fn store(&self) -> &MemoryRecordStore {
        &self.store
    }
}

impl Connector for MemoryConnector {
    fn connect(&self, identity: Option<&Identity>) -> ClientResult<Arc<dyn RecordStore>> {
        if identity.is_none() && self.require_identity {
            return Ok(Arc::new(Unauthorized));
        }
        Ok(Arc::new(self.store.clone()))
    }
}

/// Store seen by anonymous callers when the roster requires an identity.
#[derive(Debug)]
struct Unauthorized;

impl Unauthorized {
    fn reject<T: Send + 'static>() -> StoreFuture<'static, T> {
        async { Err(StoreError::unauthorized("sign in to access student records")) }.boxed()
    }
}

impl RecordStore for Unauthorized {
    fn list(&self) -> StoreFuture<'_, Vec<StudentRecord>> {
        Self::reject()
    }

    fn create(&self, _fields: StudentFields) -> StoreFuture<'_, ()> {
        Self::reject()
    }

    fn update(&self, _id: RecordId, _fields: StudentFields) -> StoreFuture<'_, ()> {
        Self::reject()
    }

    fn delete(&self, _id: RecordId) -> StoreFuture<'_, ()> {
        Self::reject()
    }
}
