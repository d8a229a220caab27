//! Remote record store boundary.
//!
//! A store is only ever reached through a bound [`Channel`](crate::Channel);
//! the connector that built the channel decides which implementation backs it.

mod http;
mod memory;

use std::future::Future;
use std::pin::Pin;

use roster_types::{RecordId, StudentFields, StudentRecord};

pub use http::{HttpConnector, HttpRecordStore};
pub use memory::{MemoryConnector, MemoryRecordStore};

use crate::error::StoreResult;

/// Future returned by record store calls.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = StoreResult<T>> + Send + 'a>>;

/// The four operations of the remote record store.
pub trait RecordStore: Send + Sync {
    /// Full roster snapshot, in the store's order.
    fn list(&self) -> StoreFuture<'_, Vec<StudentRecord>>;

    /// Adds a record; the store assigns its id.
    fn create(&self, fields: StudentFields) -> StoreFuture<'_, ()>;

    /// Replaces every field of record `id`.
    fn update(&self, id: RecordId, fields: StudentFields) -> StoreFuture<'_, ()>;

    fn delete(&self, id: RecordId) -> StoreFuture<'_, ()>;
}
