//! Record operations over a bound channel.

use roster_types::{RecordId, StudentFields, StudentRecord};

use crate::channel::{Channel, Generation};
use crate::error::{ClientError, ClientResult};

/// Issues record store calls through one channel.
///
/// The client never caches: a mutation is only visible through a later
/// [`list`](Self::list). Every call checks the channel first and performs no
/// remote effect when it is missing or superseded.
#[derive(Debug, Clone)]
pub struct RecordClient {
    channel: Option<Channel>,
}

impl RecordClient {
    pub fn new(channel: Option<Channel>) -> Self {
        Self { channel }
    }

    /// Generation of the channel calls go through, if any.
    pub fn generation(&self) -> Option<Generation> {
        self.channel.as_ref().map(Channel::generation)
    }

    fn channel(&self) -> ClientResult<&Channel> {
        let channel = self.channel.as_ref().ok_or_else(|| {
            tracing::error!("record operation attempted with no channel bound");
            ClientError::NotBound
        })?;
        if !channel.is_current() {
            tracing::debug!(generation = %channel.generation(), "refusing call on superseded channel");
            return Err(ClientError::StaleChannel(channel.generation()));
        }
        Ok(channel)
    }

    pub async fn list(&self) -> ClientResult<Vec<StudentRecord>> {
        let records = self.channel()?.store().list().await?;
        tracing::debug!(count = records.len(), "listed records");
        Ok(records)
    }

    pub async fn create(&self, fields: StudentFields) -> ClientResult<()> {
        Ok(self.channel()?.store().create(fields).await?)
    }

    pub async fn update(&self, id: RecordId, fields: StudentFields) -> ClientResult<()> {
        Ok(self.channel()?.store().update(id, fields).await?)
    }

    pub async fn delete(&self, id: RecordId) -> ClientResult<()> {
        Ok(self.channel()?.store().delete(id).await?)
    }
}
