//! Record operations. Every result is tagged with the generation of the
//! channel it went through.

use roster_core::{Channel, RecordClient};
use roster_types::{RecordId, StudentFields};

use crate::events::{AppEvent, SubmitIntent};

pub async fn fetch_records(channel: Option<Channel>) -> AppEvent {
    let client = RecordClient::new(channel);
    AppEvent::RecordsFetched {
        generation: client.generation(),
        result: client.list().await,
    }
}

pub async fn create_record(channel: Option<Channel>, fields: StudentFields) -> AppEvent {
    let client = RecordClient::new(channel);
    AppEvent::Submitted {
        generation: client.generation(),
        intent: SubmitIntent::Create,
        result: client.create(fields).await,
    }
}

pub async fn update_record(
    channel: Option<Channel>,
    id: RecordId,
    fields: StudentFields,
) -> AppEvent {
    let client = RecordClient::new(channel);
    AppEvent::Submitted {
        generation: client.generation(),
        intent: SubmitIntent::Update(id),
        result: client.update(id, fields).await,
    }
}

pub async fn delete_record(channel: Option<Channel>, id: RecordId) -> AppEvent {
    let client = RecordClient::new(channel);
    AppEvent::Deleted {
        generation: client.generation(),
        id,
        result: client.delete(id).await,
    }
}
