use async_trait::async_trait;
use shared::error::AppResult;

use crate::model::{
    event::{
        event::{CreateEvent, DeleteEvent, UpdateEvent},
        Event, EventCapacity,
    },
    id::EventId,
};

#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn create(&self, event: CreateEvent) -> AppResult<EventId>;
    async fn find_all(&self) -> AppResult<Vec<Event>>;
    async fn find_by_id(&self, event_id: EventId) -> AppResult<Option<Event>>;
    async fn update(&self, event: UpdateEvent) -> AppResult<()>;
    async fn delete(&self, event: DeleteEvent) -> AppResult<()>;
    async fn capacity(&self, event_id: EventId) -> AppResult<EventCapacity>;
}
