use crate::model::{id::EventId, user::EventCreator};
use chrono::{DateTime, Utc};

pub mod event;

/// Capacity applied when an event does not declare its own.
pub const DEFAULT_EVENT_CAPACITY: i32 = 66;

#[derive(Debug, Clone)]
pub struct Event {
    pub event_id: EventId,
    pub title: String,
    pub location: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub description: String,
    pub capacity: Option<i32>,
    pub image_url: Option<String>,
    pub created_by: EventCreator,
    /// pending と confirmed の登録数
    pub registered_count: i64,
    pub created_at: DateTime<Utc>,
}

impl Event {
    pub fn effective_capacity(&self) -> i32 {
        self.capacity.unwrap_or(DEFAULT_EVENT_CAPACITY)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventCapacity {
    pub event_id: EventId,
    pub capacity: i32,
    pub registered: i64,
}

impl EventCapacity {
    pub fn available(&self) -> i64 {
        (i64::from(self.capacity) - self.registered).max(0)
    }

    pub fn is_full(&self) -> bool {
        self.registered >= i64::from(self.capacity)
    }
}
