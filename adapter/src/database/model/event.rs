use kernel::model::{
    event::{Event, EventCapacity, DEFAULT_EVENT_CAPACITY},
    id::{EventId, UserId},
    user::EventCreator,
};
use sqlx::types::chrono::{DateTime, Utc};

#[derive(sqlx::FromRow)]
pub struct EventRow {
    pub event_id: EventId,
    pub title: String,
    pub location: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub description: String,
    pub capacity: Option<i32>,
    pub image_url: Option<String>,
    pub created_by: UserId,
    pub creator_name: String,
    pub registered_count: i64,
    pub created_at: DateTime<Utc>,
}

impl From<EventRow> for Event {
    fn from(value: EventRow) -> Self {
        let EventRow {
            event_id,
            title,
            location,
            starts_at,
            ends_at,
            description,
            capacity,
            image_url,
            created_by,
            creator_name,
            registered_count,
            created_at,
        } = value;
        Event {
            event_id,
            title,
            location,
            starts_at,
            ends_at,
            description,
            capacity,
            image_url,
            created_by: EventCreator {
                user_id: created_by,
                user_name: creator_name,
            },
            registered_count,
            created_at,
        }
    }
}

// 更新前の値との突き合わせに使う型
#[derive(sqlx::FromRow)]
pub struct EventScheduleRow {
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
pub struct EventCapacityRow {
    pub event_id: EventId,
    pub capacity: Option<i32>,
    pub registered: i64,
}

impl From<EventCapacityRow> for EventCapacity {
    fn from(value: EventCapacityRow) -> Self {
        EventCapacity {
            event_id: value.event_id,
            capacity: value.capacity.unwrap_or(DEFAULT_EVENT_CAPACITY),
            registered: value.registered,
        }
    }
}
