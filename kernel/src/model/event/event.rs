use crate::model::id::{EventId, UserId};
use chrono::{DateTime, Utc};
use derive_new::new;

#[derive(new)]
pub struct CreateEvent {
    pub title: String,
    pub location: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub description: String,
    pub capacity: Option<i32>,
    pub image_url: Option<String>,
    pub created_by: UserId,
}

#[derive(Debug)]
pub struct UpdateEvent {
    pub event_id: EventId,
    pub title: Option<String>,
    pub location: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub description: Option<String>,
    /// `Some(None)` clears an explicit capacity back to the default.
    pub capacity: Option<Option<i32>>,
    pub image_url: Option<String>,
    pub requested_by: UserId,
}

#[derive(Debug, new)]
pub struct DeleteEvent {
    pub event_id: EventId,
    pub requested_by: UserId,
}
