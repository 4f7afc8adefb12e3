use chrono::{DateTime, Utc};
use derive_new::new;
use garde::Validate;
use kernel::model::{
    event::{
        event::{CreateEvent, UpdateEvent},
        Event, EventCapacity,
    },
    id::{EventId, UserId},
    user::EventCreator,
};
use serde::{Deserialize, Deserializer, Serialize};
use shared::error::{AppError, AppResult};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    #[garde(length(min = 1, max = 200))]
    pub title: String,
    #[garde(length(min = 1, max = 200))]
    pub location: String,
    #[garde(skip)]
    pub starts_at: DateTime<Utc>,
    #[garde(skip)]
    pub ends_at: DateTime<Utc>,
    #[serde(default)]
    #[garde(skip)]
    pub description: String,
    #[garde(range(min = 0))]
    pub capacity: Option<i32>,
    #[garde(url)]
    pub image_url: Option<String>,
}

impl CreateEventRequest {
    pub fn check_schedule(&self) -> AppResult<()> {
        ensure_ordered(self.starts_at, self.ends_at)
    }
}

#[derive(new)]
pub struct CreateEventRequestWithCreator(UserId, CreateEventRequest);
impl From<CreateEventRequestWithCreator> for CreateEvent {
    fn from(value: CreateEventRequestWithCreator) -> Self {
        let CreateEventRequestWithCreator(
            created_by,
            CreateEventRequest {
                title,
                location,
                starts_at,
                ends_at,
                description,
                capacity,
                image_url,
            },
        ) = value;
        CreateEvent {
            title,
            location,
            starts_at,
            ends_at,
            description,
            capacity,
            image_url,
            created_by,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    #[garde(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[garde(length(min = 1, max = 200))]
    pub location: Option<String>,
    #[garde(skip)]
    pub starts_at: Option<DateTime<Utc>>,
    #[garde(skip)]
    pub ends_at: Option<DateTime<Utc>>,
    #[garde(skip)]
    pub description: Option<String>,
    // 省略は変更なし、null は既定の定員に戻す
    #[serde(default, deserialize_with = "present_or_null")]
    #[garde(custom(non_negative_capacity))]
    pub capacity: Option<Option<i32>>,
    #[garde(url)]
    pub image_url: Option<String>,
}

impl UpdateEventRequest {
    // 片方だけ指定された場合の整合性はリポジトリ側で確認する
    pub fn check_schedule(&self) -> AppResult<()> {
        match (self.starts_at, self.ends_at) {
            (Some(starts_at), Some(ends_at)) => ensure_ordered(starts_at, ends_at),
            _ => Ok(()),
        }
    }
}

#[derive(new)]
pub struct UpdateEventRequestWithIds(EventId, UserId, UpdateEventRequest);
impl From<UpdateEventRequestWithIds> for UpdateEvent {
    fn from(value: UpdateEventRequestWithIds) -> Self {
        let UpdateEventRequestWithIds(
            event_id,
            requested_by,
            UpdateEventRequest {
                title,
                location,
                starts_at,
                ends_at,
                description,
                capacity,
                image_url,
            },
        ) = value;
        UpdateEvent {
            event_id,
            title,
            location,
            starts_at,
            ends_at,
            description,
            capacity,
            image_url,
            requested_by,
        }
    }
}

fn present_or_null<'de, D>(deserializer: D) -> Result<Option<Option<i32>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<i32>::deserialize(deserializer).map(Some)
}

fn non_negative_capacity(value: &Option<Option<i32>>, _: &()) -> garde::Result {
    match value {
        Some(Some(capacity)) if *capacity < 0 => Err(garde::Error::new("lower than 0")),
        _ => Ok(()),
    }
}

fn ensure_ordered(starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> AppResult<()> {
    if ends_at < starts_at {
        return Err(AppError::BadRequest(
            "A data de fim deve ser posterior à data de início".into(),
        ));
    }
    Ok(())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedEventResponse {
    pub event_id: EventId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsResponse {
    pub items: Vec<EventResponse>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResponse {
    pub event_id: EventId,
    pub title: String,
    pub location: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub description: String,
    pub capacity: i32,
    pub image_url: Option<String>,
    pub created_by: EventCreatorResponse,
    pub registered_count: i64,
    pub created_at: DateTime<Utc>,
}

impl From<Event> for EventResponse {
    fn from(value: Event) -> Self {
        let capacity = value.effective_capacity();
        let Event {
            event_id,
            title,
            location,
            starts_at,
            ends_at,
            description,
            image_url,
            created_by,
            registered_count,
            created_at,
            ..
        } = value;
        Self {
            event_id,
            title,
            location,
            starts_at,
            ends_at,
            description,
            capacity,
            image_url,
            created_by: created_by.into(),
            registered_count,
            created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventCreatorResponse {
    pub user_id: UserId,
    pub user_name: String,
}

impl From<EventCreator> for EventCreatorResponse {
    fn from(value: EventCreator) -> Self {
        let EventCreator { user_id, user_name } = value;
        Self { user_id, user_name }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventCapacityResponse {
    pub event_id: EventId,
    pub capacity: i32,
    pub registered: i64,
    pub available: i64,
    pub is_full: bool,
}

impl From<EventCapacity> for EventCapacityResponse {
    fn from(value: EventCapacity) -> Self {
        Self {
            event_id: value.event_id,
            capacity: value.capacity,
            registered: value.registered,
            available: value.available(),
            is_full: value.is_full(),
        }
    }
}
