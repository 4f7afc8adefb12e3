use chrono::{DateTime, Utc};
use derive_new::new;
use kernel::model::{
    id::{EventId, RegistrationId, UserId},
    registration::{event::UpdateRegistrationStatus, Registration, RegistrationStatus},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationListQuery {
    pub event_id: Option<EventId>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRegistrationStatusRequest {
    pub status: RegistrationStatus,
}

#[derive(new)]
pub struct UpdateRegistrationStatusRequestWithIds(
    RegistrationId,
    UserId,
    UpdateRegistrationStatusRequest,
);
impl From<UpdateRegistrationStatusRequestWithIds> for UpdateRegistrationStatus {
    fn from(value: UpdateRegistrationStatusRequestWithIds) -> Self {
        let UpdateRegistrationStatusRequestWithIds(
            registration_id,
            requested_by,
            UpdateRegistrationStatusRequest { status },
        ) = value;
        UpdateRegistrationStatus::new(registration_id, status, requested_by)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationsResponse {
    pub items: Vec<RegistrationResponse>,
}

impl From<Vec<Registration>> for RegistrationsResponse {
    fn from(value: Vec<Registration>) -> Self {
        Self {
            items: value.into_iter().map(RegistrationResponse::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResponse {
    pub registration_id: RegistrationId,
    pub status: RegistrationStatus,
    pub created_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub user: RegisteredUser,
    pub event: RegisteredEvent,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredUser {
    pub user_id: UserId,
    pub user_name: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredEvent {
    pub event_id: EventId,
    pub title: String,
    pub location: String,
    pub starts_at: DateTime<Utc>,
}

impl From<Registration> for RegistrationResponse {
    fn from(value: Registration) -> Self {
        let Registration {
            registration_id,
            status,
            created_at,
            confirmed_at,
            user,
            event,
        } = value;
        Self {
            registration_id,
            status,
            created_at,
            confirmed_at,
            user: RegisteredUser {
                user_id: user.user_id,
                user_name: user.user_name,
                email: user.email,
            },
            event: RegisteredEvent {
                event_id: event.event_id,
                title: event.title,
                location: event.location,
                starts_at: event.starts_at,
            },
        }
    }
}
