use crate::model::{
    id::{EventId, RegistrationId},
    user::RegistrationUser,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

pub mod event;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RegistrationStatus {
    Pending,
    Confirmed,
    Cancelled,
    Inativo,
}

impl RegistrationStatus {
    /// pending → confirmed, pending → cancelled, any → inativo
    pub fn can_transition_to(self, next: RegistrationStatus) -> bool {
        use RegistrationStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed) | (Pending, Cancelled) | (_, Inativo)
        )
    }

    /// Counted against capacity and blocks a second sign-up.
    pub fn is_active(self) -> bool {
        matches!(self, RegistrationStatus::Pending | RegistrationStatus::Confirmed)
    }
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub registration_id: RegistrationId,
    pub status: RegistrationStatus,
    pub created_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub user: RegistrationUser,
    pub event: RegistrationEvent,
}

#[derive(Debug, Clone)]
pub struct RegistrationEvent {
    pub event_id: EventId,
    pub title: String,
    pub location: String,
    pub starts_at: DateTime<Utc>,
}
