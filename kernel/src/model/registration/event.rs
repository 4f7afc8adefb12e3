use crate::model::{
    id::{EventId, RegistrationId, UserId},
    registration::RegistrationStatus,
};
use derive_new::new;

#[derive(new)]
pub struct CreateRegistration {
    pub event_id: EventId,
    pub user_id: UserId,
}

#[derive(new)]
pub struct CancelRegistration {
    pub event_id: EventId,
    pub user_id: UserId,
}

#[derive(new)]
pub struct UpdateRegistrationStatus {
    pub registration_id: RegistrationId,
    pub status: RegistrationStatus,
    pub requested_by: UserId,
}
