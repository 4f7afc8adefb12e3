use crate::model::{id::UserId, role::Role};
use chrono::{DateTime, Utc};

pub mod event;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub user_id: UserId,
    pub user_name: String,
    pub email: String,
    pub role: Role,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct EventCreator {
    pub user_id: UserId,
    pub user_name: String,
}

#[derive(Debug, Clone)]
pub struct RegistrationUser {
    pub user_id: UserId,
    pub user_name: String,
    pub email: String,
}
