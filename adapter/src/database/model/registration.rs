use kernel::model::{
    id::{EventId, RegistrationId, UserId},
    registration::{Registration, RegistrationEvent, RegistrationStatus},
    user::RegistrationUser,
};
use shared::error::AppError;
use sqlx::types::chrono::{DateTime, Utc};
use std::str::FromStr;

// 参加登録の一覧を取得する際に使う型（users, events と結合済み）
#[derive(sqlx::FromRow)]
pub struct RegistrationRow {
    pub registration_id: RegistrationId,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub user_id: UserId,
    pub user_name: String,
    pub email: String,
    pub event_id: EventId,
    pub title: String,
    pub location: String,
    pub starts_at: DateTime<Utc>,
}

impl TryFrom<RegistrationRow> for Registration {
    type Error = AppError;

    fn try_from(value: RegistrationRow) -> Result<Self, Self::Error> {
        let RegistrationRow {
            registration_id,
            status,
            created_at,
            confirmed_at,
            user_id,
            user_name,
            email,
            event_id,
            title,
            location,
            starts_at,
        } = value;
        Ok(Registration {
            registration_id,
            status: parse_status(&status)?,
            created_at,
            confirmed_at,
            user: RegistrationUser {
                user_id,
                user_name,
                email,
            },
            event: RegistrationEvent {
                event_id,
                title,
                location,
                starts_at,
            },
        })
    }
}

// 登録状態を確認するための型
#[derive(sqlx::FromRow)]
pub struct RegistrationStateRow {
    pub registration_id: RegistrationId,
    pub status: String,
}

impl RegistrationStateRow {
    pub fn status(&self) -> Result<RegistrationStatus, AppError> {
        parse_status(&self.status)
    }
}

fn parse_status(raw: &str) -> Result<RegistrationStatus, AppError> {
    RegistrationStatus::from_str(raw)
        .map_err(|e| AppError::ConversionEntityError(format!("registration status {raw}: {e}")))
}
