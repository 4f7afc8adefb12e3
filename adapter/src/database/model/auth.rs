use kernel::model::{
    auth::{AccessToken, SessionUser},
    id::UserId,
    user::User,
};
use shared::error::AppError;
use sqlx::types::chrono::{DateTime, Utc};

use super::user::parse_role;

// sessions と users を結合して取得する際に使う型
#[derive(sqlx::FromRow)]
pub struct SessionUserRow {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user_id: UserId,
    pub user_name: String,
    pub email: String,
    pub role: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<SessionUserRow> for SessionUser {
    type Error = AppError;

    fn try_from(value: SessionUserRow) -> Result<Self, Self::Error> {
        let SessionUserRow {
            token,
            expires_at,
            user_id,
            user_name,
            email,
            role,
            phone,
            created_at,
        } = value;
        Ok(SessionUser {
            token: AccessToken(token),
            expires_at,
            user: User {
                user_id,
                user_name,
                email,
                role: parse_role(&role)?,
                phone,
                created_at,
            },
        })
    }
}
