use kernel::model::{id::UserId, role::Role, user::User};
use shared::error::AppError;
use sqlx::types::chrono::{DateTime, Utc};
use std::str::FromStr;

#[derive(sqlx::FromRow)]
pub struct UserRow {
    pub user_id: UserId,
    pub user_name: String,
    pub email: String,
    pub role: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(value: UserRow) -> Result<Self, Self::Error> {
        let UserRow {
            user_id,
            user_name,
            email,
            role,
            phone,
            created_at,
        } = value;
        Ok(User {
            user_id,
            user_name,
            email,
            role: parse_role(&role)?,
            phone,
            created_at,
        })
    }
}

pub(crate) fn parse_role(raw: &str) -> Result<Role, AppError> {
    Role::from_str(raw).map_err(|e| AppError::ConversionEntityError(format!("role {raw}: {e}")))
}

// ログイン時のパスワード照合に使う型
#[derive(sqlx::FromRow)]
pub struct UserCredentialRow {
    pub user_id: UserId,
    pub email: String,
    pub password_hash: String,
}
