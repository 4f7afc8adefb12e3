use crate::model::user::User;
use chrono::{DateTime, Utc};

/// Opaque session token as carried by the `auth-session` cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken(pub String);

impl AccessToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub token: AccessToken,
    pub expires_at: DateTime<Utc>,
}

/// A validated session together with the user owning it.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub token: AccessToken,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}
