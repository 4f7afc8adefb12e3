use async_trait::async_trait;
use shared::error::AppResult;

use crate::model::{
    auth::{AccessToken, Session, SessionUser},
    id::UserId,
};

#[async_trait]
pub trait AuthRepository: Send + Sync {
    /// Returns `InvalidCredentials` for an unknown email and for a wrong
    /// password alike.
    async fn verify_user(&self, email: &str, password: &str) -> AppResult<UserId>;
    async fn create_session(&self, user_id: UserId) -> AppResult<Session>;
    /// Only sessions with `valid = true` and an expiry in the future resolve.
    async fn fetch_session_user(&self, token: &AccessToken) -> AppResult<Option<SessionUser>>;
    async fn invalidate_session(&self, token: &AccessToken) -> AppResult<()>;
}
