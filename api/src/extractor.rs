use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::cookie::CookieJar;
use kernel::model::{
    auth::{AccessToken, SessionUser},
    id::UserId,
    role::{Access, Role},
    user::User,
};
use registry::AppRegistry;
use shared::error::AppError;

pub const AUTH_COOKIE_NAME: &str = "auth-session";

/// `axum::Json` whose rejection is rendered as an [`AppError`] body.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct PathParam<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct QueryParam<T>(pub T);

/// Caller resolved from the `auth-session` cookie.
pub struct AuthorizedUser {
    pub access_token: AccessToken,
    pub user: User,
}

impl AuthorizedUser {
    pub fn id(&self) -> UserId {
        self.user.user_id
    }

    pub fn role(&self) -> Role {
        self.user.role
    }

    pub fn require(&self, access: Access) -> Result<(), AppError> {
        if access.permits(self.role()) {
            Ok(())
        } else {
            tracing::debug!(user_id = %self.id(), role = %self.role(), ?access, "access denied");
            Err(AppError::ForbiddenOperation)
        }
    }
}

impl From<SessionUser> for AuthorizedUser {
    fn from(value: SessionUser) -> Self {
        let SessionUser { token, user, .. } = value;
        Self {
            access_token: token,
            user,
        }
    }
}

pub fn access_token_from(jar: &CookieJar) -> Option<AccessToken> {
    jar.get(AUTH_COOKIE_NAME)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
        .map(AccessToken)
}

#[async_trait]
impl FromRequestParts<AppRegistry> for AuthorizedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        registry: &AppRegistry,
    ) -> Result<Self, Self::Rejection> {
        // Cookie からセッショントークンを取り出し、有効なセッションに紐づくユーザーを取得する
        let jar = CookieJar::from_headers(&parts.headers);
        let access_token = access_token_from(&jar).ok_or(AppError::UnauthenticatedError)?;

        registry
            .auth_repository()
            .fetch_session_user(&access_token)
            .await?
            .map(AuthorizedUser::from)
            .ok_or(AppError::UnauthenticatedError)
    }
}
