use axum::{extract::State, http::StatusCode, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use garde::Validate;
use registry::AppRegistry;
use shared::{
    config::AuthConfig,
    error::{AppError, AppResult},
};

use crate::{
    extractor::{access_token_from, AuthorizedUser, JsonBody, AUTH_COOKIE_NAME},
    model::{
        auth::{LoginRequest, LogoutResponse, SessionResponse},
        user::{CreateUserRequest, UserResponse},
    },
};

pub async fn login(
    State(registry): State<AppRegistry>,
    jar: CookieJar,
    JsonBody(req): JsonBody<LoginRequest>,
) -> AppResult<(CookieJar, Json<SessionResponse>)> {
    req.validate(&())?;

    let user_id = registry
        .auth_repository()
        .verify_user(&req.email, &req.password)
        .await?;
    let session = registry.auth_repository().create_session(user_id).await?;
    let user = registry
        .user_repository()
        .find_current_user(user_id)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    tracing::info!(%user_id, role = %user.role, "user logged in");
    let cookie = session_cookie(session.token.0, &registry.auth_config());
    Ok((
        jar.add(cookie),
        Json(SessionResponse {
            authenticated: true,
            user: user.into(),
        }),
    ))
}

pub async fn session(user: AuthorizedUser) -> Json<SessionResponse> {
    Json(SessionResponse {
        authenticated: true,
        user: user.user.into(),
    })
}

// セッションの無効化に失敗してもクライアント側はログアウト状態にする
pub async fn logout(
    State(registry): State<AppRegistry>,
    jar: CookieJar,
) -> (CookieJar, Json<LogoutResponse>) {
    if let Some(token) = access_token_from(&jar) {
        if let Err(e) = registry.auth_repository().invalidate_session(&token).await {
            tracing::warn!(error.message = %e, "failed to invalidate session on logout");
        }
    }

    // リクエストに Cookie が無くても削除用の Cookie を必ず返す
    let mut removal = session_cookie(String::new(), &registry.auth_config());
    removal.make_removal();
    (jar.add(removal), Json(LogoutResponse { success: true }))
}

pub async fn register(
    State(registry): State<AppRegistry>,
    JsonBody(req): JsonBody<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    req.validate(&())?;

    let user = registry.user_repository().create(req.into()).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

fn session_cookie(token: String, config: &AuthConfig) -> Cookie<'static> {
    let max_age = i64::try_from(config.ttl).unwrap_or(i64::MAX);
    Cookie::build((AUTH_COOKIE_NAME, token))
        .http_only(true)
        .path("/")
        .secure(config.secure_cookie)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(max_age))
        .build()
}
