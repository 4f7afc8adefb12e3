use axum::{extract::State, http::StatusCode, Json};
use garde::Validate;
use kernel::model::role::policy;
use registry::AppRegistry;
use shared::error::{AppError, AppResult};

use crate::{
    extractor::{AuthorizedUser, JsonBody},
    model::{
        registration::RegistrationsResponse,
        user::{
            CurrentUserResponse, UpdateUserPasswordRequest, UpdateUserPasswordRequestWithUserId,
            UpdateUserProfileRequest, UpdateUserProfileRequestWithUserId, UpdateUserRoleRequest,
            UpdateUserRoleRequestWithActor, UserResponse, UsersResponse,
        },
    },
};

pub async fn get_current_user(user: AuthorizedUser) -> Json<CurrentUserResponse> {
    Json(CurrentUserResponse::from(user.user))
}

pub async fn update_current_user(
    user: AuthorizedUser,
    State(registry): State<AppRegistry>,
    JsonBody(req): JsonBody<UpdateUserProfileRequest>,
) -> AppResult<Json<CurrentUserResponse>> {
    req.validate(&())?;

    registry
        .user_repository()
        .update_profile(UpdateUserProfileRequestWithUserId::new(user.id(), req).into())
        .await
        .map(CurrentUserResponse::from)
        .map(Json)
}

pub async fn change_password(
    user: AuthorizedUser,
    State(registry): State<AppRegistry>,
    JsonBody(req): JsonBody<UpdateUserPasswordRequest>,
) -> AppResult<StatusCode> {
    req.validate(&())?;

    registry
        .user_repository()
        .update_password(UpdateUserPasswordRequestWithUserId::new(user.id(), req).into())
        .await
        .map(|_| StatusCode::OK)
}

pub async fn get_my_registrations(
    user: AuthorizedUser,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<RegistrationsResponse>> {
    registry
        .registration_repository()
        .find_by_user_id(user.id())
        .await
        .map(RegistrationsResponse::from)
        .map(Json)
}

pub async fn list_users(
    user: AuthorizedUser,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<UsersResponse>> {
    user.require(policy::MANAGE_USERS)?;

    let items = registry
        .user_repository()
        .find_all()
        .await?
        .into_iter()
        .map(UserResponse::from)
        .collect();

    Ok(Json(UsersResponse { items }))
}

pub async fn change_role(
    user: AuthorizedUser,
    State(registry): State<AppRegistry>,
    JsonBody(req): JsonBody<UpdateUserRoleRequest>,
) -> AppResult<Json<UserResponse>> {
    user.require(policy::MANAGE_USERS)?;
    let target = req.user_id;
    let user_repository = registry.user_repository();
    let current = user_repository
        .find_current_user(target)
        .await?
        .ok_or_else(|| AppError::EntityNotFound("Utilizador não encontrado".into()))?;

    // セッション上のロールでの事前チェック。最終的な判定は更新文の中で行う
    if !user
        .role()
        .may_assign(target == user.id(), current.role, req.role)
    {
        return Err(AppError::ForbiddenOperation);
    }

    user_repository
        .update_role(UpdateUserRoleRequestWithActor::new(user.id(), req).into())
        .await?;

    user_repository
        .find_current_user(target)
        .await?
        .map(UserResponse::from)
        .map(Json)
        .ok_or_else(|| AppError::EntityNotFound("Utilizador não encontrado".into()))
}
