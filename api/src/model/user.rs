use chrono::{DateTime, Utc};
use derive_new::new;
use garde::Validate;
use kernel::model::{
    id::UserId,
    role::{Role, Section},
    user::{
        event::{CreateUser, UpdateUserPassword, UpdateUserProfile, UpdateUserRole},
        User,
    },
};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsersResponse {
    pub items: Vec<UserResponse>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub user_id: UserId,
    pub user_name: String,
    pub email: String,
    pub role: Role,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(value: User) -> Self {
        let User {
            user_id,
            user_name,
            email,
            role,
            phone,
            created_at,
        } = value;
        Self {
            user_id,
            user_name,
            email,
            role,
            phone,
            created_at,
        }
    }
}

/// `GET /api/me` の応答。ロールに応じて表示できる画面の一覧も返す
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUserResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub sections: Vec<Section>,
}

impl From<User> for CurrentUserResponse {
    fn from(value: User) -> Self {
        let sections = Section::visible_to(value.role);
        Self {
            user: value.into(),
            sections,
        }
    }
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[garde(length(min = 1, max = 100))]
    user_name: String,
    #[garde(email)]
    email: String,
    #[garde(length(min = 6))]
    password: String,
}

// 新規登録ユーザーは常に USER ロールで作成する
impl From<CreateUserRequest> for CreateUser {
    fn from(value: CreateUserRequest) -> Self {
        let CreateUserRequest {
            user_name,
            email,
            password,
        } = value;
        CreateUser::new(user_name, email, password, Role::User)
    }
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserProfileRequest {
    #[garde(length(min = 1, max = 100))]
    user_name: Option<String>,
    #[garde(length(max = 32))]
    phone: Option<String>,
}

#[derive(new)]
pub struct UpdateUserProfileRequestWithUserId(UserId, UpdateUserProfileRequest);
impl From<UpdateUserProfileRequestWithUserId> for UpdateUserProfile {
    fn from(value: UpdateUserProfileRequestWithUserId) -> Self {
        let UpdateUserProfileRequestWithUserId(user_id, UpdateUserProfileRequest { user_name, phone }) =
            value;
        UpdateUserProfile::new(user_id, user_name, phone)
    }
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserPasswordRequest {
    #[garde(length(min = 1))]
    current_password: String,
    #[garde(length(min = 6))]
    new_password: String,
}

#[derive(new)]
pub struct UpdateUserPasswordRequestWithUserId(UserId, UpdateUserPasswordRequest);
impl From<UpdateUserPasswordRequestWithUserId> for UpdateUserPassword {
    fn from(value: UpdateUserPasswordRequestWithUserId) -> Self {
        let UpdateUserPasswordRequestWithUserId(
            user_id,
            UpdateUserPasswordRequest {
                current_password,
                new_password,
            },
        ) = value;
        UpdateUserPassword {
            user_id,
            current_password,
            new_password,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRoleRequest {
    pub user_id: UserId,
    pub role: Role,
}

#[derive(new)]
pub struct UpdateUserRoleRequestWithActor(UserId, UpdateUserRoleRequest);
impl From<UpdateUserRoleRequestWithActor> for UpdateUserRole {
    fn from(value: UpdateUserRoleRequestWithActor) -> Self {
        let UpdateUserRoleRequestWithActor(requested_by, UpdateUserRoleRequest { user_id, role }) =
            value;
        UpdateUserRole::new(user_id, role, requested_by)
    }
}
