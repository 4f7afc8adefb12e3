use garde::Validate;
use serde::{Deserialize, Serialize};

use super::user::UserResponse;

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[garde(email)]
    pub email: String,
    #[garde(length(min = 1))]
    pub password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub authenticated: bool,
    pub user: UserResponse,
}

#[derive(Serialize)]
pub struct LogoutResponse {
    pub success: bool,
}
