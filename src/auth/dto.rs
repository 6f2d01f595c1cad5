use serde::{Deserialize, Serialize};

use super::repo_types::User;

/// Request body for signup. Missing fields deserialize as empty and are
/// rejected by validation with a 400.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SignupRequest {
    pub full_name: String,
    pub email: String,
    pub password: String,
}

/// Request body for login.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Returned by signup, login, onboarding and `/auth/me`.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub user: User,
}

impl AuthResponse {
    pub fn new(user: User) -> Self {
        Self {
            success: true,
            user,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub success: bool,
    pub message: &'static str,
}
