use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use schoolrpc_auth::Role;
use schoolrpc_core::AppError;

/// An administrative executive as stored by the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecAccount {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: Role,
    /// bcrypt hash
    pub password_hash: String,
    pub inactive: bool,
}

/// Lookup and update of executive accounts.
///
/// Implemented by the persistence layer; the session flows only depend on
/// these three operations.
pub trait ExecDirectory: Send + Sync + 'static {
    fn find_by_username(
        &self,
        username: &str,
    ) -> impl Future<Output = Result<Option<ExecAccount>, AppError>> + Send;

    fn find_by_id(&self, id: &str) -> impl Future<Output = Result<Option<ExecAccount>, AppError>> + Send;

    fn update_password(
        &self,
        id: &str,
        password_hash: &str,
        changed_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<(), AppError>> + Send;
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub status: bool,
    pub token: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdatePasswordRequest {
    #[validate(length(min = 1, message = "id is required"))]
    pub id: String,
    #[validate(length(min = 1, message = "current password is required"))]
    pub current_password: String,
    #[validate(length(min = 8, message = "new password must be at least 8 characters"))]
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdatePasswordResponse {
    pub password_updated: bool,
    pub token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogoutResponse {
    pub logged_out: bool,
}
