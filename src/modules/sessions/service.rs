use std::sync::Arc;

use anyhow::anyhow;
use bcrypt::DEFAULT_COST;
use tracing::{info, instrument, warn};

use schoolrpc_auth::{RevocationStore, TokenCodec};
use schoolrpc_core::{AppError, SharedClock, hash_password_with_cost, verify_password};
use schoolrpc_observability::track_token_issued;

use crate::middleware::auth::AuthContext;
use crate::state::AppState;
use crate::validator::validate_request;

use super::model::{
    ExecAccount, ExecDirectory, LoginRequest, LoginResponse, LogoutResponse,
    UpdatePasswordRequest, UpdatePasswordResponse,
};

/// Login, password change and logout for executive accounts.
pub struct SessionService<D> {
    directory: Arc<D>,
    codec: Arc<TokenCodec>,
    revocations: RevocationStore,
    clock: SharedClock,
    password_cost: u32,
}

impl<D: ExecDirectory> SessionService<D> {
    pub fn new(directory: Arc<D>, state: &AppState) -> Self {
        Self {
            directory,
            codec: state.codec.clone(),
            revocations: state.revocations.clone(),
            clock: state.clock.clone(),
            password_cost: DEFAULT_COST,
        }
    }

    /// Overrides the bcrypt cost used when storing a new password.
    pub fn with_password_cost(mut self, cost: u32) -> Self {
        self.password_cost = cost;
        self
    }

    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse, AppError> {
        validate_request(&request)?;

        let account = self
            .directory
            .find_by_username(&request.username)
            .await?
            .ok_or_else(|| AppError::unauthenticated(anyhow!("invalid credentials")))?;

        if account.inactive {
            warn!("login attempt on inactive account");
            return Err(AppError::unauthenticated(anyhow!("account is inactive")));
        }

        if !verify_password(&request.password, &account.password_hash)? {
            return Err(AppError::unauthenticated(anyhow!("invalid credentials")));
        }

        let token = self.issue_token(&account)?;
        info!(exec_id = %account.id, "exec logged in");

        Ok(LoginResponse {
            status: true,
            token,
        })
    }

    /// Changes the password of `request.id` and returns a fresh token.
    ///
    /// Only the account owner or an admin may do this.
    #[instrument(skip(self, caller, request), fields(caller = %caller.subject_id(), target = %request.id))]
    pub async fn update_password(
        &self,
        caller: &AuthContext,
        request: UpdatePasswordRequest,
    ) -> Result<UpdatePasswordResponse, AppError> {
        validate_request(&request)?;

        if caller.subject_id() != request.id && !caller.is_admin() {
            return Err(AppError::permission_denied(anyhow!(
                "cannot change another exec's password"
            )));
        }

        let account = self
            .directory
            .find_by_id(&request.id)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("exec not found")))?;

        if account.inactive {
            return Err(AppError::unauthenticated(anyhow!("account is inactive")));
        }

        if !verify_password(&request.current_password, &account.password_hash)? {
            return Err(AppError::unauthenticated(anyhow!("incorrect current password")));
        }

        let password_hash = hash_password_with_cost(&request.new_password, self.password_cost)?;
        self.directory
            .update_password(&account.id, &password_hash, self.clock.now())
            .await?;

        let token = self.issue_token(&account)?;
        info!("exec password updated");

        Ok(UpdatePasswordResponse {
            password_updated: true,
            token,
        })
    }

    /// Revokes the caller's token until its natural expiry.
    pub async fn logout(&self, caller: &AuthContext) -> Result<LogoutResponse, AppError> {
        self.revocations
            .revoke(caller.token.as_str(), caller.expires_at)
            .await;
        info!(exec_id = %caller.subject_id(), "exec logged out");

        Ok(LogoutResponse { logged_out: true })
    }

    fn issue_token(&self, account: &ExecAccount) -> Result<String, AppError> {
        let token = self
            .codec
            .issue_default(&account.id, &account.username, account.role)?;
        track_token_issued();
        Ok(token)
    }
}
