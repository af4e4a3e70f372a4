#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tonic::{Request, Response, Status};
use tower::{Service, service_fn};

use schoolrpc::modules::sessions::{ExecAccount, ExecDirectory};
use schoolrpc::pipeline::Call;
use schoolrpc::state::AppState;
use schoolrpc_auth::Role;
use schoolrpc_config::{AppConfig, JwtConfig, RateLimitConfig};
use schoolrpc_core::{AppError, ManualClock, hash_password_with_cost};

pub const TEST_SECRET: &str = "test-secret-key-at-least-32-characters-long";
pub const TEST_PASSWORD_COST: u32 = 4;
pub const PROTECTED_METHOD: &str = "/school.TeachersService/GetTeachers";

/// Default test configuration: rate limiting generous enough to stay out of
/// the way unless a test tightens it.
pub fn test_config() -> AppConfig {
    AppConfig {
        jwt: JwtConfig {
            secret: TEST_SECRET.to_string(),
            access_token_expiry: 3600,
        },
        rate_limit: RateLimitConfig {
            threshold: 10_000,
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn test_state(config: AppConfig) -> (AppState, ManualClock) {
    let clock = ManualClock::starting_now();
    (AppState::from_config(config, clock.shared()), clock)
}

pub fn bearer_request(token: &str) -> Request<()> {
    let mut request = Request::new(());
    request
        .metadata_mut()
        .insert("authorization", format!("Bearer {token}").parse().unwrap());
    request
}

pub fn from_peer(mut request: Request<()>, ip: &str) -> Request<()> {
    request
        .metadata_mut()
        .insert("x-forwarded-for", ip.parse().unwrap());
    request
}

/// A handler that counts its invocations and echoes the caller's name.
#[derive(Clone, Default)]
pub struct CountingHandler {
    calls: Arc<AtomicUsize>,
}

impl CountingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn service(
        &self,
    ) -> impl Service<Call<()>, Response = Response<String>, Error = Status, Future: Send + 'static>
    + Clone
    + Send
    + 'static {
        let calls = self.calls.clone();
        service_fn(move |call: Call<()>| {
            calls.fetch_add(1, Ordering::SeqCst);
            let name = call
                .auth()
                .map(|ctx| ctx.claims.name.clone())
                .unwrap_or_else(|| "anonymous".to_string());
            async move { Ok::<_, Status>(Response::new(name)) }
        })
    }
}

#[derive(Default)]
pub struct InMemoryDirectory {
    accounts: RwLock<HashMap<String, ExecAccount>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add(&self, id: &str, username: &str, password: &str, role: Role) -> ExecAccount {
        let account = ExecAccount {
            id: id.to_string(),
            username: username.to_string(),
            email: format!("{username}@school.test"),
            role,
            password_hash: hash_password_with_cost(password, TEST_PASSWORD_COST).unwrap(),
            inactive: false,
        };
        self.accounts
            .write()
            .await
            .insert(id.to_string(), account.clone());
        account
    }

    pub async fn deactivate(&self, id: &str) {
        if let Some(account) = self.accounts.write().await.get_mut(id) {
            account.inactive = true;
        }
    }

    pub async fn get(&self, id: &str) -> Option<ExecAccount> {
        self.accounts.read().await.get(id).cloned()
    }
}

impl ExecDirectory for InMemoryDirectory {
    async fn find_by_username(&self, username: &str) -> Result<Option<ExecAccount>, AppError> {
        Ok(self
            .accounts
            .read()
            .await
            .values()
            .find(|a| a.username == username)
            .cloned())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<ExecAccount>, AppError> {
        Ok(self.accounts.read().await.get(id).cloned())
    }

    async fn update_password(
        &self,
        id: &str,
        password_hash: &str,
        _changed_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        match self.accounts.write().await.get_mut(id) {
            Some(account) => {
                account.password_hash = password_hash.to_string();
                Ok(())
            }
            None => Err(AppError::not_found(anyhow::anyhow!("exec not found"))),
        }
    }
}
