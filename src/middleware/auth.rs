use std::mem;
use std::sync::Arc;
use std::task::{Context, Poll};

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use tonic::{Response, Status};
use tower::{Layer, Service};
use tracing::debug;

use schoolrpc_auth::{Claims, RevocationStore, TokenCodec, TokenError};
use schoolrpc_config::AuthConfig;
use schoolrpc_core::AppError;
use schoolrpc_observability::track_token_validation;

use super::BoxFuture;
use crate::pipeline::Call;

const AUTHORIZATION_KEY: &str = "authorization";
const BEARER_PREFIX: &str = "Bearer ";

/// The verified caller of one call.
///
/// Inserted into the request extensions by [`AuthService`]; never shared
/// between calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub claims: Claims,
    /// The raw bearer token, needed to revoke it on logout.
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl AuthContext {
    pub fn subject_id(&self) -> &str {
        &self.claims.sub
    }

    pub fn is_admin(&self) -> bool {
        self.claims.is_admin()
    }
}

#[derive(Debug, Clone)]
pub struct AuthLayer {
    codec: Arc<TokenCodec>,
    revocations: RevocationStore,
    config: Arc<AuthConfig>,
}

impl AuthLayer {
    pub fn new(codec: Arc<TokenCodec>, revocations: RevocationStore, config: AuthConfig) -> Self {
        Self {
            codec,
            revocations,
            config: Arc::new(config),
        }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthService {
            inner,
            codec: self.codec.clone(),
            revocations: self.revocations.clone(),
            config: self.config.clone(),
        }
    }
}

/// Rejects calls without a valid, unrevoked bearer token.
#[derive(Debug, Clone)]
pub struct AuthService<S> {
    inner: S,
    codec: Arc<TokenCodec>,
    revocations: RevocationStore,
    config: Arc<AuthConfig>,
}

impl<S, T, U> Service<Call<T>> for AuthService<S>
where
    S: Service<Call<T>, Response = Response<U>, Error = Status> + Clone + Send + 'static,
    S::Future: Send + 'static,
    T: Send + 'static,
    U: 'static,
{
    type Response = Response<U>;
    type Error = Status;
    type Future = BoxFuture<Result<Response<U>, Status>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut call: Call<T>) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = mem::replace(&mut self.inner, clone);

        if self.config.is_exempt(call.method()) {
            return Box::pin(inner.call(call));
        }

        let token = bearer_token(&call).map(str::to_string);
        let method = call.method().to_string();
        let codec = self.codec.clone();
        let revocations = self.revocations.clone();

        Box::pin(async move {
            let token = token.inspect_err(|_| track_token_validation("missing"))?;
            let context = authenticate(&method, token, &codec, &revocations).await?;

            call.request_mut().extensions_mut().insert(context);
            inner.call(call).await
        })
    }
}

async fn authenticate(
    method: &str,
    token: String,
    codec: &TokenCodec,
    revocations: &RevocationStore,
) -> Result<AuthContext, AppError> {
    let claims = codec.verify(&token).map_err(|err| {
        track_token_validation(match err {
            TokenError::Expired => "expired",
            _ => "invalid",
        });
        debug!(method, error = %err, "rejected bearer token");
        AppError::from(err)
    })?;

    if revocations.is_revoked(&token).await {
        track_token_validation("revoked");
        debug!(method, subject = %claims.sub, "rejected revoked token");
        return Err(AppError::unauthenticated(anyhow!("token has been revoked")));
    }

    track_token_validation("valid");
    Ok(AuthContext {
        expires_at: claims.expires_at(),
        token,
        claims,
    })
}

fn bearer_token<T>(call: &Call<T>) -> Result<&str, AppError> {
    let value = call
        .metadata()
        .get(AUTHORIZATION_KEY)
        .ok_or_else(|| AppError::unauthenticated(anyhow!("missing authorization metadata")))?
        .to_str()
        .map_err(|_| AppError::unauthenticated(anyhow!("malformed authorization metadata")))?;

    value
        .strip_prefix(BEARER_PREFIX)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            AppError::unauthenticated(anyhow!("authorization metadata must use the Bearer scheme"))
        })
}
