use std::mem;
use std::task::{Context, Poll};

use tonic::{Response, Status};
use tower::{Layer, Service};
use tracing::warn;

use schoolrpc_config::RateLimitScope;
use schoolrpc_observability::track_rate_limited;

use super::BoxFuture;
use crate::pipeline::Call;
use crate::rate_limiter::RateLimiter;

const GLOBAL_KEY: &str = "global";
const UNKNOWN_PEER: &str = "unknown";

/// Tower layer for rate limiting
///
/// Outermost stage: a rejected call never reaches timing, auth or the handler.
#[derive(Debug, Clone)]
pub struct RateLimitLayer {
    limiter: Option<RateLimiter>,
    scope: RateLimitScope,
}

impl RateLimitLayer {
    pub fn new(limiter: RateLimiter, scope: RateLimitScope) -> Self {
        Self {
            limiter: Some(limiter),
            scope,
        }
    }

    /// A layer that lets every call through.
    pub fn disabled() -> Self {
        Self {
            limiter: None,
            scope: RateLimitScope::Global,
        }
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            inner,
            limiter: self.limiter.clone(),
            scope: self.scope,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RateLimitService<S> {
    inner: S,
    limiter: Option<RateLimiter>,
    scope: RateLimitScope,
}

impl<S, T, U> Service<Call<T>> for RateLimitService<S>
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

    fn call(&mut self, call: Call<T>) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = mem::replace(&mut self.inner, clone);

        let Some(limiter) = self.limiter.clone() else {
            return Box::pin(inner.call(call));
        };
        let key = caller_key(&call, self.scope);
        let scope = self.scope;

        Box::pin(async move {
            if !limiter.allow(&key).await {
                warn!(method = %call.method(), caller = %key, "rate limit exceeded");
                track_rate_limited(&scope.to_string());
                return Err(Status::resource_exhausted("rate limit exceeded"));
            }

            inner.call(call).await
        })
    }
}

/// The identity a call is counted against.
///
/// Peer scope uses the remote IP, then the first `x-forwarded-for` entry,
/// then a shared `"unknown"` bucket.
pub fn caller_key<T>(call: &Call<T>, scope: RateLimitScope) -> String {
    match scope {
        RateLimitScope::Global => GLOBAL_KEY.to_string(),
        RateLimitScope::Peer => call
            .request()
            .remote_addr()
            .map(|addr| addr.ip().to_string())
            .or_else(|| forwarded_for(call))
            .unwrap_or_else(|| UNKNOWN_PEER.to_string()),
    }
}

fn forwarded_for<T>(call: &Call<T>) -> Option<String> {
    call.metadata()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
