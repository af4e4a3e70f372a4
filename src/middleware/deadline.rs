use std::mem;
use std::task::{Context, Poll};
use std::time::Duration;

use tonic::metadata::MetadataMap;
use tonic::{Response, Status};
use tower::{Layer, Service};
use tracing::{debug, warn};

use super::BoxFuture;
use crate::pipeline::Call;

const GRPC_TIMEOUT_KEY: &str = "grpc-timeout";

/// At most 8 digits are allowed in a `grpc-timeout` value.
const MAX_TIMEOUT_DIGITS: usize = 8;

/// Bounds the handler by the deadline the caller sent in `grpc-timeout`.
#[derive(Debug, Clone, Default)]
pub struct DeadlineLayer;

impl DeadlineLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for DeadlineLayer {
    type Service = DeadlineService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        DeadlineService { inner }
    }
}

#[derive(Debug, Clone)]
pub struct DeadlineService<S> {
    inner: S,
}

impl<S, T, U> Service<Call<T>> for DeadlineService<S>
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

        let Some(timeout) = grpc_timeout(call.metadata()) else {
            return Box::pin(inner.call(call));
        };
        let method = call.method().to_string();

        Box::pin(async move {
            match tokio::time::timeout(timeout, inner.call(call)).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(method = %method, timeout_ms = timeout.as_millis() as u64, "deadline exceeded");
                    Err(Status::deadline_exceeded("deadline exceeded"))
                }
            }
        })
    }
}

/// Reads the caller's deadline. A missing or malformed value means none.
pub fn grpc_timeout(metadata: &MetadataMap) -> Option<Duration> {
    let raw = metadata.get(GRPC_TIMEOUT_KEY)?.to_str().ok()?;
    let parsed = parse_grpc_timeout(raw);
    if parsed.is_none() {
        debug!(value = raw, "ignoring malformed grpc-timeout");
    }
    parsed
}

/// Parses `<digits><unit>` where unit is one of `H M S m u n`.
pub fn parse_grpc_timeout(value: &str) -> Option<Duration> {
    let unit = value.chars().last()?;
    let digits = &value[..value.len() - unit.len_utf8()];

    if digits.is_empty()
        || digits.len() > MAX_TIMEOUT_DIGITS
        || !digits.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    let amount: u64 = digits.parse().ok()?;

    match unit {
        'H' => Some(Duration::from_secs(amount * 3600)),
        'M' => Some(Duration::from_secs(amount * 60)),
        'S' => Some(Duration::from_secs(amount)),
        'm' => Some(Duration::from_millis(amount)),
        'u' => Some(Duration::from_micros(amount)),
        'n' => Some(Duration::from_nanos(amount)),
        _ => None,
    }
}
