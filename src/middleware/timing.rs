use std::mem;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::time::Instant;
use tonic::metadata::{MetadataMap, MetadataValue};
use tonic::{Code, Response, Status};
use tower::{Layer, Service};
use tracing::{error, info, warn};

use schoolrpc_observability::track_rpc_completed;

use super::BoxFuture;
use crate::pipeline::Call;

/// Metadata key carrying the server-side latency of a call.
pub const RESPONSE_TIME_KEY: &str = "x-response-time";

/// Measures each call and reports it in logs, metrics and response metadata.
#[derive(Debug, Clone, Default)]
pub struct TimingLayer;

impl TimingLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for TimingLayer {
    type Service = TimingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TimingService { inner }
    }
}

#[derive(Debug, Clone)]
pub struct TimingService<S> {
    inner: S,
}

impl<S, T, U> Service<Call<T>> for TimingService<S>
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
        let mut guard = CallGuard::start(call.method().to_string());

        Box::pin(async move {
            let result = inner.call(call).await;
            let elapsed = guard.finish();

            match result {
                Ok(mut response) => {
                    log_completion(&guard.method, Code::Ok, elapsed);
                    attach_response_time(response.metadata_mut(), elapsed);
                    Ok(response)
                }
                Err(mut status) => {
                    log_completion(&guard.method, status.code(), elapsed);
                    attach_response_time(status.metadata_mut(), elapsed);
                    Err(status)
                }
            }
        })
    }
}

/// Records the call as cancelled if its future is dropped before completing.
struct CallGuard {
    method: String,
    started_at: Instant,
    finished: bool,
}

impl CallGuard {
    fn start(method: String) -> Self {
        Self {
            method,
            started_at: Instant::now(),
            finished: false,
        }
    }

    fn finish(&mut self) -> Duration {
        self.finished = true;
        self.started_at.elapsed()
    }
}

impl Drop for CallGuard {
    fn drop(&mut self) {
        if !self.finished {
            log_completion(&self.method, Code::Cancelled, self.started_at.elapsed());
        }
    }
}

/// Formats a latency as milliseconds with microsecond precision, e.g. `1.204ms`.
pub fn format_response_time(elapsed: Duration) -> String {
    format!("{:.3}ms", elapsed.as_secs_f64() * 1000.0)
}

fn attach_response_time(metadata: &mut MetadataMap, elapsed: Duration) {
    if let Ok(value) = MetadataValue::try_from(format_response_time(elapsed)) {
        metadata.insert(RESPONSE_TIME_KEY, value);
    }
}

fn log_completion(method: &str, code: Code, elapsed: Duration) {
    let latency_ms = elapsed.as_secs_f64() * 1000.0;
    let code_name = format!("{code:?}");

    match code {
        Code::Ok => info!(method, code = %code_name, latency_ms, "call completed"),
        Code::Internal | Code::Unknown | Code::DataLoss | Code::Unavailable | Code::Unimplemented => {
            error!(method, code = %code_name, latency_ms, "server error")
        }
        _ => warn!(method, code = %code_name, latency_ms, "call failed"),
    }

    track_rpc_completed(method, &code_name, elapsed.as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;
    use std::sync::{Arc, Mutex};

    use tonic::Request;
    use tower::{ServiceExt, service_fn};
    use tracing::field::{Field, Visit};
    use tracing::{Event, Subscriber};
    use tracing_subscriber::layer::{Context as LayerContext, SubscriberExt};

    /// Collects the `code` field of every completion event.
    #[derive(Clone, Default)]
    struct CodeRecorder(Arc<Mutex<Vec<String>>>);

    impl CodeRecorder {
        fn codes(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    impl<S: Subscriber> tracing_subscriber::Layer<S> for CodeRecorder {
        fn on_event(&self, event: &Event<'_>, _ctx: LayerContext<'_, S>) {
            let mut visitor = CodeVisitor(None);
            event.record(&mut visitor);
            if let Some(code) = visitor.0 {
                self.0.lock().unwrap().push(code);
            }
        }
    }

    struct CodeVisitor(Option<String>);

    impl Visit for CodeVisitor {
        fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
            if field.name() == "code" {
                self.0 = Some(format!("{value:?}"));
            }
        }
    }

    #[test]
    fn test_format_response_time_is_ascii_millis() {
        assert_eq!(format_response_time(Duration::from_micros(1204)), "1.204ms");
        assert_eq!(format_response_time(Duration::ZERO), "0.000ms");
        assert!(format_response_time(Duration::from_nanos(17)).is_ascii());
    }

    #[tokio::test]
    async fn test_success_carries_response_time() {
        let svc = TimingLayer::new().layer(service_fn(|_call: Call<()>| async {
            Ok::<_, Status>(Response::new("ok"))
        }));

        let response = svc
            .oneshot(Call::new("/school.ExecsService/GetExecs", Request::new(())))
            .await
            .unwrap();

        let value = response.metadata().get(RESPONSE_TIME_KEY).unwrap();
        assert!(value.to_str().unwrap().ends_with("ms"));
    }

    #[tokio::test]
    async fn test_error_carries_response_time() {
        let svc = TimingLayer::new().layer(service_fn(|_call: Call<()>| async {
            Err::<Response<()>, _>(Status::not_found("exec not found"))
        }));

        let status = svc
            .oneshot(Call::new("/school.ExecsService/GetExecs", Request::new(())))
            .await
            .unwrap_err();

        assert_eq!(status.code(), Code::NotFound);
        assert!(status.metadata().get(RESPONSE_TIME_KEY).is_some());
    }

    #[tokio::test]
    async fn test_dropped_call_is_recorded_as_cancelled() {
        let recorder = CodeRecorder::default();
        let _subscriber =
            tracing::subscriber::set_default(tracing_subscriber::registry().with(recorder.clone()));

        let mut svc = TimingLayer::new().layer(service_fn(|_call: Call<()>| async {
            std::future::pending::<Result<Response<()>, Status>>().await
        }));
        let mut future = svc.call(Call::new("/school.ExecsService/GetExecs", Request::new(())));

        let polled = tokio::time::timeout(Duration::from_millis(10), &mut future).await;
        assert!(polled.is_err());
        assert!(recorder.codes().is_empty());

        drop(future);
        assert_eq!(recorder.codes(), vec!["Cancelled".to_string()]);
    }

    #[tokio::test]
    async fn test_completed_call_is_not_recorded_as_cancelled() {
        let recorder = CodeRecorder::default();
        let _subscriber =
            tracing::subscriber::set_default(tracing_subscriber::registry().with(recorder.clone()));

        let svc = TimingLayer::new().layer(service_fn(|_call: Call<()>| async {
            Ok::<_, Status>(Response::new(()))
        }));
        svc.oneshot(Call::new("/school.ExecsService/GetExecs", Request::new(())))
            .await
            .unwrap();

        assert_eq!(recorder.codes(), vec!["Ok".to_string()]);
    }
}
