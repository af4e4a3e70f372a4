//! The request pipeline wrapped around every unary call.
//!
//! Stages run outermost first:
//!
//! ```text
//! RateLimitLayer -> TimingLayer -> AuthLayer -> DeadlineLayer -> handler
//! ```
//!
//! A call rejected by the rate stage never starts the timer, so it carries
//! no `x-response-time`. Every call that gets past it does, whether it
//! succeeds or fails further in.

use tonic::metadata::MetadataMap;
use tonic::{Request, Response, Status};
use tower::{Service, ServiceBuilder, ServiceExt};

use crate::middleware::auth::{AuthContext, AuthLayer, AuthService};
use crate::middleware::deadline::{DeadlineLayer, DeadlineService};
use crate::middleware::rate_limit::{RateLimitLayer, RateLimitService};
use crate::middleware::timing::{TimingLayer, TimingService};
use crate::state::AppState;

/// One inbound unary call: the fully-qualified method name plus the
/// already decoded request.
#[derive(Debug)]
pub struct Call<T> {
    method: String,
    request: Request<T>,
}

impl<T> Call<T> {
    /// `method` is in `/package.Service/Method` form.
    pub fn new(method: impl Into<String>, request: Request<T>) -> Self {
        Self {
            method: method.into(),
            request,
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn metadata(&self) -> &MetadataMap {
        self.request.metadata()
    }

    pub fn request(&self) -> &Request<T> {
        &self.request
    }

    pub fn request_mut(&mut self) -> &mut Request<T> {
        &mut self.request
    }

    /// The authenticated caller, present once the auth stage has passed.
    /// `None` on exempt methods.
    pub fn auth(&self) -> Option<&AuthContext> {
        self.request.extensions().get::<AuthContext>()
    }

    pub fn into_request(self) -> Request<T> {
        self.request
    }
}

/// A handler wrapped in every pipeline stage.
pub type PipelineService<S> = RateLimitService<TimingService<AuthService<DeadlineService<S>>>>;

/// The set of stage layers, built once per process and applied to each
/// handler.
#[derive(Debug, Clone)]
pub struct Pipeline {
    rate_limit: RateLimitLayer,
    timing: TimingLayer,
    auth: AuthLayer,
    deadline: DeadlineLayer,
}

impl Pipeline {
    pub fn new(
        rate_limit: RateLimitLayer,
        timing: TimingLayer,
        auth: AuthLayer,
        deadline: DeadlineLayer,
    ) -> Self {
        Self {
            rate_limit,
            timing,
            auth,
            deadline,
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        let rate_limit = if state.config.rate_limit.enabled {
            RateLimitLayer::new(state.limiter.clone(), state.config.rate_limit.scope)
        } else {
            RateLimitLayer::disabled()
        };

        Self::new(
            rate_limit,
            TimingLayer::new(),
            AuthLayer::new(
                state.codec.clone(),
                state.revocations.clone(),
                state.config.auth.clone(),
            ),
            DeadlineLayer::new(),
        )
    }

    pub fn wrap<S>(&self, handler: S) -> PipelineService<S> {
        ServiceBuilder::new()
            .layer(self.rate_limit.clone())
            .layer(self.timing.clone())
            .layer(self.auth.clone())
            .layer(self.deadline.clone())
            .service(handler)
    }

    /// Runs a single call through every stage and `handler`.
    ///
    /// Meant for tonic service implementations, which receive the method
    /// body and hand it straight here.
    pub async fn run<S, T, U>(
        &self,
        method: &str,
        request: Request<T>,
        handler: S,
    ) -> Result<Response<U>, Status>
    where
        S: Service<Call<T>, Response = Response<U>, Error = Status> + Clone + Send + 'static,
        S::Future: Send + 'static,
        T: Send + 'static,
        U: Send + 'static,
    {
        self.wrap(handler)
            .oneshot(Call::new(method, request))
            .await
    }
}

