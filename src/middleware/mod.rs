//! Middleware stages for unary call processing.
//!
//! Each stage is a tower [`Layer`](tower::Layer) over services that take a
//! [`Call`](crate::pipeline::Call) and return `tonic::Response` or
//! `tonic::Status`.
//!
//! # Modules
//!
//! - [`rate_limit`]: rejects callers over their fixed-window budget
//! - [`timing`]: measures latency, logs completion, sets `x-response-time`
//! - [`auth`]: bearer token verification and revocation check
//! - [`deadline`]: enforces the caller's `grpc-timeout`
//!
//! # Authentication Flow
//!
//! 1. Client sends `authorization: Bearer <token>` metadata
//! 2. `AuthService` verifies the token and checks the revocation store
//! 3. An [`AuthContext`](auth::AuthContext) is inserted into the request extensions
//! 4. Handler reads it with `call.auth()`
//!
//! # Example
//!
//! ```ignore
//! use schoolrpc::middleware::auth::AuthContext;
//! use schoolrpc::pipeline::Call;
//!
//! async fn get_profile(call: Call<()>) -> Result<tonic::Response<String>, tonic::Status> {
//!     let caller = call.auth().ok_or_else(|| tonic::Status::unauthenticated("no caller"))?;
//!     Ok(tonic::Response::new(caller.claims.name.clone()))
//! }
//! ```

use std::future::Future;
use std::pin::Pin;

pub mod auth;
pub mod deadline;
pub mod rate_limit;
pub mod timing;

pub(crate) type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
