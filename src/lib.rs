//! # schoolrpc
//!
//! The request middleware core of a school-records RPC service. Every unary
//! call to the teachers, students and executives services passes through the
//! same chain of cross-cutting stages before its handler runs.
//!
//! ## Overview
//!
//! - **Authentication**: HS256 bearer tokens, verified on every call except
//!   a configurable set of exempt methods
//! - **Session Revocation**: logout revokes a token until its natural expiry;
//!   a background sweep reclaims entries once they expire
//! - **Rate Limiting**: fixed-window call budgets per caller address or
//!   shared globally
//! - **Response Timing**: latency logged, recorded as metrics and returned
//!   in `x-response-time` metadata
//! - **Deadlines**: the caller's `grpc-timeout` bounds the handler
//!
//! ## Architecture
//!
//! ```text
//! crates/
//! ├── schoolrpc-core/           # AppError, Clock, password hashing, PeriodicTask
//! ├── schoolrpc-config/         # Environment-driven configuration
//! ├── schoolrpc-auth/           # Claims, TokenCodec, RevocationStore
//! └── schoolrpc-observability/  # Logging and Prometheus metrics
//! src/
//! ├── middleware/               # Tower layers, one per stage
//! ├── modules/sessions/         # Login, password change, logout
//! ├── pipeline.rs               # Call type and stage composition
//! ├── rate_limiter.rs           # Sharded fixed-window counters
//! └── state.rs                  # Shared state and maintenance tasks
//! ```
//!
//! ## Pipeline
//!
//! ```text
//! RateLimit -> Timing -> Auth -> Deadline -> handler
//! ```
//!
//! A call rejected by the rate stage returns `ResourceExhausted` and never
//! reaches later stages. Authentication failures return `Unauthenticated`
//! and never reach the handler. Everything past the rate stage carries
//! `x-response-time`, success or error.
//!
//! ## Quick Start
//!
//! ### Environment Variables
//!
//! ```bash
//! JWT_SECRET=your-secure-secret-key
//! JWT_ACCESS_EXPIRY=3600
//! RATE_LIMIT_THRESHOLD=50
//! RATE_LIMIT_WINDOW_SECONDS=60
//! RATE_LIMIT_SCOPE=peer
//! REVOCATION_SWEEP_INTERVAL_SECONDS=300
//! ```
//!
//! ### Wiring into a tonic service
//!
//! ```ignore
//! let state = schoolrpc::state::init_app_state()?;
//! let _maintenance = state.spawn_maintenance();
//! let pipeline = state.pipeline();
//!
//! // inside a generated service trait method:
//! pipeline.run("/school.TeachersService/GetTeachers", request, get_teachers).await
//! ```
//!
//! ## Modules
//!
//! - [`middleware`]: The pipeline stages
//! - [`modules`]: Feature modules (sessions)
//! - [`pipeline`]: [`Call`](pipeline::Call) and [`Pipeline`](pipeline::Pipeline)
//! - [`rate_limiter`]: Fixed-window rate limiter
//! - [`state`]: Shared application state
//! - [`validator`]: Request validation utilities

pub mod middleware;
pub mod modules;
pub mod pipeline;
pub mod rate_limiter;
pub mod state;
pub mod validator;

// Re-export workspace crates for convenience
pub use schoolrpc_auth;
pub use schoolrpc_config;
pub use schoolrpc_core;
pub use schoolrpc_observability;
