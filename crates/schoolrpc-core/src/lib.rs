//! # schoolrpc Core
//!
//! Foundational types shared by every schoolrpc crate:
//!
//! - [`errors`]: application error type with conversion into `tonic::Status`
//! - [`clock`]: injectable wall clock so expiry logic can run on synthetic time
//! - [`password`]: bcrypt password hashing and verification
//! - [`periodic`]: lifecycle-managed periodic background tasks
//!
//! # Example
//!
//! ```ignore
//! use schoolrpc_core::{AppError, SystemClock, Clock};
//!
//! let now = SystemClock.now();
//! let err = AppError::unauthenticated(anyhow::anyhow!("token has expired"));
//! let status: tonic::Status = err.into();
//! ```

pub mod clock;
pub mod errors;
pub mod password;
pub mod periodic;

// Re-export commonly used types at crate root
pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use errors::AppError;
pub use password::{hash_password, hash_password_with_cost, verify_password};
pub use periodic::PeriodicTask;
pub use tonic::Code;
