//! # schoolrpc Auth
//!
//! Bearer token handling for the schoolrpc middleware core.
//!
//! This crate provides:
//!
//! - [`claims`]: the identity payload carried inside every token
//! - [`jwt`]: [`TokenCodec`], which signs and verifies tokens
//! - [`revocation`]: [`RevocationStore`], the process-wide set of tokens
//!   invalidated by logout before their natural expiry
//!
//! Verification and revocation are deliberately separate checks: the codec
//! only answers "is this token authentic and unexpired", the store only
//! answers "was it explicitly revoked". The request pipeline composes both.
//!
//! # Example
//!
//! ```ignore
//! use schoolrpc_auth::{Role, RevocationStore, TokenCodec};
//! use schoolrpc_config::JwtConfig;
//! use schoolrpc_core::SystemClock;
//!
//! let codec = TokenCodec::new(&JwtConfig::from_env(), SystemClock::shared());
//! let token = codec.issue_default("64f1c2", "jdoe", Role::Admin)?;
//!
//! let claims = codec.verify(&token)?;
//! let revocations = RevocationStore::new(SystemClock::shared());
//! revocations.revoke(&token, claims.expires_at()).await;
//! assert!(revocations.is_revoked(&token).await);
//! ```

pub mod claims;
pub mod jwt;
pub mod revocation;

// Re-export commonly used types at crate root
pub use claims::{Claims, Role};
pub use jwt::{TokenCodec, TokenError};
pub use revocation::RevocationStore;
