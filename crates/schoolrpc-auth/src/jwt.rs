//! JWT (JSON Web Token) signing and verification.
//!
//! [`TokenCodec`] turns a subject's identity into a signed bearer token and
//! back. It holds only the signing keys, the default lifetime and a clock,
//! so one instance is shared behind an `Arc` by every concurrent call.
//!
//! Expiry is checked against the injected [`Clock`](schoolrpc_core::Clock)
//! rather than the system time, which lets tests expire tokens by advancing
//! a [`ManualClock`](schoolrpc_core::ManualClock).
//!
//! # Example
//!
//! ```ignore
//! use chrono::TimeDelta;
//! use schoolrpc_auth::{Role, TokenCodec};
//!
//! let token = codec.issue("64f1c2", "jdoe", Role::User, TimeDelta::minutes(15))?;
//! let claims = codec.verify(&token)?;
//! assert_eq!(claims.name, "jdoe");
//! ```

use std::fmt;

use chrono::TimeDelta;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use schoolrpc_config::JwtConfig;
use schoolrpc_core::{AppError, SharedClock};

use crate::claims::{Claims, Role};

/// Why a token could not be produced or accepted.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Serialization or signing failed. Never the caller's fault.
    #[error("failed to sign token")]
    Signing(#[source] jsonwebtoken::errors::Error),

    /// Bad signature, wrong algorithm, or not a JWT at all.
    #[error("invalid token")]
    Invalid(#[source] jsonwebtoken::errors::Error),

    /// Authentic, but past its embedded expiry.
    #[error("token has expired")]
    Expired,
}

impl TokenError {
    /// True for every failure that means "the presented token is unusable".
    pub fn is_rejection(&self) -> bool {
        matches!(self, TokenError::Invalid(_) | TokenError::Expired)
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Signing(_) => AppError::internal(err),
            TokenError::Invalid(_) | TokenError::Expired => AppError::unauthenticated(err),
        }
    }
}

/// Signs and verifies HS256 bearer tokens with a process-wide secret.
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    default_ttl: TimeDelta,
    clock: SharedClock,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("default_ttl", &self.default_ttl)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    pub fn new(config: &JwtConfig, clock: SharedClock) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against `clock` in `verify`.
        validation.validate_exp = false;
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            default_ttl: TimeDelta::try_seconds(config.access_token_expiry)
                .unwrap_or(TimeDelta::MAX),
            clock,
        }
    }

    pub fn default_ttl(&self) -> TimeDelta {
        self.default_ttl
    }

    /// Creates a token for `subject_id` that expires `ttl` from now.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Signing`] if the claims cannot be encoded.
    pub fn issue(
        &self,
        subject_id: &str,
        display_name: &str,
        role: Role,
        ttl: TimeDelta,
    ) -> Result<String, TokenError> {
        let now = self.clock.now().timestamp();

        let claims = Claims {
            sub: subject_id.to_string(),
            name: display_name.to_string(),
            role,
            exp: now + ttl.num_seconds(),
            iat: now,
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(TokenError::Signing)
    }

    /// Creates a token with the configured access token lifetime.
    pub fn issue_default(
        &self,
        subject_id: &str,
        display_name: &str,
        role: Role,
    ) -> Result<String, TokenError> {
        self.issue(subject_id, display_name, role, self.default_ttl)
    }

    /// Verifies the signature and expiry of `token` and returns its claims.
    ///
    /// Revocation is not checked here.
    ///
    /// # Errors
    ///
    /// - [`TokenError::Invalid`] if the token is malformed or its signature
    ///   does not match
    /// - [`TokenError::Expired`] if the embedded expiry has been reached
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(error = %e, "token failed verification");
                TokenError::Invalid(e)
            })?;

        if claims.is_expired_at(self.clock.now()) {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}
