//! Token claim structures.
//!
//! [`Claims`] is the payload embedded in every bearer token. It is produced
//! once at issuance and never stored server-side; a verified copy travels
//! with each authenticated call.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Authorization level of a token holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Standard executive account.
    User,
    /// Privileged administrator.
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// JWT claims for access tokens.
///
/// # Fields
///
/// - `sub`: Subject id assigned by the database
/// - `name`: Display name (username)
/// - `role`: Authorization level
/// - `exp`: Expiration timestamp (Unix seconds)
/// - `iat`: Issued-at timestamp (Unix seconds)
/// - `jti`: Unique token id, so two tokens issued in the same second differ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject id
    pub sub: String,
    /// Display name
    pub name: String,
    /// Authorization level
    pub role: Role,
    /// Token expiration timestamp (Unix timestamp)
    pub exp: i64,
    /// Token issued-at timestamp (Unix timestamp)
    pub iat: i64,
    /// Token identifier
    pub jti: String,
}

impl Claims {
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.iat, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// A token is expired from the second its `exp` is reached.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_claims() -> Claims {
        Claims {
            sub: "64f1c2aa9b".to_string(),
            name: "jdoe".to_string(),
            role: Role::Admin,
            exp: 1_700_003_600,
            iat: 1_700_000_000,
            jti: "b7c1".to_string(),
        }
    }

    #[test]
    fn test_claims_serialize() {
        let serialized = serde_json::to_string(&sample_claims()).unwrap();
        assert!(serialized.contains(r#""sub":"64f1c2aa9b""#));
        assert!(serialized.contains(r#""role":"admin""#));
    }

    #[test]
    fn test_claims_deserialize() {
        let json = r#"{"sub":"abc","name":"teacher1","role":"user","exp":9999999999,"iat":9999999900,"jti":"x"}"#;
        let claims: Claims = serde_json::from_str(json).unwrap();
        assert_eq!(claims.sub, "abc");
        assert_eq!(claims.role, Role::User);
        assert!(!claims.is_admin());
    }

    #[test]
    fn test_unknown_role_rejected() {
        let json = r#"{"sub":"abc","name":"n","role":"root","exp":1,"iat":0,"jti":"x"}"#;
        assert!(serde_json::from_str::<Claims>(json).is_err());
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn test_expiry_boundary() {
        let claims = sample_claims();
        let exp = claims.expires_at();
        assert!(!claims.is_expired_at(exp - chrono::TimeDelta::seconds(1)));
        assert!(claims.is_expired_at(exp));
    }

    #[test]
    fn test_role_parse_is_case_insensitive() {
        assert_eq!("ADMIN".parse::<Role>(), Ok(Role::Admin));
        assert_eq!(Role::User.to_string(), "user");
    }
}
