use std::env;

/// Fully-qualified methods callable without a bearer token.
pub const DEFAULT_EXEMPT_METHODS: &[&str] = &[
    "/school.ExecsService/Login",
    "/school.ExecsService/ForgotPassword",
    "/school.ExecsService/ResetPassword",
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthConfig {
    /// Methods in `/package.Service/Method` form that skip authentication.
    pub exempt_methods: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            exempt_methods: DEFAULT_EXEMPT_METHODS
                .iter()
                .map(|m| m.to_string())
                .collect(),
        }
    }
}

impl AuthConfig {
    pub fn from_env() -> Self {
        match env::var("AUTH_EXEMPT_METHODS") {
            Ok(raw) => Self {
                exempt_methods: raw
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            },
            Err(_) => Self::default(),
        }
    }

    pub fn is_exempt(&self, method: &str) -> bool {
        self.exempt_methods.iter().any(|m| m == method)
    }
}
