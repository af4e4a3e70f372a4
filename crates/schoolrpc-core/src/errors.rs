use anyhow::Error;
use tonic::{Code, Status};
use tracing::error;

#[derive(Debug)]
pub struct AppError {
    pub code: Code,
    pub error: Error,
}

impl AppError {
    pub fn new<E>(code: Code, err: E) -> Self
    where
        E: Into<Error>,
    {
        Self {
            code,
            error: err.into(),
        }
    }

    pub fn internal<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(Code::Internal, err)
    }

    pub fn unauthenticated<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(Code::Unauthenticated, err)
    }

    pub fn permission_denied<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(Code::PermissionDenied, err)
    }

    pub fn invalid_argument<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(Code::InvalidArgument, err)
    }

    pub fn not_found<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(Code::NotFound, err)
    }

    pub fn resource_exhausted<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(Code::ResourceExhausted, err)
    }

    pub fn is_internal(&self) -> bool {
        matches!(self.code, Code::Internal | Code::Unknown)
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.error)
    }
}

// Internal failures are operator-facing; callers only see a generic message.
impl From<AppError> for Status {
    fn from(err: AppError) -> Self {
        if err.is_internal() {
            error!(error = ?err.error, "internal error while handling call");
            return Status::new(err.code, "internal error");
        }

        Status::new(err.code, err.error.to_string())
    }
}
