//! Error taxonomy shared by the provisioner and its database backends.

use thiserror::Error;

/// Errors surfaced while provisioning a database user.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("user '{user}' already exists in database '{db}'")]
    DuplicateUser { user: String, db: String },

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("connection failure: {0}")]
    ConnectionFailure(String),

    #[error("invalid credential: {0}")]
    InvalidCredential(String),

    #[error(transparent)]
    Secret(#[from] SecretError),

    #[error("database error: {0}")]
    Backend(String),
}

impl ProvisionError {
    pub fn duplicate_user(user: impl Into<String>, db: impl Into<String>) -> Self {
        Self::DuplicateUser {
            user: user.into(),
            db: db.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidCredential(message.into())
    }

    /// Stable machine-readable code, used as a log field.
    pub fn code(&self) -> &'static str {
        match self {
            Self::DuplicateUser { .. } => "duplicate_user",
            Self::PermissionDenied(_) => "permission_denied",
            Self::ConnectionFailure(_) => "connection_failure",
            Self::InvalidCredential(_) => "invalid_credential",
            Self::Secret(_) => "secret_unavailable",
            Self::Backend(_) => "backend_error",
        }
    }
}

/// Errors raised when a secret cannot be acquired.
#[derive(Debug, Error)]
pub enum SecretError {
    #[error("secret '{0}' is not set (set {0} or {0}_FILE)")]
    Missing(String),

    #[error("secret '{0}' is empty")]
    Empty(String),

    #[error("secret '{name}' is not valid unicode")]
    NotUnicode { name: String },

    #[error("failed to read secret file '{path}' for '{name}': {source}")]
    File {
        name: String,
        path: String,
        #[source]
        source: std::io::Error,
    },
}
