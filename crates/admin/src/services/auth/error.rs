//! Admin authentication error types.

use thiserror::Error;

use mistore_db::RepositoryError;

/// Errors that can occur during admin authentication.
#[derive(Debug, Error)]
pub enum AdminAuthError {
    /// Unknown email, wrong password or malformed email.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Credentials were right but the account is a customer.
    #[error("account is not an administrator")]
    NotAdmin,

    /// Password too weak or too long.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
