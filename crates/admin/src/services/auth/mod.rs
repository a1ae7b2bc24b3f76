//! Admin authentication service.
//!
//! Staff sign in with the same email and password accounts as customers;
//! only the `admin` role gets through. Hashing helpers are public so the CLI
//! can create admin accounts with identical parameters.

mod error;

pub use error::AdminAuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::PgPool;
use tracing::instrument;

use mistore_core::Email;
use mistore_db::UserRepository;
use mistore_db::models::User;

/// Minimum password length, shared with the storefront.
pub const MIN_PASSWORD_LENGTH: usize = 8;

const MAX_PASSWORD_LENGTH: usize = 256;

/// Admin authentication service.
pub struct AdminAuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AdminAuthService<'a> {
    /// Create a new admin authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    /// Check credentials and insist on the admin role.
    ///
    /// # Errors
    ///
    /// Returns `AdminAuthError::InvalidCredentials` if the email/password is wrong.
    /// Returns `AdminAuthError::NotAdmin` if the account is a customer.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AdminAuthError> {
        let email = Email::parse(email).map_err(|_| AdminAuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_password_hash(&email)
            .await?
            .ok_or(AdminAuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        if !user.is_admin() {
            tracing::warn!(user_id = %user.id, "Customer attempted admin login");
            return Err(AdminAuthError::NotAdmin);
        }
        Ok(user)
    }
}

/// Check password length rules.
///
/// # Errors
///
/// Returns `AdminAuthError::WeakPassword` with the reason.
pub fn validate_password(password: &str) -> Result<(), AdminAuthError> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LENGTH {
        return Err(AdminAuthError::WeakPassword(format!(
            "must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    if len > MAX_PASSWORD_LENGTH {
        return Err(AdminAuthError::WeakPassword(format!(
            "must be at most {MAX_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id with a fresh salt.
///
/// # Errors
///
/// Returns `AdminAuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AdminAuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AdminAuthError::PasswordHash)
}

fn verify_password(password: &str, hash: &str) -> Result<(), AdminAuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AdminAuthError::InvalidCredentials)?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AdminAuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_round_trip() {
        let hash = hash_password("staff-only-pass").unwrap();
        assert!(verify_password("staff-only-pass", &hash).is_ok());
        assert!(matches!(
            verify_password("staff-only-pasS", &hash),
            Err(AdminAuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_hashes_are_salted() {
        assert_ne!(hash_password("same").unwrap(), hash_password("same").unwrap());
    }

    #[test]
    fn test_validate_password() {
        assert!(matches!(
            validate_password("short"),
            Err(AdminAuthError::WeakPassword(_))
        ));
        assert!(validate_password("long enough").is_ok());
    }
}
