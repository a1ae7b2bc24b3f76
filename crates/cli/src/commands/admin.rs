//! Admin account commands.
//!
//! Staff accounts are ordinary users with the `admin` role, so they can
//! also shop. `promote` upgrades an existing account in place.

use thiserror::Error;

use mistore_admin::services::auth::{AdminAuthError, hash_password, validate_password};
use mistore_core::{Email, UserRole};
use mistore_db::{RepositoryError, UserRepository};

use super::ConnectError;

#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    #[error("Invalid password: {0}")]
    Password(#[from] AdminAuthError),

    #[error("No account with email: {0}")]
    UnknownUser(String),

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),
}

fn parse_email(email: &str) -> Result<Email, AdminError> {
    Email::parse(email).map_err(|e| AdminError::InvalidEmail(format!("{email} ({e})")))
}

/// Create a new admin account. Returns the user ID.
pub async fn create_user(email: &str, name: &str, password: &str) -> Result<i32, AdminError> {
    let email = parse_email(email)?;
    validate_password(password)?;
    let password_hash = hash_password(password)?;

    let pool = super::connect().await?;
    let user = UserRepository::new(&pool)
        .create(&email, name, &password_hash, UserRole::Admin)
        .await?;

    tracing::info!(
        "Admin account created! ID: {}, Email: {}",
        user.id,
        user.email
    );
    Ok(user.id.as_i32())
}

/// Grant the admin role to an existing account.
pub async fn promote(email: &str) -> Result<(), AdminError> {
    let email = parse_email(email)?;

    let pool = super::connect().await?;
    let users = UserRepository::new(&pool);
    let user = users
        .get_by_email(&email)
        .await?
        .ok_or_else(|| AdminError::UnknownUser(email.to_string()))?;

    if user.is_admin() {
        tracing::info!("{} is already an admin", user.email);
        return Ok(());
    }

    users.set_role(user.id, UserRole::Admin).await?;
    tracing::info!("{} is now an admin", user.email);
    Ok(())
}
