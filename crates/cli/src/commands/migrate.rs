//! Database migration command.
//!
//! Applies the migrations embedded in `mistore-db` (`crates/db/migrations/`):
//! the `shop` schema plus the `tower_sessions` tables for both apps.
//!
//! ```bash
//! ms-cli migrate
//! ```

use thiserror::Error;

use super::ConnectError;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run all pending migrations.
pub async fn run() -> Result<(), MigrationError> {
    let pool = super::connect().await?;

    tracing::info!(
        available = mistore_db::MIGRATOR.iter().count(),
        "Running migrations..."
    );
    mistore_db::MIGRATOR.run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
