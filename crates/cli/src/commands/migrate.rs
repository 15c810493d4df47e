//! Database migration command.
//!
//! Runs the SQL migrations from `crates/storefront/migrations/` and then
//! the tower-sessions store migration (session table).

use tower_sessions_sqlx_store::PostgresStore;
use tracing::info;

use super::{CommandError, connect};

/// Run all storefront database migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;

    info!("Running storefront migrations...");
    sqlx::migrate!("../storefront/migrations").run(&pool).await?;

    info!("Running session store migration...");
    PostgresStore::new(pool.clone())
        .migrate()
        .await
        .map_err(CommandError::Database)?;

    info!("Migrations complete!");
    Ok(())
}
