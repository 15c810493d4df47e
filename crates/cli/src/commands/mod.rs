//! CLI command implementations.

pub mod migrate;
pub mod reslug;
pub mod seed;

use secrecy::SecretString;
use sqlx::PgPool;

use marigold_storefront::db;

/// Errors shared by the commands.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Repository error: {0}")]
    Repository(#[from] db::RepositoryError),

    #[error("Slug resolution failed: {0}")]
    Slug(#[from] marigold_storefront::services::slug::SlugError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] marigold_storefront::services::catalog::CatalogError),
}

/// Connect using `MARIGOLD_DATABASE_URL` (or `DATABASE_URL`).
pub async fn connect() -> Result<PgPool, CommandError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("MARIGOLD_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CommandError::MissingEnvVar("MARIGOLD_DATABASE_URL"))?;

    Ok(db::create_pool(&database_url).await?)
}
