//! Database migration command.
//!
//! Migrations are never run automatically by the storefront binary; deploys
//! invoke this command first.

use secrecy::SecretString;
use tracing::info;

use copperleaf_storefront::db;

/// Run storefront database migrations.
///
/// Reads `STOREFRONT_DATABASE_URL` (falling back to `DATABASE_URL`) and
/// applies anything pending from `crates/storefront/migrations/`.
///
/// # Errors
///
/// Returns an error if the environment variable is missing, the connection
/// fails, or a migration fails to apply.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| "STOREFRONT_DATABASE_URL not set")?;

    info!("Connecting to storefront database");
    let pool = db::create_pool(&database_url).await?;

    info!("Running migrations");
    sqlx::migrate!("../storefront/migrations").run(&pool).await?;

    info!("Migrations complete");
    Ok(())
}
