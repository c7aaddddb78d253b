//! # SIGES DB
//!
//! PostgreSQL pool initialization and embedded migrations.
//!
//! ```ignore
//! use siges_db::{init_db_pool, run_migrations};
//!
//! let pool = init_db_pool(&config).await?;
//! run_migrations(&pool).await?;
//! ```

use siges_config::DatabaseConfig;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

pub use sqlx::PgPool;

/// Creates the connection pool described by `config`.
///
/// Called once at startup; the returned pool is cheap to clone and lives in
/// the application state.
pub async fn init_db_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    info!(
        db.max_connections = config.max_connections,
        "Connecting to database"
    );

    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.url)
        .await
}

/// Applies the migrations under the workspace `migrations/` directory.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../migrations").run(pool).await
}
