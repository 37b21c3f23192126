//! Connection pool setup and migrations.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Open a connection pool against `database_url`.
///
/// # Errors
///
/// Returns an error if the pool cannot be established (bad credentials,
/// unreachable host, etc).
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Run pending migrations.
///
/// # Errors
///
/// Returns an error if any migration fails to apply.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
