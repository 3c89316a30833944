/// Database migration runner
///
/// Migrations live in the workspace-level `migrations/` directory and are
/// embedded into the binary at compile time with `sqlx::migrate!`, one file
/// per table:
///
/// - `users` (unique `username`, unique `email`)
/// - `todo_lists` (`owner_id` → `users.id`, ON DELETE RESTRICT)
/// - `todos` (`list_id` → `todo_lists.id`, ON DELETE RESTRICT)
///
/// # Example
///
/// ```no_run
/// use todo_shared::db::pool::{create_pool, DatabaseConfig};
/// use todo_shared::db::migrations::{run_migrations, get_migration_status};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = DatabaseConfig {
///         url: std::env::var("DATABASE_URL")?,
///         ..Default::default()
///     };
///
///     let pool = create_pool(&config).await?;
///     run_migrations(&pool).await?;
///
///     let status = get_migration_status(&pool).await?;
///     println!("Applied {} migrations", status.applied_migrations);
///     Ok(())
/// }
/// ```

use sqlx::{migrate::MigrateDatabase, postgres::PgPool, Postgres};
use tracing::{debug, info, warn};

/// Migration status information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    /// Number of migrations that have been applied
    pub applied_migrations: usize,

    /// Latest applied migration version (timestamp)
    pub latest_version: Option<i64>,

    /// Whether every embedded migration has been applied
    pub is_up_to_date: bool,
}

/// Number of migrations compiled into this binary
pub fn embedded_migration_count() -> usize {
    sqlx::migrate!("../migrations").iter().count()
}

/// Runs all pending database migrations
///
/// # Errors
///
/// Returns an error if a migration fails to apply or the database connection
/// is lost while migrating
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    let migrator = sqlx::migrate!("../migrations");
    info!(embedded = migrator.iter().count(), "Applying migrations");

    migrator.run(pool).await.map_err(|e| {
        warn!("Migration failed: {}", e);
        e
    })?;

    info!("Schema is up to date");
    Ok(())
}

/// Reads `_sqlx_migrations` and compares it with the embedded set
///
/// # Errors
///
/// Returns an error if the migrations table cannot be queried
pub async fn get_migration_status(pool: &PgPool) -> Result<MigrationStatus, sqlx::Error> {
    let tracked: bool = sqlx::query_scalar("SELECT to_regclass('public._sqlx_migrations') IS NOT NULL")
        .fetch_one(pool)
        .await?;

    let applied: Vec<i64> = if tracked {
        sqlx::query_scalar("SELECT version FROM _sqlx_migrations WHERE success ORDER BY version")
            .fetch_all(pool)
            .await?
    } else {
        Vec::new()
    };

    let is_up_to_date = sqlx::migrate!("../migrations")
        .iter()
        .all(|m| applied.binary_search(&m.version).is_ok());

    debug!(applied = applied.len(), is_up_to_date, "Migration status");

    Ok(MigrationStatus {
        applied_migrations: applied.len(),
        latest_version: applied.last().copied(),
        is_up_to_date,
    })
}

/// Creates the database named in `database_url` when it is missing
pub async fn ensure_database_exists(database_url: &str) -> Result<(), sqlx::Error> {
    if Postgres::database_exists(database_url).await? {
        debug!("Database exists");
        return Ok(());
    }

    info!("Creating database");
    Postgres::create_database(database_url).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_migrations_cover_all_tables() {
        assert_eq!(embedded_migration_count(), 3);
    }

    #[test]
    fn test_embedded_migrations_are_ordered() {
        let migrator = sqlx::migrate!("../migrations");
        let versions: Vec<i64> = migrator.iter().map(|m| m.version).collect();

        let mut sorted = versions.clone();
        sorted.sort_unstable();
        assert_eq!(versions, sorted);
    }
}
