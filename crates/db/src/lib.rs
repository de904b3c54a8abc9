//! Database connection factory and migration runner.

use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use bookshelf_kernel::{settings::DatabaseSettings, Migration};

pub type Pool = SqlitePool;

const MIGRATIONS_TABLE: &str = "_bookshelf_migrations";

/// Open a connection pool for the configured database.
///
/// In-memory databases are private to a connection, so they get a single
/// connection that is never recycled.
pub async fn connect(settings: &DatabaseSettings) -> anyhow::Result<Pool> {
    let options = SqliteConnectOptions::from_str(&settings.url)
        .with_context(|| format!("invalid database url '{}'", settings.url))?
        .foreign_keys(true);

    let mut pool_options = SqlitePoolOptions::new()
        .acquire_timeout(Duration::from_millis(settings.acquire_timeout_ms));

    if is_in_memory(&settings.url) {
        pool_options = pool_options
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    } else {
        pool_options = pool_options.max_connections(settings.max_connections);
    }

    let pool = pool_options
        .connect_with(options)
        .await
        .with_context(|| format!("failed to connect to '{}'", settings.url))?;

    tracing::info!(target: "bookshelf-db", url = %settings.url, "database connection established");
    Ok(pool)
}

fn is_in_memory(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

/// Apply every migration not yet recorded, in the given order.
///
/// Each migration runs in its own transaction together with its bookkeeping
/// row. Returns the number of migrations applied.
pub async fn run_migrations(pool: &Pool, migrations: &[(String, Migration)]) -> anyhow::Result<usize> {
    sqlx::query(&format!(
        "CREATE TABLE IF NOT EXISTS {MIGRATIONS_TABLE} (
            module     TEXT NOT NULL,
            id         TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (module, id)
        )"
    ))
    .execute(pool)
    .await
    .context("failed to create migrations table")?;

    let mut applied = 0;

    for (module, migration) in migrations {
        let already_applied: Option<i64> = sqlx::query_scalar(&format!(
            "SELECT 1 FROM {MIGRATIONS_TABLE} WHERE module = ? AND id = ?"
        ))
        .bind(module)
        .bind(migration.id)
        .fetch_optional(pool)
        .await
        .context("failed to read migrations table")?;

        if already_applied.is_some() {
            tracing::debug!(target: "bookshelf-db", module = %module, migration = migration.id, "migration already applied");
            continue;
        }

        let mut tx = pool.begin().await?;

        sqlx::raw_sql(migration.up)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("migration {}/{} failed", module, migration.id))?;

        sqlx::query(&format!(
            "INSERT INTO {MIGRATIONS_TABLE} (module, id) VALUES (?, ?)"
        ))
        .bind(module)
        .bind(migration.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(target: "bookshelf-db", module = %module, migration = migration.id, "migration applied");
        applied += 1;
    }

    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_settings() -> DatabaseSettings {
        DatabaseSettings {
            url: "sqlite::memory:".to_string(),
            ..DatabaseSettings::default()
        }
    }

    fn shelf_migrations() -> Vec<(String, Migration)> {
        vec![
            (
                "shelves".to_string(),
                Migration {
                    id: "001_init",
                    up: "CREATE TABLE shelves (id INTEGER PRIMARY KEY, label TEXT NOT NULL);",
                },
            ),
            (
                "shelves".to_string(),
                Migration {
                    id: "002_seed",
                    up: "INSERT INTO shelves (label) VALUES ('a'); INSERT INTO shelves (label) VALUES ('b');",
                },
            ),
        ]
    }

    #[test]
    fn detects_in_memory_urls() {
        assert!(is_in_memory("sqlite::memory:"));
        assert!(is_in_memory("sqlite://file:shelf?mode=memory&cache=shared"));
        assert!(!is_in_memory("sqlite://bookshelf.db?mode=rwc"));
    }

    #[tokio::test]
    async fn migrations_apply_once() {
        let pool = connect(&memory_settings()).await.unwrap();

        let first = run_migrations(&pool, &shelf_migrations()).await.unwrap();
        let second = run_migrations(&pool, &shelf_migrations()).await.unwrap();

        assert_eq!(first, 2);
        assert_eq!(second, 0);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM shelves")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn failed_migration_is_not_recorded() {
        let pool = connect(&memory_settings()).await.unwrap();
        let broken = vec![(
            "shelves".to_string(),
            Migration {
                id: "001_broken",
                up: "CREATE TABLE shelves (id INTEGER PRIMARY KEY); CREATE TABLE nope (",
            },
        )];

        let err = run_migrations(&pool, &broken).await.unwrap_err();
        assert!(err.to_string().contains("shelves/001_broken"));

        let recorded: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {MIGRATIONS_TABLE}"))
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(recorded, 0);
    }
}
