use std::sync::Arc;

use anyhow::Context;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use tracing::info;

use crate::auth::password::hash_password;
use crate::config::AppConfig;
use crate::users::repo::{SqlxUserStore, UserStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env());
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;

        init_schema(&pool).await?;
        seed_if_empty(&pool).await?;

        Ok(Self::from_parts(config, Arc::new(SqlxUserStore::new(pool))))
    }

    pub fn from_parts(config: Arc<AppConfig>, users: Arc<dyn UserStore>) -> Self {
        Self { config, users }
    }
}

/// Create the users table and its secondary indexes if missing.
pub async fn init_schema(pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            password TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .context("create users table")?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_users_email ON users(email)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_users_name ON users(name)")
        .execute(pool)
        .await?;

    Ok(())
}

/// First-run sample data; plaintexts are hashed at seed time and never
/// stored.
pub async fn seed_if_empty(pool: &SqlitePool) -> anyhow::Result<()> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;
    if count > 0 {
        return Ok(());
    }

    let store = SqlxUserStore::new(pool.clone());
    let samples = [
        ("John Doe", "john@example.com", "password123"),
        ("Jane Smith", "jane@example.com", "secret456"),
        ("Bob Johnson", "bob@example.com", "qwerty789"),
    ];
    for (name, email, password) in samples {
        let hashed = hash_password(password)?;
        store.create(name, email, &hashed).await?;
    }

    info!("database seeded with sample users");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory pool")
    }

    #[tokio::test]
    async fn schema_init_is_idempotent() {
        let pool = test_pool().await;
        init_schema(&pool).await.expect("first init");
        init_schema(&pool).await.expect("second init");
    }

    #[tokio::test]
    async fn seeding_runs_once() {
        let pool = test_pool().await;
        init_schema(&pool).await.expect("schema");

        seed_if_empty(&pool).await.expect("seed");
        seed_if_empty(&pool).await.expect("seed again is a no-op");

        let store = SqlxUserStore::new(pool);
        let users = store.list_all().await.expect("list");
        assert_eq!(users.len(), 3);
        assert_eq!(users[0].email, "john@example.com");
        assert_eq!(users[1].email, "jane@example.com");
        assert_eq!(users[2].email, "bob@example.com");
    }
}
