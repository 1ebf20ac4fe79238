use async_trait::async_trait;
use sqlx::SqlitePool;
use time::OffsetDateTime;

use super::repo_types::{User, UserWithCredential};

/// Single-table store behind the user API. One production implementation
/// over SQLite; the trait leaves room for a test double.
///
/// Every operation is a single statement, so each call is atomic; failures
/// surface as `sqlx::Error` and are translated at the handler boundary.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// All users ordered by id ascending, without the password column.
    async fn list_all(&self) -> sqlx::Result<Vec<User>>;

    async fn get_by_id(&self, id: i64) -> sqlx::Result<Option<User>>;

    async fn get_by_email(&self, email: &str) -> sqlx::Result<Option<User>>;

    /// Login lookup; the only read that includes the stored hash.
    async fn get_by_email_with_credential(
        &self,
        email: &str,
    ) -> sqlx::Result<Option<UserWithCredential>>;

    /// Insert a new user and return its generated id. The unique index on
    /// email is the final guarantee against racing duplicate creates.
    async fn create(&self, name: &str, email: &str, password_hash: &str) -> sqlx::Result<i64>;

    /// Overwrite name and email and refresh `updated_at`. Assumes the
    /// caller already verified the row exists.
    async fn update(&self, id: i64, name: &str, email: &str) -> sqlx::Result<()>;

    async fn delete(&self, id: i64) -> sqlx::Result<()>;

    /// Substring match on name ordered by name ascending. SQLite `LIKE` is
    /// ASCII-case-insensitive, so matching folds case for ASCII letters.
    async fn search_by_name(&self, fragment: &str) -> sqlx::Result<Vec<User>>;
}

pub struct SqlxUserStore {
    pool: SqlitePool,
}

impl SqlxUserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for SqlxUserStore {
    async fn list_all(&self) -> sqlx::Result<Vec<User>> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, created_at, updated_at
            FROM users
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn get_by_id(&self, id: i64) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, created_at, updated_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_by_email(&self, email: &str) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, created_at, updated_at
            FROM users
            WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_by_email_with_credential(
        &self,
        email: &str,
    ) -> sqlx::Result<Option<UserWithCredential>> {
        sqlx::query_as::<_, UserWithCredential>(
            r#"
            SELECT id, name, email, password
            FROM users
            WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    async fn create(&self, name: &str, email: &str, password_hash: &str) -> sqlx::Result<i64> {
        let now = OffsetDateTime::now_utc();
        let result = sqlx::query(
            r#"
            INSERT INTO users (name, email, password, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    async fn update(&self, id: i64, name: &str, email: &str) -> sqlx::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET name = ?, email = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(OffsetDateTime::now_utc())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, id: i64) -> sqlx::Result<()> {
        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn search_by_name(&self, fragment: &str) -> sqlx::Result<Vec<User>> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, created_at, updated_at
            FROM users
            WHERE name LIKE ?
            ORDER BY name
            "#,
        )
        .bind(format!("%{fragment}%"))
        .fetch_all(&self.pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;
    use crate::error::ApiError;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_store() -> SqlxUserStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory pool");
        init_schema(&pool).await.expect("schema");
        SqlxUserStore::new(pool)
    }

    #[tokio::test]
    async fn create_then_get_by_id_roundtrips() {
        let store = test_store().await;
        let id = store
            .create("Test User", "test@example.com", "hash")
            .await
            .expect("create");

        let user = store.get_by_id(id).await.expect("get").expect("present");
        assert_eq!(user.id, id);
        assert_eq!(user.name, "Test User");
        assert_eq!(user.email, "test@example.com");
        assert_eq!(user.created_at, user.updated_at);
    }

    #[tokio::test]
    async fn public_rows_never_serialize_a_password() {
        let store = test_store().await;
        let id = store
            .create("Test User", "test@example.com", "hash")
            .await
            .expect("create");

        let user = store.get_by_id(id).await.expect("get").expect("present");
        let json = serde_json::to_value(&user).expect("serialize");
        assert!(json.get("password").is_none());
        assert!(json.get("created_at").is_some());
    }

    #[tokio::test]
    async fn list_all_orders_by_id() {
        let store = test_store().await;
        store.create("B", "b@example.com", "h").await.expect("create");
        store.create("A", "a@example.com", "h").await.expect("create");
        store.create("C", "c@example.com", "h").await.expect("create");

        let users = store.list_all().await.expect("list");
        let ids: Vec<i64> = users.iter().map(|u| u.id).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
        assert_eq!(users.len(), 3);
    }

    #[tokio::test]
    async fn duplicate_email_maps_to_conflict() {
        let store = test_store().await;
        store
            .create("First", "dup@example.com", "h1")
            .await
            .expect("first create");

        let err = store
            .create("Second", "dup@example.com", "h2")
            .await
            .expect_err("unique index must reject the duplicate");
        assert!(matches!(ApiError::from(err), ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn update_refreshes_updated_at_only() {
        let store = test_store().await;
        let id = store
            .create("Old Name", "old@example.com", "h")
            .await
            .expect("create");
        let before = store.get_by_id(id).await.expect("get").expect("present");

        store
            .update(id, "New Name", "new@example.com")
            .await
            .expect("update");

        let after = store.get_by_id(id).await.expect("get").expect("present");
        assert_eq!(after.id, id);
        assert_eq!(after.name, "New Name");
        assert_eq!(after.email, "new@example.com");
        assert_eq!(after.created_at, before.created_at);
        assert!(after.updated_at >= before.updated_at);
    }

    #[tokio::test]
    async fn delete_removes_the_row() {
        let store = test_store().await;
        let id = store
            .create("Gone", "gone@example.com", "h")
            .await
            .expect("create");

        store.delete(id).await.expect("delete");
        assert!(store.get_by_id(id).await.expect("get").is_none());
    }

    #[tokio::test]
    async fn search_matches_substring_ordered_by_name() {
        let store = test_store().await;
        store
            .create("John Doe", "john@example.com", "h")
            .await
            .expect("create");
        store
            .create("Jane Smith", "jane@example.com", "h")
            .await
            .expect("create");
        store
            .create("Johnny Cash", "cash@example.com", "h")
            .await
            .expect("create");

        let hits = store.search_by_name("John").await.expect("search");
        let names: Vec<&str> = hits.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["John Doe", "Johnny Cash"]);

        let none = store.search_by_name("Zzyx").await.expect("search");
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn credential_lookup_includes_the_hash() {
        let store = test_store().await;
        store
            .create("Login User", "login@example.com", "the-hash")
            .await
            .expect("create");

        let row = store
            .get_by_email_with_credential("login@example.com")
            .await
            .expect("lookup")
            .expect("present");
        assert_eq!(row.password, "the-hash");

        assert!(store
            .get_by_email_with_credential("missing@example.com")
            .await
            .expect("lookup")
            .is_none());
    }
}
