use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

/// User row as returned to clients; the password column is never selected
/// into this type.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Login-lookup row, the only representation that carries the stored hash.
#[derive(Debug, Clone, FromRow)]
pub struct UserWithCredential {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password: String,
}
