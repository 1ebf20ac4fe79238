use serde::{Deserialize, Serialize};

/// Body for a successful create: `{"status":"success","message":"User created","id":7}`.
#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub id: i64,
}

/// Body for successful update/delete.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub message: &'static str,
}

/// Body for a successful login; carries only the identifier, no token.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub status: &'static str,
    pub user_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub name: Option<String>,
}
