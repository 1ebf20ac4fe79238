use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::{
    auth::password::{hash_password, verify_password},
    db::AppState,
    error::ApiError,
};

use super::{
    dto::{CreatedResponse, LoginResponse, SearchParams, StatusResponse},
    repo_types::User,
    validate::{validate_create, validate_login, validate_update},
};

/// Malformed JSON bodies map to the same 400 shape as validation failures
/// instead of axum's default rejection.
fn json_body(body: Result<Json<Value>, JsonRejection>) -> Result<Value, ApiError> {
    let Json(value) = body.map_err(|_| ApiError::Validation("Invalid JSON data".into()))?;
    Ok(value)
}

#[instrument(skip(state))]
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, ApiError> {
    let users = state.users.list_all().await?;
    Ok(Json(users))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<User>, ApiError> {
    match state.users.get_by_id(id).await? {
        Some(user) => Ok(Json(user)),
        None => Err(ApiError::NotFound("User not found")),
    }
}

#[instrument(skip(state, body))]
pub async fn create_user(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let data = json_body(body)?;
    let input = validate_create(&data).map_err(|msg| {
        warn!(rule = msg, "create user validation failed");
        ApiError::Validation(msg.into())
    })?;

    if state.users.get_by_email(&input.email).await?.is_some() {
        warn!(email = %input.email, "create user email conflict");
        return Err(ApiError::Conflict("User with this email already exists"));
    }

    let hashed = hash_password(&input.password).map_err(ApiError::Hashing)?;
    let id = state.users.create(&input.name, &input.email, &hashed).await?;

    info!(user_id = id, email = %input.email, "user created");
    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            status: "success",
            message: "User created",
            id,
        }),
    ))
}

#[instrument(skip(state, body))]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<StatusResponse>, ApiError> {
    let data = json_body(body)?;
    let changes = validate_update(&data).map_err(|msg| {
        warn!(user_id = id, rule = msg, "update user validation failed");
        ApiError::Validation(msg.into())
    })?;

    let existing = state
        .users
        .get_by_id(id)
        .await?
        .ok_or(ApiError::NotFound("User not found"))?;

    // Only a different user already holding the new email is a conflict.
    if changes.email != existing.email {
        if let Some(other) = state.users.get_by_email(&changes.email).await? {
            if other.id != id {
                warn!(user_id = id, other_id = other.id, "update email conflict");
                return Err(ApiError::Conflict("Email already taken by another user"));
            }
        }
    }

    state.users.update(id, &changes.name, &changes.email).await?;
    info!(user_id = id, "user updated");
    Ok(Json(StatusResponse {
        status: "success",
        message: "User updated",
    }))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<StatusResponse>, ApiError> {
    if state.users.get_by_id(id).await?.is_none() {
        return Err(ApiError::NotFound("User not found"));
    }

    state.users.delete(id).await?;
    info!(user_id = id, "user deleted");
    Ok(Json(StatusResponse {
        status: "success",
        message: "User deleted",
    }))
}

#[instrument(skip(state))]
pub async fn search_users(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<User>>, ApiError> {
    let fragment = params
        .name
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::Validation("Please provide a name to search".into()))?;

    let users = state.users.search_by_name(&fragment).await?;
    Ok(Json(users))
}

#[instrument(skip(state, body))]
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let data = json_body(body)?;
    let input = validate_login(&data).map_err(|msg| {
        warn!(rule = msg, "login validation failed");
        ApiError::Validation(msg.into())
    })?;

    // Unknown email and bad password return the identical 401 body.
    let user = state
        .users
        .get_by_email_with_credential(&input.email)
        .await?
        .ok_or_else(|| {
            warn!("login with unknown email");
            ApiError::Unauthorized
        })?;

    if !verify_password(&input.password, &user.password) {
        warn!(user_id = user.id, "login with invalid password");
        return Err(ApiError::Unauthorized);
    }

    info!(user_id = user.id, "user logged in");
    Ok(Json(LoginResponse {
        status: "success",
        user_id: user.id,
    }))
}
