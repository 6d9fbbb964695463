use axum::{
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};
use tracing::{info, warn};

use inkwell_types::{User, UserAction};

use crate::auth::{AppState, with_db};
use crate::error::ApiError;
use crate::extract::{Json, Path};
use crate::middleware::AuthUser;

pub async fn create_user(
    State(state): State<AppState>,
    Json(mut user): Json<User>,
) -> Result<impl IntoResponse, ApiError> {
    user.prepare();
    user.validate(UserAction::Create)?;

    let created = with_db(&state, move |db| db.create_user(&user)).await?;
    info!("Registered user {}", created.id);

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/users/{}", created.id))],
        Json(created),
    ))
}

pub async fn get_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, ApiError> {
    let users = with_db(&state, |db| db.find_all_users()).await?;
    Ok(Json(users))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> Result<Json<User>, ApiError> {
    with_db(&state, move |db| db.find_user_by_id(id))
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("User"))
}

/// A user may only change their own account.
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<u32>,
    AuthUser(caller): AuthUser,
    Json(mut user): Json<User>,
) -> Result<Json<User>, ApiError> {
    if caller != id {
        warn!("User {} tried to update user {}", caller, id);
        return Err(ApiError::Forbidden);
    }

    user.prepare();
    user.validate(UserAction::Update)?;

    with_db(&state, move |db| db.update_user(id, &user))
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("User"))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<u32>,
    AuthUser(caller): AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    if caller != id {
        warn!("User {} tried to delete user {}", caller, id);
        return Err(ApiError::Forbidden);
    }

    let removed = with_db(&state, move |db| db.delete_user(id)).await?;
    if removed == 0 {
        return Err(ApiError::NotFound("User"));
    }

    info!("Deleted user {}", id);
    Ok((StatusCode::NO_CONTENT, [("entity", id.to_string())]))
}
