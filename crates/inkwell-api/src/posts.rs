use axum::{
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};
use tracing::{info, warn};

use inkwell_types::Post;

use crate::auth::{AppState, with_db};
use crate::error::ApiError;
use crate::extract::{Json, Path};
use crate::middleware::AuthUser;

pub async fn create_post(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Json(mut post): Json<Post>,
) -> Result<impl IntoResponse, ApiError> {
    post.prepare();
    post.validate()?;

    if caller != post.author_id {
        warn!("User {} tried to post as user {}", caller, post.author_id);
        return Err(ApiError::Forbidden);
    }

    let created = with_db(&state, move |db| db.create_post(&post)).await?;
    info!("User {} created post {}", caller, created.id);

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/posts/{}", created.id))],
        Json(created),
    ))
}

pub async fn get_posts(State(state): State<AppState>) -> Result<Json<Vec<Post>>, ApiError> {
    let posts = with_db(&state, |db| db.find_all_posts()).await?;
    Ok(Json(posts))
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<Post>, ApiError> {
    with_db(&state, move |db| db.find_post_by_id(id))
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("Post"))
}

/// Look up a post and confirm `caller` wrote it.
async fn owned_post(state: &AppState, id: u64, caller: u32) -> Result<Post, ApiError> {
    let post = with_db(state, move |db| db.find_post_by_id(id))
        .await?
        .ok_or(ApiError::NotFound("Post"))?;

    if post.author_id != caller {
        warn!("User {} does not own post {}", caller, id);
        return Err(ApiError::Forbidden);
    }
    Ok(post)
}

pub async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    AuthUser(caller): AuthUser,
    Json(mut update): Json<Post>,
) -> Result<Json<Post>, ApiError> {
    let existing = owned_post(&state, id, caller).await?;

    // Authorship is fixed at creation.
    update.author_id = existing.author_id;
    update.prepare();
    update.validate()?;

    with_db(&state, move |db| db.update_post(id, &update))
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("Post"))
}

pub async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    AuthUser(caller): AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    owned_post(&state, id, caller).await?;

    let removed = with_db(&state, move |db| db.delete_post(id, caller)).await?;
    if removed == 0 {
        return Err(ApiError::NotFound("Post"));
    }

    info!("User {} deleted post {}", caller, id);
    Ok((StatusCode::NO_CONTENT, [("entity", id.to_string())]))
}
