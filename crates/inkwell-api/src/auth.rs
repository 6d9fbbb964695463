use std::sync::Arc;

use axum::extract::State;
use tracing::{error, info};

use inkwell_crypto::TokenService;
use inkwell_db::{Database, StoreResult};
use inkwell_types::api::{LoginRequest, LoginResponse};
use inkwell_types::{User, UserAction};

use crate::error::ApiError;
use crate::extract::Json;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub tokens: TokenService,
}

/// Run a blocking store call off the async runtime.
pub(crate) async fn with_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> StoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(e.into())
        })?
        .map_err(ApiError::from)
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let mut user = User {
        email: req.email,
        password: req.password,
        ..Default::default()
    };
    user.prepare();
    user.validate(UserAction::Login)?;

    let user_id = with_db(&state, move |db| {
        let Some(stored) = db.find_user_by_email(&user.email)? else {
            return Ok(None);
        };
        let matches = db.hasher().verify(&stored.password, &user.password)?;
        Ok(matches.then_some(stored.id))
    })
    .await?
    .ok_or(ApiError::IncorrectPassword)?;

    let token = state.tokens.issue(user_id)?;
    info!("User {} logged in", user_id);

    Ok(Json(LoginResponse { token }))
}
