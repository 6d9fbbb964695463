use axum::{
    Json, Router,
    routing::{get, post},
};

use crate::auth::{self, AppState};
use crate::{posts, users};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/login", post(auth::login))
        .route("/users", post(users::create_user).get(users::get_users))
        .route(
            "/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route("/posts", post(posts::create_post).get(posts::get_posts))
        .route(
            "/posts/{id}",
            get(posts::get_post)
                .put(posts::update_post)
                .delete(posts::delete_post),
        )
        .with_state(state)
}

async fn home() -> Json<&'static str> {
    Json("Welcome to the API")
}
