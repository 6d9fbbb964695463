pub mod auth;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod posts;
pub mod routes;
pub mod users;

pub use auth::{AppState, AppStateInner};
pub use error::ApiError;
pub use routes::build_router;
