pub mod api;
pub mod models;
pub mod validation;

pub use models::{Post, User};
pub use validation::{UserAction, ValidationError};
