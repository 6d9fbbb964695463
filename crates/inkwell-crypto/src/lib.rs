//! Inkwell credential primitives.
//!
//! - `password`: Argon2id hashing and verification for stored user passwords.
//! - `token`: HS256 bearer tokens carrying a user id and a one-hour expiry.
//!
//! Both are pure functions of their inputs plus injected configuration; no
//! environment is read here.

pub mod password;
pub mod token;

pub use password::{CredentialHasher, HashError};
pub use token::{TokenError, TokenService};
