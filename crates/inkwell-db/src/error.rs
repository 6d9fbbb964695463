use rusqlite::ErrorCode;
use thiserror::Error;

use inkwell_crypto::HashError;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness or foreign key rule rejected the write. `field` is the
    /// offending column, e.g. `username`, `email`, `title` or `author_id`.
    #[error("constraint violation on {field}")]
    ConstraintViolation { field: String },
    #[error(transparent)]
    Hash(#[from] HashError),
    #[error(transparent)]
    Sqlite(rusqlite::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(code, Some(msg)) = &err {
            if code.code == ErrorCode::ConstraintViolation {
                if let Some(field) = constraint_field(msg) {
                    return StoreError::ConstraintViolation { field };
                }
            }
        }
        StoreError::Sqlite(err)
    }
}

/// Pull the column name out of SQLite's constraint messages:
/// `UNIQUE constraint failed: users.email` -> `email`.
fn constraint_field(msg: &str) -> Option<String> {
    if let Some(cols) = msg.strip_prefix("UNIQUE constraint failed: ") {
        let first = cols.split(',').next()?.trim();
        return first.rsplit('.').next().map(str::to_string);
    }
    if msg.starts_with("FOREIGN KEY constraint failed") {
        return Some("author_id".to_string());
    }
    None
}
