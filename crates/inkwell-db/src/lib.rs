pub mod error;
pub mod migrations;
pub mod queries;

use anyhow::Result;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

use inkwell_crypto::CredentialHasher;

pub use error::{StoreError, StoreResult};
pub use queries::MAX_LIST_ROWS;

/// SQLite-backed store for users and posts.
///
/// Every operation is a single statement under the connection lock; the
/// store does not open multi-statement transactions.
pub struct Database {
    conn: Mutex<Connection>,
    hasher: CredentialHasher,
}

impl Database {
    pub fn open(path: &Path, hasher: CredentialHasher) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;

        let db = Self::init(conn, hasher)?;
        info!("Database opened at {}", path.display());
        Ok(db)
    }

    pub fn open_in_memory(hasher: CredentialHasher) -> Result<Self> {
        Self::init(Connection::open_in_memory()?, hasher)
    }

    fn init(conn: Connection, hasher: CredentialHasher) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrations::run(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            hasher,
        })
    }

    pub fn hasher(&self) -> &CredentialHasher {
        &self.hasher
    }

    pub fn with_conn<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Connection) -> StoreResult<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))?;
        f(&conn)
    }
}
