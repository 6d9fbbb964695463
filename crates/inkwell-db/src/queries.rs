use chrono::Utc;
use rusqlite::{Connection, Row, params};
use tracing::debug;

use inkwell_types::{Post, User};

use crate::error::{StoreError, StoreResult};
use crate::Database;

/// Upper bound on rows returned by the list queries.
pub const MAX_LIST_ROWS: u32 = 100;

const USER_COLUMNS: &str = "id, username, email, password, created_at, updated_at";

const POST_SELECT: &str = "SELECT p.id, p.title, p.content, p.author_id, p.created_at, p.updated_at,
        u.id, u.username, u.email, u.created_at, u.updated_at
     FROM posts p
     JOIN users u ON u.id = p.author_id";

impl Database {
    // -- Users --

    /// Insert a prepared, validated user. The password is hashed here, so
    /// the returned user carries the stored hash.
    pub fn create_user(&self, user: &User) -> StoreResult<User> {
        let password_hash = self.hasher().hash(&user.password)?;

        let id = self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (username, email, password, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![user.username, user.email, password_hash, user.created_at, user.updated_at],
            )?;
            Ok(conn.last_insert_rowid())
        })?;

        debug!("Created user {}", id);
        Ok(User {
            id: row_id(id)?,
            password: password_hash,
            ..user.clone()
        })
    }

    pub fn find_user_by_id(&self, id: u32) -> StoreResult<Option<User>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
            query_one(conn, &sql, params![id], user_from_row)
        })
    }

    pub fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1");
            query_one(conn, &sql, params![email], user_from_row)
        })
    }

    pub fn find_all_users(&self) -> StoreResult<Vec<User>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {USER_COLUMNS} FROM users LIMIT ?1");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([MAX_LIST_ROWS], user_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Replace username, email and password (re-hashed) of an existing user.
    /// Returns `None` when no user has `id`.
    pub fn update_user(&self, id: u32, user: &User) -> StoreResult<Option<User>> {
        let password_hash = self.hasher().hash(&user.password)?;

        let changed = self.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE users SET username = ?1, email = ?2, password = ?3, updated_at = ?4
                 WHERE id = ?5",
                params![user.username, user.email, password_hash, Utc::now(), id],
            )?)
        })?;

        if changed == 0 {
            return Ok(None);
        }

        debug!("Updated user {}", id);
        self.find_user_by_id(id)
    }

    /// Physically delete a user. Returns the number of rows removed; 0 means
    /// there was no such user.
    pub fn delete_user(&self, id: u32) -> StoreResult<usize> {
        let removed = self
            .with_conn(|conn| Ok(conn.execute("DELETE FROM users WHERE id = ?1", [id])?))
            .map_err(|e| match e {
                // The only foreign key into users is posts.author_id.
                StoreError::ConstraintViolation { .. } => StoreError::ConstraintViolation {
                    field: "posts".to_string(),
                },
                other => other,
            })?;

        debug!("Deleted user {} ({} rows)", id, removed);
        Ok(removed)
    }

    // -- Posts --

    /// Insert a prepared, validated post and return it with its author
    /// resolved.
    pub fn create_post(&self, post: &Post) -> StoreResult<Post> {
        let id = self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO posts (title, content, author_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![post.title, post.content, post.author_id, post.created_at, post.updated_at],
            )?;
            Ok(conn.last_insert_rowid())
        })?;

        debug!("Created post {} by user {}", id, post.author_id);
        let id = u64::try_from(id).map_err(|_| anyhow::anyhow!("Negative post id {}", id))?;
        self.find_post_by_id(id)?
            .ok_or_else(|| anyhow::anyhow!("Post {} vanished after insert", id).into())
    }

    pub fn find_post_by_id(&self, id: u64) -> StoreResult<Option<Post>> {
        let Some(key) = post_key(id) else {
            return Ok(None);
        };

        self.with_conn(|conn| {
            let sql = format!("{POST_SELECT} WHERE p.id = ?1");
            query_one(conn, &sql, params![key], post_from_row)
        })
    }

    /// List up to [`MAX_LIST_ROWS`] posts, each with its author attached.
    pub fn find_all_posts(&self) -> StoreResult<Vec<Post>> {
        self.with_conn(|conn| {
            let sql = format!("{POST_SELECT} LIMIT ?1");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([MAX_LIST_ROWS], post_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Replace title and content of an existing post. Returns `None` when no
    /// post has `id`.
    pub fn update_post(&self, id: u64, post: &Post) -> StoreResult<Option<Post>> {
        let Some(key) = post_key(id) else {
            return Ok(None);
        };

        let changed = self.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE posts SET title = ?1, content = ?2, updated_at = ?3 WHERE id = ?4",
                params![post.title, post.content, Utc::now(), key],
            )?)
        })?;

        if changed == 0 {
            return Ok(None);
        }

        debug!("Updated post {}", id);
        self.find_post_by_id(id)
    }

    /// Delete a post only if `author_id` owns it. Returns the number of rows
    /// removed; 0 means no post with that id belongs to that author.
    pub fn delete_post(&self, id: u64, author_id: u32) -> StoreResult<usize> {
        let Some(key) = post_key(id) else {
            return Ok(0);
        };

        let removed = self.with_conn(|conn| {
            Ok(conn.execute(
                "DELETE FROM posts WHERE id = ?1 AND author_id = ?2",
                params![key, author_id],
            )?)
        })?;

        debug!("Deleted post {} ({} rows)", id, removed);
        Ok(removed)
    }
}

/// SQLite rowids are signed; an id past `i64::MAX` cannot name any row.
fn post_key(id: u64) -> Option<i64> {
    i64::try_from(id).ok()
}

fn row_id(id: i64) -> StoreResult<u32> {
    u32::try_from(id).map_err(|_| anyhow::anyhow!("Row id {} out of range", id).into())
}

fn query_one<T, P, F>(conn: &Connection, sql: &str, params: P, f: F) -> StoreResult<Option<T>>
where
    P: rusqlite::Params,
    F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
{
    conn.prepare(sql)?.query_row(params, f).optional()
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        author_id: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
        author: Some(User {
            id: row.get(6)?,
            username: row.get(7)?,
            email: row.get(8)?,
            password: String::new(),
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        }),
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> StoreResult<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> StoreResult<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkwell_crypto::CredentialHasher;
    use inkwell_types::UserAction;

    fn db() -> Database {
        Database::open_in_memory(CredentialHasher::new(8, 1).unwrap()).unwrap()
    }

    fn new_user(username: &str, email: &str) -> User {
        let mut user = User {
            username: username.into(),
            email: email.into(),
            password: "secret1".into(),
            ..Default::default()
        };
        user.prepare();
        user.validate(UserAction::Create).unwrap();
        user
    }

    fn new_post(title: &str, author_id: u32) -> Post {
        let mut post = Post {
            title: title.into(),
            content: "body".into(),
            author_id,
            ..Default::default()
        };
        post.prepare();
        post
    }

    #[test]
    fn create_user_hashes_password() {
        let db = db();
        let alice = db.create_user(&new_user("alice", "a@x.com")).unwrap();

        assert!(alice.id >= 1);
        assert_ne!(alice.password, "secret1");
        assert!(db.hasher().verify(&alice.password, "secret1").unwrap());

        let stored = db.find_user_by_id(alice.id).unwrap().unwrap();
        assert_eq!(stored.password, alice.password);
        assert_eq!(stored.username, "alice");
    }

    #[test]
    fn duplicate_username_and_email() {
        let db = db();
        db.create_user(&new_user("alice", "a@x.com")).unwrap();

        let err = db.create_user(&new_user("alice", "b@x.com")).unwrap_err();
        assert!(matches!(err, StoreError::ConstraintViolation { ref field } if field == "username"));

        let err = db.create_user(&new_user("bob", "a@x.com")).unwrap_err();
        assert!(matches!(err, StoreError::ConstraintViolation { ref field } if field == "email"));
    }

    #[test]
    fn missing_user_is_none() {
        let db = db();
        assert!(db.find_user_by_id(99).unwrap().is_none());
        assert!(db.find_user_by_email("nobody@x.com").unwrap().is_none());
        assert!(db.update_user(99, &new_user("ghost", "g@x.com")).unwrap().is_none());
        assert_eq!(db.delete_user(99).unwrap(), 0);
    }

    #[test]
    fn update_user_rehashes_password() {
        let db = db();
        let alice = db.create_user(&new_user("alice", "a@x.com")).unwrap();

        let mut change = new_user("alice2", "a2@x.com");
        change.password = "secret2".into();
        let updated = db.update_user(alice.id, &change).unwrap().unwrap();

        assert_eq!(updated.id, alice.id);
        assert_eq!(updated.username, "alice2");
        assert_eq!(updated.email, "a2@x.com");
        assert!(db.hasher().verify(&updated.password, "secret2").unwrap());
        assert!(!db.hasher().verify(&updated.password, "secret1").unwrap());
        assert!(updated.updated_at >= alice.updated_at);
    }

    #[test]
    fn list_is_capped() {
        let db = db();
        for i in 0..105 {
            db.create_user(&new_user(&format!("user{i}"), &format!("u{i}@x.com")))
                .unwrap();
        }
        let first = db.find_user_by_id(1).unwrap().unwrap();
        for i in 0..105 {
            db.create_post(&new_post(&format!("post {i}"), first.id)).unwrap();
        }

        assert_eq!(db.find_all_users().unwrap().len(), MAX_LIST_ROWS as usize);
        assert_eq!(db.find_all_posts().unwrap().len(), MAX_LIST_ROWS as usize);
    }

    #[test]
    fn posts_resolve_author() {
        let db = db();
        let alice = db.create_user(&new_user("alice", "a@x.com")).unwrap();
        let post = db.create_post(&new_post("hi", alice.id)).unwrap();

        let author = post.author.as_ref().unwrap();
        assert_eq!(author.id, alice.id);
        assert_eq!(author.username, "alice");
        assert!(author.password.is_empty());

        let listed = db.find_all_posts().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].author.as_ref().unwrap().id, alice.id);
    }

    #[test]
    fn duplicate_title_and_unknown_author() {
        let db = db();
        let alice = db.create_user(&new_user("alice", "a@x.com")).unwrap();
        db.create_post(&new_post("hi", alice.id)).unwrap();

        let err = db.create_post(&new_post("hi", alice.id)).unwrap_err();
        assert!(matches!(err, StoreError::ConstraintViolation { ref field } if field == "title"));

        let err = db.create_post(&new_post("other", 42)).unwrap_err();
        assert!(matches!(err, StoreError::ConstraintViolation { ref field } if field == "author_id"));
    }

    #[test]
    fn update_post_changes_title_and_content() {
        let db = db();
        let alice = db.create_user(&new_user("alice", "a@x.com")).unwrap();
        let post = db.create_post(&new_post("hi", alice.id)).unwrap();

        let mut change = new_post("hello", alice.id);
        change.content = "new body".into();
        let updated = db.update_post(post.id, &change).unwrap().unwrap();

        assert_eq!(updated.id, post.id);
        assert_eq!(updated.title, "hello");
        assert_eq!(updated.content, "new body");
        assert!(db.update_post(post.id + 1, &change).unwrap().is_none());
    }

    #[test]
    fn post_ids_beyond_rowid_range_are_missing() {
        let db = db();
        let alice = db.create_user(&new_user("alice", "a@x.com")).unwrap();
        let post = db.create_post(&new_post("hi", alice.id)).unwrap();

        assert!(db.find_post_by_id(u64::MAX).unwrap().is_none());
        assert!(db.update_post(u64::MAX, &post).unwrap().is_none());
        assert_eq!(db.delete_post(u64::MAX, alice.id).unwrap(), 0);
        assert!(db.find_post_by_id(post.id).unwrap().is_some());
    }

    #[test]
    fn delete_post_requires_owner() {
        let db = db();
        let alice = db.create_user(&new_user("alice", "a@x.com")).unwrap();
        let bob = db.create_user(&new_user("bob", "b@x.com")).unwrap();
        let post = db.create_post(&new_post("hi", alice.id)).unwrap();

        assert_eq!(db.delete_post(post.id, bob.id).unwrap(), 0);
        assert_eq!(db.find_post_by_id(post.id).unwrap().unwrap(), post);

        assert_eq!(db.delete_post(post.id, alice.id).unwrap(), 1);
        assert!(db.find_post_by_id(post.id).unwrap().is_none());
    }

    #[test]
    fn user_with_posts_cannot_be_deleted() {
        let db = db();
        let alice = db.create_user(&new_user("alice", "a@x.com")).unwrap();
        db.create_post(&new_post("hi", alice.id)).unwrap();

        let err = db.delete_user(alice.id).unwrap_err();
        assert!(matches!(err, StoreError::ConstraintViolation { ref field } if field == "posts"));
        assert!(db.find_user_by_id(alice.id).unwrap().is_some());
    }
}
