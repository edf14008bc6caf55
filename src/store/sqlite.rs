//! SQLite-backed post store
//!
//! A single connection guarded by a mutex; every operation runs on the
//! blocking thread pool so request tasks never block on disk I/O.
//! Connections are opened with `foreign_keys = ON` and migrations applied.

use async_trait::async_trait;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::migrations::apply_migrations;
use super::{PostStore, StoreError, StoreResult};
use crate::model::{Comment, NewComment, NewPost, Post, PostId};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const POST_SELECT_SQL: &str = "SELECT id, title, contents FROM posts";
const COMMENT_SELECT_SQL: &str = "SELECT id, post_id, text FROM comments";

pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) a database file, creating parent directories as needed
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::bootstrap(Connection::open(path)?)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::bootstrap(Connection::open_in_memory()?)
    }

    fn bootstrap(mut conn: Connection) -> StoreResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        apply_migrations(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool
    async fn with_conn<T, F>(&self, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> StoreResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().map_err(|_| StoreError::Poisoned)?;
            f(&guard)
        })
        .await?
    }
}

#[async_trait]
impl PostStore for SqliteStore {
    async fn find(&self) -> StoreResult<Vec<Post>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{POST_SELECT_SQL} ORDER BY id"))?;
            let posts = stmt
                .query_map([], post_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(posts)
        })
        .await
    }

    async fn find_by_id(&self, id: PostId) -> StoreResult<Option<Post>> {
        self.with_conn(move |conn| select_post(conn, id)).await
    }

    async fn insert(&self, post: NewPost) -> StoreResult<Post> {
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO posts (title, contents) VALUES (?1, ?2)",
                params![post.title, post.contents],
            )?;
            Ok(post.into_post(conn.last_insert_rowid()))
        })
        .await
    }

    async fn update(&self, id: PostId, post: NewPost) -> StoreResult<Option<Post>> {
        self.with_conn(move |conn| {
            let changed = conn.execute(
                "UPDATE posts
                 SET title = ?1,
                     contents = ?2,
                     updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?3",
                params![post.title, post.contents, id],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            select_post(conn, id)
        })
        .await
    }

    async fn remove(&self, id: PostId) -> StoreResult<u64> {
        self.with_conn(move |conn| {
            let removed = conn.execute("DELETE FROM posts WHERE id = ?1", params![id])?;
            Ok(u64::try_from(removed).unwrap_or(u64::MAX))
        })
        .await
    }

    async fn insert_comment(&self, comment: NewComment) -> StoreResult<Comment> {
        self.with_conn(move |conn| {
            let inserted = conn.execute(
                "INSERT INTO comments (post_id, text) VALUES (?1, ?2)",
                params![comment.post_id, comment.text],
            );
            match inserted {
                Ok(_) => Ok(comment.into_comment(conn.last_insert_rowid())),
                Err(err) if is_foreign_key_violation(&err) => {
                    Err(StoreError::MissingParent(comment.post_id))
                }
                Err(err) => Err(err.into()),
            }
        })
        .await
    }

    async fn find_post_comments(&self, post_id: PostId) -> StoreResult<Option<Vec<Comment>>> {
        self.with_conn(move |conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS (SELECT 1 FROM posts WHERE id = ?1)",
                params![post_id],
                |row| row.get(0),
            )?;
            if !exists {
                return Ok(None);
            }

            let mut stmt =
                conn.prepare(&format!("{COMMENT_SELECT_SQL} WHERE post_id = ?1 ORDER BY id"))?;
            let comments = stmt
                .query_map(params![post_id], comment_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Some(comments))
        })
        .await
    }

    async fn ping(&self) -> StoreResult<()> {
        self.with_conn(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
            Ok(())
        })
        .await
    }
}

fn select_post(conn: &Connection, id: PostId) -> StoreResult<Option<Post>> {
    let post = conn
        .query_row(
            &format!("{POST_SELECT_SQL} WHERE id = ?1"),
            params![id],
            post_from_row,
        )
        .optional()?;
    Ok(post)
}

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        title: row.get(1)?,
        contents: row.get(2)?,
    })
}

fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        post_id: row.get(1)?,
        text: row.get(2)?,
    })
}

fn is_foreign_key_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::ConstraintViolation
                && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY
    )
}
