//! Storage module
//!
//! Defines the `PostStore` collaborator consumed by the request handlers and
//! provides two implementations:
//! - `SqliteStore`: persistent, SQLite-backed (default)
//! - `MemoryStore`: process-local maps, used in tests and ephemeral setups

mod memory;
mod migrations;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::config::{StorageBackend, StorageConfig};
use crate::model::{Comment, NewComment, NewPost, Post, PostId};

pub type StoreResult<T> = Result<T, StoreError>;

/// Failures reported by a store operation
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("database schema version {db_version} is newer than supported {latest_supported}")]
    Migration {
        db_version: u32,
        latest_supported: u32,
    },
    /// Comment insert rejected because its parent post does not exist
    #[error("post {0} does not exist")]
    MissingParent(PostId),
    #[error("failed to prepare storage location: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("storage lock poisoned")]
    Poisoned,
}

/// Persistence operations required by the post and comment handlers.
///
/// "Not found" is never an error: lookups return `None`, removals return
/// the number of affected rows.
#[async_trait]
pub trait PostStore: Send + Sync {
    /// All posts, ordered by id
    async fn find(&self) -> StoreResult<Vec<Post>>;

    async fn find_by_id(&self, id: PostId) -> StoreResult<Option<Post>>;

    /// Insert a post and return it with its assigned id
    async fn insert(&self, post: NewPost) -> StoreResult<Post>;

    /// Replace title and contents; `None` when the post does not exist
    async fn update(&self, id: PostId, post: NewPost) -> StoreResult<Option<Post>>;

    /// Remove a post (and its comments), returning the number of posts removed
    async fn remove(&self, id: PostId) -> StoreResult<u64>;

    /// Insert a comment; fails with `StoreError::MissingParent` when the
    /// referenced post is gone at insert time
    async fn insert_comment(&self, comment: NewComment) -> StoreResult<Comment>;

    /// Comments of a post ordered by id; `None` when the post does not exist
    async fn find_post_comments(&self, post_id: PostId) -> StoreResult<Option<Vec<Comment>>>;

    /// Cheap round-trip used by the readiness probe
    async fn ping(&self) -> StoreResult<()>;
}

/// Open the store selected by configuration
pub fn open(config: &StorageConfig) -> StoreResult<Arc<dyn PostStore>> {
    match config.backend {
        StorageBackend::Sqlite => Ok(Arc::new(SqliteStore::open(&config.path)?)),
        StorageBackend::Memory => Ok(Arc::new(MemoryStore::new())),
    }
}
