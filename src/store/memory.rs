//! In-memory post store
//!
//! Mirrors the SQLite semantics (monotonic ids, cascading removal, parent
//! check on comment insert) without touching disk.

use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::{PostStore, StoreError, StoreResult};
use crate::model::{Comment, CommentId, NewComment, NewPost, Post, PostId};

#[derive(Default)]
struct Tables {
    posts: BTreeMap<PostId, Post>,
    comments: BTreeMap<CommentId, Comment>,
    last_post_id: PostId,
    last_comment_id: CommentId,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn find(&self) -> StoreResult<Vec<Post>> {
        Ok(self.tables.read().await.posts.values().cloned().collect())
    }

    async fn find_by_id(&self, id: PostId) -> StoreResult<Option<Post>> {
        Ok(self.tables.read().await.posts.get(&id).cloned())
    }

    async fn insert(&self, post: NewPost) -> StoreResult<Post> {
        let mut tables = self.tables.write().await;
        tables.last_post_id += 1;
        let post = post.into_post(tables.last_post_id);
        tables.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn update(&self, id: PostId, post: NewPost) -> StoreResult<Option<Post>> {
        let mut tables = self.tables.write().await;
        Ok(tables.posts.get_mut(&id).map(|existing| {
            existing.title = post.title;
            existing.contents = post.contents;
            existing.clone()
        }))
    }

    async fn remove(&self, id: PostId) -> StoreResult<u64> {
        let mut tables = self.tables.write().await;
        if tables.posts.remove(&id).is_none() {
            return Ok(0);
        }
        tables.comments.retain(|_, comment| comment.post_id != id);
        Ok(1)
    }

    async fn insert_comment(&self, comment: NewComment) -> StoreResult<Comment> {
        let mut tables = self.tables.write().await;
        if !tables.posts.contains_key(&comment.post_id) {
            return Err(StoreError::MissingParent(comment.post_id));
        }
        tables.last_comment_id += 1;
        let comment = comment.into_comment(tables.last_comment_id);
        tables.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn find_post_comments(&self, post_id: PostId) -> StoreResult<Option<Vec<Comment>>> {
        let tables = self.tables.read().await;
        if !tables.posts.contains_key(&post_id) {
            return Ok(None);
        }
        Ok(Some(
            tables
                .comments
                .values()
                .filter(|comment| comment.post_id == post_id)
                .cloned()
                .collect(),
        ))
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::contract;

    #[tokio::test]
    async fn test_memory_store_contract() {
        contract::exercise(&MemoryStore::new()).await;
    }
}
