/// Document store access layer
///
/// Repository traits are the seam between the post core and the store; the
/// Postgres implementations live in `post_repo` / `user_repo`.
pub mod post_repo;
pub mod user_repo;

pub use post_repo::PgPostRepository;
pub use user_repo::PgUserRepository;

use crate::error::{AppError, Result};
use crate::models::{Post, User, UserSummary};
use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use uuid::Uuid;

#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn insert(&self, post: &Post) -> Result<()>;

    async fn find_by_id(&self, post_id: Uuid) -> Result<Option<Post>>;

    /// All posts, newest first
    async fn list_all(&self) -> Result<Vec<Post>>;

    /// Posts by one author, newest first
    async fn list_by_author(&self, author_id: Uuid) -> Result<Vec<Post>>;

    /// Replace the mutable part of a stored post (last write wins).
    /// Fails with `NotFound` when the post no longer exists.
    async fn save(&self, post: &Post) -> Result<()>;

    /// Returns false when nothing was deleted
    async fn delete(&self, post_id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>>;

    /// Batched display lookup. Unknown ids are absent from the map.
    async fn find_summaries(&self, user_ids: &[Uuid]) -> Result<HashMap<Uuid, UserSummary>>;

    /// Persist the user's bookmark set. Fails with `NotFound` for unknown users.
    async fn save_bookmarks(&self, user: &User) -> Result<()>;

    /// Strip a deleted post from the given users' bookmark sets
    async fn remove_bookmark_from_users(&self, post_id: Uuid, user_ids: &[Uuid]) -> Result<()>;
}

/// Run a store call under a deadline
pub(crate) async fn with_deadline<F, T>(timeout: Duration, operation: &str, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(operation, ?timeout, "document store call timed out");
            Err(AppError::Timeout(format!(
                "{} timed out after {:?}",
                operation, timeout
            )))
        }
    }
}
