/// Post persistence - creation, enriched retrieval, and deletion with media cleanup
use crate::db::{with_deadline, PostRepository, UserRepository};
use crate::error::{AppError, Result};
use crate::media::ObjectStorage;
use crate::metrics;
use crate::models::{Comment, CommentView, MediaRef, Post, PostView, User, UserSummary};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub struct PostStore {
    posts: Arc<dyn PostRepository>,
    users: Arc<dyn UserRepository>,
    storage: Arc<dyn ObjectStorage>,
    timeout: Duration,
}

impl PostStore {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        users: Arc<dyn UserRepository>,
        storage: Arc<dyn ObjectStorage>,
        timeout: Duration,
    ) -> Self {
        Self {
            posts,
            users,
            storage,
            timeout,
        }
    }

    /// Create a post. A caption, a media attachment, or both are required.
    pub async fn create(
        &self,
        author_id: Uuid,
        caption: Option<&str>,
        media: Option<MediaRef>,
    ) -> Result<Post> {
        let caption = caption.map(str::trim).unwrap_or_default();
        if caption.is_empty() && media.is_none() {
            return Err(AppError::Validation(
                "post requires a caption or a media attachment".to_string(),
            ));
        }

        let post = Post::new(author_id, caption.to_string(), media);
        with_deadline(self.timeout, "insert post", self.posts.insert(&post)).await?;

        tracing::info!(post_id = %post.id, %author_id, has_media = post.media.is_some(), "post created");
        Ok(post)
    }

    pub async fn get_by_id(&self, post_id: Uuid) -> Result<Post> {
        with_deadline(self.timeout, "find post", self.posts.find_by_id(post_id))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("post {}", post_id)))
    }

    /// All posts, newest first, enriched with author display fields
    pub async fn list_all(&self) -> Result<Vec<PostView>> {
        let posts = with_deadline(self.timeout, "list posts", self.posts.list_all()).await?;
        self.enrich(&posts).await
    }

    pub async fn list_by_author(&self, author_id: Uuid) -> Result<Vec<PostView>> {
        let posts = with_deadline(
            self.timeout,
            "list author posts",
            self.posts.list_by_author(author_id),
        )
        .await?;
        self.enrich(&posts).await
    }

    pub async fn save(&self, post: &Post) -> Result<()> {
        with_deadline(self.timeout, "save post", self.posts.save(post)).await
    }

    pub async fn find_user(&self, user_id: Uuid) -> Result<User> {
        with_deadline(self.timeout, "find user", self.users.find_by_id(user_id))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {}", user_id)))
    }

    pub async fn save_user_bookmarks(&self, user: &User) -> Result<()> {
        with_deadline(self.timeout, "save user bookmarks", self.users.save_bookmarks(user)).await
    }

    /// Delete a post owned by `requesting_user_id`.
    ///
    /// Remote media removal is advisory: a failure is logged and counted, and
    /// the document is removed regardless.
    pub async fn delete(&self, post_id: Uuid, requesting_user_id: Uuid) -> Result<()> {
        let post = self.get_by_id(post_id).await?;
        if post.author_id != requesting_user_id {
            return Err(AppError::Forbidden(
                "only the author can delete this post".to_string(),
            ));
        }

        if let Some(media) = &post.media {
            match with_deadline_storage(self.timeout, self.storage.delete(&media.key)).await {
                Ok(()) => tracing::debug!(%post_id, key = %media.key, "post media deleted"),
                Err(reason) => {
                    metrics::record_cleanup_failure("delete_post");
                    tracing::warn!(%post_id, key = %media.key, error = %reason, "post media cleanup failed; deleting post anyway");
                }
            }
        }

        let deleted = with_deadline(self.timeout, "delete post", self.posts.delete(post_id)).await?;
        if !deleted {
            return Err(AppError::NotFound(format!("post {}", post_id)));
        }

        let bookmarkers: Vec<Uuid> = post.bookmarked_by().iter().copied().collect();
        if !bookmarkers.is_empty() {
            if let Err(e) = with_deadline(
                self.timeout,
                "remove bookmarks",
                self.users.remove_bookmark_from_users(post_id, &bookmarkers),
            )
            .await
            {
                tracing::warn!(%post_id, users = bookmarkers.len(), error = %e, "failed to drop deleted post from user bookmarks");
            }
        }

        tracing::info!(%post_id, user_id = %requesting_user_id, "post deleted");
        Ok(())
    }

    /// Substitute author references with display fields using one batched lookup
    pub async fn enrich(&self, posts: &[Post]) -> Result<Vec<PostView>> {
        let ids: HashSet<Uuid> = posts.iter().flat_map(|p| p.referenced_user_ids()).collect();
        let users = self.summaries(ids).await?;
        Ok(posts.iter().map(|p| PostView::build(p, &users)).collect())
    }

    /// Enrich a post that has already been persisted. A failed lookup degrades
    /// to unenriched authors rather than failing the write that preceded it.
    pub async fn enrich_lenient(&self, post: &Post) -> PostView {
        match self.enrich(std::slice::from_ref(post)).await {
            Ok(mut views) if !views.is_empty() => views.remove(0),
            Ok(_) => PostView::build(post, &HashMap::new()),
            Err(e) => {
                tracing::warn!(post_id = %post.id, error = %e, "author enrichment failed");
                PostView::build(post, &HashMap::new())
            }
        }
    }

    pub async fn enrich_comments(&self, comments: &[Comment]) -> Result<Vec<CommentView>> {
        let ids: HashSet<Uuid> = comments.iter().map(|c| c.author_id).collect();
        let users = self.summaries(ids).await?;
        Ok(comments
            .iter()
            .map(|c| CommentView::build(c, &users))
            .collect())
    }

    async fn summaries(&self, ids: HashSet<Uuid>) -> Result<HashMap<Uuid, UserSummary>> {
        let ids: Vec<Uuid> = ids.into_iter().collect();
        with_deadline(self.timeout, "find user summaries", self.users.find_summaries(&ids)).await
    }
}

async fn with_deadline_storage<F>(timeout: Duration, future: F) -> std::result::Result<(), String>
where
    F: std::future::Future<Output = std::result::Result<(), crate::media::StorageError>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result.map_err(|e| e.to_string()),
        Err(_) => Err(format!("timed out after {:?}", timeout)),
    }
}
