/// Post service - the use cases exposed to handlers.
///
/// Creation sequences upload then insert; every other mutation loads the post,
/// applies an engagement transition and persists the result. The requesting
/// user is always an explicit argument.
use crate::error::{AppError, Result};
use crate::media::{Attachment, MediaUploader, UploadLimits};
use crate::metrics;
use crate::models::{BookmarkState, CommentView, PostView};
use crate::services::engagement;
use crate::services::post_store::PostStore;
use uuid::Uuid;

pub struct PostService {
    store: PostStore,
    uploader: MediaUploader,
}

impl PostService {
    pub fn new(store: PostStore, uploader: MediaUploader) -> Self {
        Self { store, uploader }
    }

    /// Limits multipart attachments are staged under
    pub fn upload_limits(&self) -> &UploadLimits {
        self.uploader.limits()
    }

    /// Create a post from a caption and/or a single attachment.
    ///
    /// Input is validated before any upload. If the document write fails after
    /// the upload succeeded, the uploaded object is removed again.
    pub async fn create_post(
        &self,
        author_id: Uuid,
        caption: Option<String>,
        attachment: Option<Attachment>,
    ) -> Result<PostView> {
        let result = self.create_post_inner(author_id, caption, attachment).await;
        metrics::record_operation("create_post", &result);
        result
    }

    async fn create_post_inner(
        &self,
        author_id: Uuid,
        caption: Option<String>,
        attachment: Option<Attachment>,
    ) -> Result<PostView> {
        let caption = caption.as_deref().map(str::trim).filter(|c| !c.is_empty());
        if caption.is_none() && attachment.is_none() {
            return Err(AppError::Validation(
                "post requires a caption or a media attachment".to_string(),
            ));
        }

        let media = match attachment {
            Some(attachment) => Some(self.uploader.upload(attachment).await?),
            None => None,
        };

        let post = match self.store.create(author_id, caption, media.clone()).await {
            Ok(post) => post,
            Err(e) => {
                if let Some(media) = &media {
                    tracing::warn!(%author_id, key = %media.key, error = %e, "post insert failed; removing uploaded media");
                    self.uploader.discard(media, "create_rollback").await;
                }
                return Err(e);
            }
        };

        Ok(self.store.enrich_lenient(&post).await)
    }

    pub async fn get_post(&self, post_id: Uuid) -> Result<PostView> {
        let post = self.store.get_by_id(post_id).await?;
        let mut views = self.store.enrich(std::slice::from_ref(&post)).await?;
        views
            .pop()
            .ok_or_else(|| AppError::Internal(format!("enrichment dropped post {}", post_id)))
    }

    pub async fn list_all_posts(&self) -> Result<Vec<PostView>> {
        self.store.list_all().await
    }

    pub async fn list_user_posts(&self, author_id: Uuid) -> Result<Vec<PostView>> {
        self.store.list_by_author(author_id).await
    }

    pub async fn like_post(&self, post_id: Uuid, user_id: Uuid) -> Result<()> {
        let result = async {
            let mut post = self.store.get_by_id(post_id).await?;
            engagement::like(&mut post, user_id)?;
            self.store.save(&post).await
        }
        .await;

        metrics::record_operation("like_post", &result);
        if result.is_ok() {
            tracing::debug!(%post_id, %user_id, "post liked");
        }
        result
    }

    pub async fn dislike_post(&self, post_id: Uuid, user_id: Uuid) -> Result<()> {
        let result = async {
            let mut post = self.store.get_by_id(post_id).await?;
            engagement::dislike(&mut post, user_id)?;
            self.store.save(&post).await
        }
        .await;

        metrics::record_operation("dislike_post", &result);
        if result.is_ok() {
            tracing::debug!(%post_id, %user_id, "post like removed");
        }
        result
    }

    /// Append a comment and return it enriched with its author
    pub async fn add_comment(
        &self,
        post_id: Uuid,
        author_id: Uuid,
        text: &str,
    ) -> Result<CommentView> {
        let result = async {
            let mut post = self.store.get_by_id(post_id).await?;
            let comment = engagement::add_comment(&mut post, author_id, text)?;
            self.store.save(&post).await?;

            let views = match self.store.enrich_comments(std::slice::from_ref(&comment)).await {
                Ok(views) => views,
                Err(e) => {
                    tracing::warn!(%post_id, comment_id = %comment.id, error = %e, "comment author enrichment failed");
                    Vec::new()
                }
            };
            Ok::<_, AppError>(views.into_iter().next().unwrap_or_else(|| {
                CommentView::build(&comment, &Default::default())
            }))
        }
        .await;

        metrics::record_operation("add_comment", &result);
        result
    }

    /// Comments in insertion order
    pub async fn list_comments(&self, post_id: Uuid) -> Result<Vec<CommentView>> {
        let post = self.store.get_by_id(post_id).await?;
        self.store.enrich_comments(post.comments()).await
    }

    pub async fn delete_post(&self, post_id: Uuid, requesting_user_id: Uuid) -> Result<()> {
        let result = self.store.delete(post_id, requesting_user_id).await;
        metrics::record_operation("delete_post", &result);
        result
    }

    /// Flip the bookmark for `user_id`, writing the post and the user together.
    ///
    /// Both writes are issued concurrently and both must succeed. A failure on
    /// one side is not rolled back on the other; it is logged and counted.
    pub async fn toggle_bookmark(&self, post_id: Uuid, user_id: Uuid) -> Result<BookmarkState> {
        let result = self.toggle_bookmark_inner(post_id, user_id).await;
        metrics::record_operation("toggle_bookmark", &result);
        result
    }

    async fn toggle_bookmark_inner(&self, post_id: Uuid, user_id: Uuid) -> Result<BookmarkState> {
        let mut post = self.store.get_by_id(post_id).await?;
        let mut user = self.store.find_user(user_id).await?;

        let state = engagement::toggle_bookmark(&mut post, &mut user);

        let (post_write, user_write) = tokio::join!(
            self.store.save(&post),
            self.store.save_user_bookmarks(&user)
        );

        match (post_write, user_write) {
            (Ok(()), Ok(())) => {
                tracing::debug!(%post_id, %user_id, ?state, "bookmark toggled");
                Ok(state)
            }
            (Err(e), Ok(())) => {
                metrics::record_bookmark_partial_write("post");
                tracing::error!(%post_id, %user_id, ?state, error = %e, "bookmark written to user but not to post");
                Err(e)
            }
            (Ok(()), Err(e)) => {
                metrics::record_bookmark_partial_write("user");
                tracing::error!(%post_id, %user_id, ?state, error = %e, "bookmark written to post but not to user");
                Err(e)
            }
            (Err(post_err), Err(user_err)) => {
                tracing::error!(%post_id, %user_id, post_error = %post_err, user_error = %user_err, "bookmark writes failed on both sides");
                Err(post_err)
            }
        }
    }
}
