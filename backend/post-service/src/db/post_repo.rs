use super::PostRepository;
use crate::error::{AppError, Result};
use crate::models::{Comment, MediaKind, MediaRef, Post};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

const POST_COLUMNS: &str = r#"
    id, author_id, caption, media_url, media_type, media_key,
    likes, bookmarked_by, comments, created_at, updated_at
"#;

#[derive(sqlx::FromRow)]
struct PostRow {
    id: Uuid,
    author_id: Uuid,
    caption: String,
    media_url: Option<String>,
    media_type: Option<String>,
    media_key: Option<String>,
    likes: Vec<Uuid>,
    bookmarked_by: Vec<Uuid>,
    comments: Json<Vec<Comment>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PostRow> for Post {
    type Error = AppError;

    fn try_from(row: PostRow) -> Result<Self> {
        let media = match (row.media_url, row.media_type, row.media_key) {
            (Some(url), Some(kind), Some(key)) => {
                let kind = MediaKind::parse(&kind).ok_or_else(|| {
                    AppError::Persistence(format!("post {} has unknown media type {}", row.id, kind))
                })?;
                Some(MediaRef { url, kind, key })
            }
            (None, None, None) => None,
            _ => {
                return Err(AppError::Persistence(format!(
                    "post {} has partially populated media columns",
                    row.id
                )))
            }
        };

        Ok(Post {
            id: row.id,
            author_id: row.author_id,
            caption: row.caption,
            media,
            likes: row.likes.into_iter().collect(),
            bookmarked_by: row.bookmarked_by.into_iter().collect(),
            comments: row.comments.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Posts stored one row per document; sets as `UUID[]`, comments as `JSONB`
#[derive(Clone)]
pub struct PgPostRepository {
    pool: PgPool,
}

impl PgPostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_many(&self, author_id: Option<Uuid>) -> Result<Vec<Post>> {
        let rows = sqlx::query_as::<_, PostRow>(&format!(
            r#"
            SELECT {POST_COLUMNS}
            FROM posts
            WHERE ($1::uuid IS NULL OR author_id = $1)
            ORDER BY created_at DESC
            "#
        ))
        .bind(author_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Post::try_from).collect()
    }
}

fn ids(set: &std::collections::HashSet<Uuid>) -> Vec<Uuid> {
    set.iter().copied().collect()
}

#[async_trait]
impl PostRepository for PgPostRepository {
    async fn insert(&self, post: &Post) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO posts (
                id, author_id, caption, media_url, media_type, media_key,
                likes, bookmarked_by, comments, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(post.id)
        .bind(post.author_id)
        .bind(&post.caption)
        .bind(post.media.as_ref().map(|m| m.url.as_str()))
        .bind(post.media.as_ref().map(|m| m.kind.as_str()))
        .bind(post.media.as_ref().map(|m| m.key.as_str()))
        .bind(ids(&post.likes))
        .bind(ids(&post.bookmarked_by))
        .bind(Json(&post.comments))
        .bind(post.created_at)
        .bind(post.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, post_id: Uuid) -> Result<Option<Post>> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE id = $1"
        ))
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Post::try_from).transpose()
    }

    async fn list_all(&self) -> Result<Vec<Post>> {
        self.fetch_many(None).await
    }

    async fn list_by_author(&self, author_id: Uuid) -> Result<Vec<Post>> {
        self.fetch_many(Some(author_id)).await
    }

    async fn save(&self, post: &Post) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE posts
            SET caption = $2, likes = $3, bookmarked_by = $4, comments = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(post.id)
        .bind(&post.caption)
        .bind(ids(&post.likes))
        .bind(ids(&post.bookmarked_by))
        .bind(Json(&post.comments))
        .bind(post.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("post {}", post.id)));
        }

        Ok(())
    }

    async fn delete(&self, post_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(post_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
