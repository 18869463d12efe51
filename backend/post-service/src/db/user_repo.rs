use super::UserRepository;
use crate::error::{AppError, Result};
use crate::models::{User, UserSummary};
use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    avatar_url: Option<String>,
    bookmarked_posts: Vec<Uuid>,
}

#[derive(sqlx::FromRow)]
struct UserSummaryRow {
    id: Uuid,
    username: String,
    avatar_url: Option<String>,
}

/// Reads the user collection owned by the account service and writes only
/// the `bookmarked_posts` column.
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, avatar_url, bookmarked_posts
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| User {
            id: row.id,
            username: row.username,
            avatar_url: row.avatar_url,
            bookmarked_posts: row.bookmarked_posts.into_iter().collect(),
        }))
    }

    async fn find_summaries(&self, user_ids: &[Uuid]) -> Result<HashMap<Uuid, UserSummary>> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, UserSummaryRow>(
            r#"
            SELECT id, username, avatar_url
            FROM users
            WHERE id = ANY($1)
            "#,
        )
        .bind(user_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                (
                    row.id,
                    UserSummary {
                        id: row.id,
                        username: row.username,
                        avatar_url: row.avatar_url,
                    },
                )
            })
            .collect())
    }

    async fn save_bookmarks(&self, user: &User) -> Result<()> {
        let bookmarks: Vec<Uuid> = user.bookmarked_posts.iter().copied().collect();
        let result = sqlx::query(
            r#"
            UPDATE users
            SET bookmarked_posts = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(bookmarks)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("user {}", user.id)));
        }

        Ok(())
    }

    async fn remove_bookmark_from_users(&self, post_id: Uuid, user_ids: &[Uuid]) -> Result<()> {
        if user_ids.is_empty() {
            return Ok(());
        }

        sqlx::query(
            r#"
            UPDATE users
            SET bookmarked_posts = array_remove(bookmarked_posts, $1), updated_at = NOW()
            WHERE id = ANY($2)
            "#,
        )
        .bind(post_id)
        .bind(user_ids)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
