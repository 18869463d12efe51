/// Engagement transitions applied to an in-memory post before it is persisted.
///
/// These are the only writers of `likes`, `bookmarked_by`, `comments` and
/// `User::bookmarked_posts`. Nothing here touches the store.
use crate::error::{AppError, Result};
use crate::models::{BookmarkState, Comment, Post, User};
use chrono::Utc;
use uuid::Uuid;

/// Rejects a repeat like instead of silently succeeding
pub fn like(post: &mut Post, user_id: Uuid) -> Result<()> {
    if !post.likes.insert(user_id) {
        return Err(AppError::AlreadyLiked);
    }
    post.touch();
    Ok(())
}

pub fn dislike(post: &mut Post, user_id: Uuid) -> Result<()> {
    if !post.likes.remove(&user_id) {
        return Err(AppError::NotLiked);
    }
    post.touch();
    Ok(())
}

/// Flip the bookmark on both sides of the post/user pair.
///
/// Membership is read once from the post; both sets are then forced to agree
/// with the new state.
pub fn toggle_bookmark(post: &mut Post, user: &mut User) -> BookmarkState {
    let state = if post.bookmarked_by.contains(&user.id) {
        post.bookmarked_by.remove(&user.id);
        user.bookmarked_posts.remove(&post.id);
        BookmarkState::Unbookmarked
    } else {
        post.bookmarked_by.insert(user.id);
        user.bookmarked_posts.insert(post.id);
        BookmarkState::Bookmarked
    };
    post.touch();
    state
}

/// Append a comment; display order is insertion order
pub fn add_comment(post: &mut Post, author_id: Uuid, content: &str) -> Result<Comment> {
    let content = content.trim();
    if content.is_empty() {
        return Err(AppError::Validation("comment text is required".to_string()));
    }

    let comment = Comment {
        id: Uuid::new_v4(),
        content: content.to_string(),
        author_id,
        created_at: Utc::now(),
    };
    post.comments.push(comment.clone());
    post.touch();
    Ok(comment)
}
