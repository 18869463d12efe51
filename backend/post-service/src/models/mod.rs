/// Data models for post-service
///
/// - `Post`: a caption and/or a single media attachment, with like/bookmark
///   sets and an append-only comment sequence
/// - `Comment`: owned by its parent post
/// - `User`: external account record; only `bookmarked_posts` is mutated here
/// - `PostView` / `CommentView`: read-time enriched shapes returned to clients
///
/// Engagement sets are only reachable mutably from inside the crate so that the
/// transitions in `services::engagement` stay the single writer.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "image" => Some(MediaKind::Image),
            "video" => Some(MediaKind::Video),
            _ => None,
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored media attachment. `kind` only exists alongside a URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaRef {
    pub url: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    /// Object-storage key used for cleanup
    #[serde(skip)]
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub content: String,
    pub author_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub caption: String,
    pub media: Option<MediaRef>,
    pub(crate) likes: HashSet<Uuid>,
    pub(crate) bookmarked_by: HashSet<Uuid>,
    pub(crate) comments: Vec<Comment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn new(author_id: Uuid, caption: String, media: Option<MediaRef>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            author_id,
            caption,
            media,
            likes: HashSet::new(),
            bookmarked_by: HashSet::new(),
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn likes(&self) -> &HashSet<Uuid> {
        &self.likes
    }

    pub fn bookmarked_by(&self) -> &HashSet<Uuid> {
        &self.bookmarked_by
    }

    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    pub fn is_liked_by(&self, user_id: Uuid) -> bool {
        self.likes.contains(&user_id)
    }

    pub fn is_bookmarked_by(&self, user_id: Uuid) -> bool {
        self.bookmarked_by.contains(&user_id)
    }

    /// Every user referenced by this post (author and comment authors)
    pub fn referenced_user_ids(&self) -> impl Iterator<Item = Uuid> + '_ {
        std::iter::once(self.author_id).chain(self.comments.iter().map(|c| c.author_id))
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub avatar_url: Option<String>,
    pub(crate) bookmarked_posts: HashSet<Uuid>,
}

impl User {
    pub fn new(id: Uuid, username: impl Into<String>, avatar_url: Option<String>) -> Self {
        Self {
            id,
            username: username.into(),
            avatar_url,
            bookmarked_posts: HashSet::new(),
        }
    }

    pub fn bookmarked_posts(&self) -> &HashSet<Uuid> {
        &self.bookmarked_posts
    }

    /// Drop a reference to a post that no longer exists
    pub fn forget_post(&mut self, post_id: Uuid) -> bool {
        self.bookmarked_posts.remove(&post_id)
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            username: self.username.clone(),
            avatar_url: self.avatar_url.clone(),
        }
    }
}

/// Display subset of a user substituted for a reference at read time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    pub id: Uuid,
    pub content: String,
    pub author_id: Uuid,
    /// None when the author account no longer exists
    pub author: Option<UserSummary>,
    pub created_at: DateTime<Utc>,
}

impl CommentView {
    pub fn build(comment: &Comment, users: &HashMap<Uuid, UserSummary>) -> Self {
        Self {
            id: comment.id,
            content: comment.content.clone(),
            author_id: comment.author_id,
            author: users.get(&comment.author_id).cloned(),
            created_at: comment.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    pub id: Uuid,
    pub caption: String,
    pub media: Option<MediaRef>,
    pub author_id: Uuid,
    pub author: Option<UserSummary>,
    pub likes: Vec<Uuid>,
    pub like_count: usize,
    pub bookmarked_by: Vec<Uuid>,
    pub comments: Vec<CommentView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PostView {
    pub fn build(post: &Post, users: &HashMap<Uuid, UserSummary>) -> Self {
        Self {
            id: post.id,
            caption: post.caption.clone(),
            media: post.media.clone(),
            author_id: post.author_id,
            author: users.get(&post.author_id).cloned(),
            likes: post.likes.iter().copied().collect(),
            like_count: post.likes.len(),
            bookmarked_by: post.bookmarked_by.iter().copied().collect(),
            comments: post
                .comments
                .iter()
                .map(|c| CommentView::build(c, users))
                .collect(),
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}

/// Outcome of a bookmark toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BookmarkState {
    Bookmarked,
    Unbookmarked,
}

impl BookmarkState {
    pub fn message(&self) -> &'static str {
        match self {
            BookmarkState::Bookmarked => "Post bookmarked",
            BookmarkState::Unbookmarked => "Post removed from bookmarks",
        }
    }
}
