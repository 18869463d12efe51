//! In-memory collaborators for post-service integration tests
//!
//! Stand-ins for the document store and object storage, with call counters
//! and failure switches so tests can observe side effects and inject faults.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use post_service::db::{PostRepository, UserRepository};
use post_service::media::{
    MediaUploader, ObjectStorage, StorageError, StoredObject, UploadLimits, UploadOptions,
};
use post_service::models::{Post, User, UserSummary};
use post_service::services::{PostService, PostStore};
use post_service::{AppError, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

/// Post documents kept in insertion order
#[derive(Default)]
pub struct InMemoryPostRepository {
    posts: Mutex<Vec<Post>>,
    pub fail_inserts: AtomicBool,
    pub fail_saves: AtomicBool,
}

impl InMemoryPostRepository {
    pub fn stored(&self, post_id: Uuid) -> Option<Post> {
        self.posts
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == post_id)
            .cloned()
    }

    pub fn count(&self) -> usize {
        self.posts.lock().unwrap().len()
    }

    fn newest_first(&self, filter: impl Fn(&Post) -> bool) -> Vec<Post> {
        let mut posts: Vec<Post> = self
            .posts
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|p| filter(p))
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        posts
    }
}

#[async_trait]
impl PostRepository for InMemoryPostRepository {
    async fn insert(&self, post: &Post) -> Result<()> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(AppError::Persistence("insert rejected".to_string()));
        }
        self.posts.lock().unwrap().push(post.clone());
        Ok(())
    }

    async fn find_by_id(&self, post_id: Uuid) -> Result<Option<Post>> {
        Ok(self.stored(post_id))
    }

    async fn list_all(&self) -> Result<Vec<Post>> {
        Ok(self.newest_first(|_| true))
    }

    async fn list_by_author(&self, author_id: Uuid) -> Result<Vec<Post>> {
        Ok(self.newest_first(|p| p.author_id == author_id))
    }

    async fn save(&self, post: &Post) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(AppError::Persistence("post write rejected".to_string()));
        }
        let mut posts = self.posts.lock().unwrap();
        match posts.iter_mut().find(|p| p.id == post.id) {
            Some(existing) => {
                *existing = post.clone();
                Ok(())
            }
            None => Err(AppError::NotFound(format!("post {}", post.id))),
        }
    }

    async fn delete(&self, post_id: Uuid) -> Result<bool> {
        let mut posts = self.posts.lock().unwrap();
        let before = posts.len();
        posts.retain(|p| p.id != post_id);
        Ok(posts.len() < before)
    }
}

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: Mutex<HashMap<Uuid, User>>,
    pub fail_saves: AtomicBool,
    summary_calls: Mutex<usize>,
}

impl InMemoryUserRepository {
    pub fn add(&self, username: &str) -> User {
        let user = User::new(Uuid::new_v4(), username, Some(format!("https://cdn.example.com/{username}.png")));
        self.users.lock().unwrap().insert(user.id, user.clone());
        user
    }

    pub fn stored(&self, user_id: Uuid) -> Option<User> {
        self.users.lock().unwrap().get(&user_id).cloned()
    }

    /// Number of batched summary lookups (N+1 detection)
    pub fn summary_calls(&self) -> usize {
        *self.summary_calls.lock().unwrap()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>> {
        Ok(self.stored(user_id))
    }

    async fn find_summaries(&self, user_ids: &[Uuid]) -> Result<HashMap<Uuid, UserSummary>> {
        *self.summary_calls.lock().unwrap() += 1;
        let users = self.users.lock().unwrap();
        Ok(user_ids
            .iter()
            .filter_map(|id| users.get(id).map(|u| (*id, u.summary())))
            .collect())
    }

    async fn save_bookmarks(&self, user: &User) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(AppError::Persistence("user write rejected".to_string()));
        }
        let mut users = self.users.lock().unwrap();
        match users.get_mut(&user.id) {
            Some(existing) => {
                *existing = user.clone();
                Ok(())
            }
            None => Err(AppError::NotFound(format!("user {}", user.id))),
        }
    }

    async fn remove_bookmark_from_users(&self, post_id: Uuid, user_ids: &[Uuid]) -> Result<()> {
        let mut users = self.users.lock().unwrap();
        for id in user_ids {
            if let Some(user) = users.get_mut(id) {
                user.forget_post(post_id);
            }
        }
        Ok(())
    }
}

/// Object storage double that records every call
pub struct RecordingStorage {
    uploads: Mutex<Vec<(UploadOptions, usize)>>,
    deletes: Mutex<Vec<String>>,
    live: Mutex<Vec<String>>,
    pub fail_uploads: AtomicBool,
    pub fail_deletes: AtomicBool,
    /// Overrides the resolved kind reported for the next uploads
    pub resolved_kind: Mutex<Option<String>>,
    pub upload_delay: Mutex<Option<Duration>>,
}

impl Default for RecordingStorage {
    fn default() -> Self {
        Self {
            uploads: Mutex::new(Vec::new()),
            deletes: Mutex::new(Vec::new()),
            live: Mutex::new(Vec::new()),
            fail_uploads: AtomicBool::new(false),
            fail_deletes: AtomicBool::new(false),
            resolved_kind: Mutex::new(None),
            upload_delay: Mutex::new(None),
        }
    }
}

impl RecordingStorage {
    pub fn upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }

    pub fn last_upload(&self) -> Option<UploadOptions> {
        self.uploads.lock().unwrap().last().map(|(o, _)| o.clone())
    }

    pub fn deleted_keys(&self) -> Vec<String> {
        self.deletes.lock().unwrap().clone()
    }

    /// Objects uploaded and not deleted
    pub fn live_objects(&self) -> Vec<String> {
        self.live.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStorage for RecordingStorage {
    async fn upload(&self, body: Bytes, options: UploadOptions) -> std::result::Result<StoredObject, StorageError> {
        let delay = *self.upload_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.uploads.lock().unwrap().push((options.clone(), body.len()));
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(StorageError::Upload("storage unavailable".to_string()));
        }

        let resolved = self.resolved_kind.lock().unwrap().clone().unwrap_or_else(|| {
            options
                .content_type
                .split('/')
                .next()
                .unwrap_or("raw")
                .to_string()
        });
        let key = format!("posts/{}", Uuid::new_v4());
        self.live.lock().unwrap().push(key.clone());

        Ok(StoredObject {
            url: format!("https://cdn.example.com/{}", key),
            key,
            resolved_kind: resolved,
        })
    }

    async fn delete(&self, key: &str) -> std::result::Result<(), StorageError> {
        self.deletes.lock().unwrap().push(key.to_string());
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StorageError::Delete("storage unavailable".to_string()));
        }
        self.live.lock().unwrap().retain(|k| k != key);
        Ok(())
    }
}

pub struct Harness {
    pub posts: Arc<InMemoryPostRepository>,
    pub users: Arc<InMemoryUserRepository>,
    pub storage: Arc<RecordingStorage>,
    pub service: PostService,
    pub staging: tempfile::TempDir,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_limits(|_| {})
    }

    pub fn with_limits(adjust: impl FnOnce(&mut UploadLimits)) -> Self {
        let posts = Arc::new(InMemoryPostRepository::default());
        let users = Arc::new(InMemoryUserRepository::default());
        let storage = Arc::new(RecordingStorage::default());
        let staging = tempfile::tempdir().expect("staging dir");

        let mut limits = UploadLimits {
            staging_dir: staging.path().to_path_buf(),
            ..UploadLimits::default()
        };
        adjust(&mut limits);

        let store = PostStore::new(
            posts.clone(),
            users.clone(),
            storage.clone(),
            Duration::from_secs(5),
        );
        let uploader = MediaUploader::new(storage.clone(), limits);

        Self {
            posts,
            users,
            storage,
            service: PostService::new(store, uploader),
            staging,
        }
    }

    /// Number of files left in the staging directory
    pub fn staged_files(&self) -> usize {
        std::fs::read_dir(self.staging.path())
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}
