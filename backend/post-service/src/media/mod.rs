//! Media attachment handling.
//!
//! An incoming attachment is validated against the MIME allow-list, handed to
//! object storage, and normalized into a [`MediaRef`]. The local staging file
//! behind an attachment is owned by a [`TempFile`] guard, so it is removed on
//! every exit path: success, validation failure, upload failure, timeout, or
//! the request future being dropped.

pub mod storage;

pub use storage::{ObjectStorage, ResizeLimit, S3ObjectStorage, StorageError, StoredObject, UploadOptions};

use crate::config::MediaConfig;
use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::{MediaKind, MediaRef};
use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub const ALLOWED_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/jpg", "video/mp4"];

/// Category a MIME type was accepted under, or None if it is not allowed
pub fn requested_kind(mime_type: &str) -> Option<MediaKind> {
    let mime = mime_type.trim().to_ascii_lowercase();
    if !ALLOWED_MIME_TYPES.contains(&mime.as_str()) {
        return None;
    }
    if mime.starts_with("image/") {
        Some(MediaKind::Image)
    } else {
        Some(MediaKind::Video)
    }
}

/// Staged file removed when the guard is dropped
#[derive(Debug)]
pub struct TempFile {
    path: PathBuf,
}

impl TempFile {
    /// Take ownership of an existing file
    pub fn adopt(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Create an empty staging file in `dir`
    pub async fn create_in(dir: &Path) -> std::io::Result<(Self, tokio::fs::File)> {
        let path = dir.join(format!("post-upload-{}", Uuid::new_v4()));
        let file = tokio::fs::File::create(&path).await?;
        Ok((Self { path }, file))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        // Inline unlink: drop may run outside a tokio runtime, so no spawn_blocking here.
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::trace!(path = %self.path.display(), "staging file released"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to release staging file")
            }
        }
    }
}

#[derive(Debug)]
pub enum AttachmentSource {
    File(TempFile),
    Memory(Bytes),
}

impl AttachmentSource {
    async fn read(&self) -> std::io::Result<Bytes> {
        match self {
            AttachmentSource::File(file) => tokio::fs::read(file.path()).await.map(Bytes::from),
            AttachmentSource::Memory(bytes) => Ok(bytes.clone()),
        }
    }
}

/// Incoming binary attachment
#[derive(Debug)]
pub struct Attachment {
    pub mime_type: String,
    pub size: u64,
    pub source: AttachmentSource,
}

impl Attachment {
    pub fn from_file(mime_type: impl Into<String>, size: u64, file: TempFile) -> Self {
        Self {
            mime_type: mime_type.into(),
            size,
            source: AttachmentSource::File(file),
        }
    }

    pub fn from_bytes(mime_type: impl Into<String>, bytes: Bytes) -> Self {
        Self {
            mime_type: mime_type.into(),
            size: bytes.len() as u64,
            source: AttachmentSource::Memory(bytes),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadLimits {
    pub max_dimension: u32,
    pub max_upload_bytes: u64,
    pub timeout: Duration,
    pub staging_dir: PathBuf,
}

impl From<&MediaConfig> for UploadLimits {
    fn from(cfg: &MediaConfig) -> Self {
        Self {
            max_dimension: cfg.max_dimension,
            max_upload_bytes: cfg.max_upload_bytes,
            timeout: cfg.upload_timeout,
            staging_dir: cfg.tmp_dir.clone(),
        }
    }
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self::from(&MediaConfig::default())
    }
}

pub struct MediaUploader {
    storage: Arc<dyn ObjectStorage>,
    limits: UploadLimits,
}

impl MediaUploader {
    pub fn new(storage: Arc<dyn ObjectStorage>, limits: UploadLimits) -> Self {
        Self { storage, limits }
    }

    pub fn limits(&self) -> &UploadLimits {
        &self.limits
    }

    /// Validate and upload an attachment. The attachment's staging file is
    /// released before this returns, whatever the outcome.
    pub async fn upload(&self, attachment: Attachment) -> Result<MediaRef> {
        let Attachment {
            mime_type,
            size,
            source,
        } = attachment;

        let Some(requested) = requested_kind(&mime_type) else {
            metrics::record_upload("unsupported");
            return Err(AppError::UnsupportedMediaType(mime_type));
        };

        if size == 0 {
            return Err(AppError::Validation("media attachment is empty".to_string()));
        }
        if size > self.limits.max_upload_bytes {
            return Err(AppError::Validation(format!(
                "media attachment exceeds {} bytes",
                self.limits.max_upload_bytes
            )));
        }

        let body = source.read().await.map_err(|e| {
            metrics::record_upload("failed");
            AppError::UploadFailed(format!("failed to read attachment: {}", e))
        })?;

        let options = UploadOptions {
            content_type: mime_type.trim().to_ascii_lowercase(),
            resize: Some(ResizeLimit::square(self.limits.max_dimension)),
        };

        let stored = match tokio::time::timeout(self.limits.timeout, self.storage.upload(body, options))
            .await
        {
            Ok(Ok(stored)) => stored,
            Ok(Err(e)) => {
                metrics::record_upload("failed");
                tracing::warn!(error = %e, %mime_type, "media upload failed");
                return Err(AppError::UploadFailed(e.to_string()));
            }
            Err(_) => {
                metrics::record_upload("timeout");
                tracing::warn!(timeout = ?self.limits.timeout, %mime_type, "media upload timed out");
                return Err(AppError::UploadFailed(format!(
                    "upload timed out after {:?}",
                    self.limits.timeout
                )));
            }
        };

        let Some(kind) = MediaKind::parse(&stored.resolved_kind) else {
            metrics::record_upload("failed");
            tracing::warn!(
                key = %stored.key,
                resolved_kind = %stored.resolved_kind,
                "storage resolved upload to an unsupported kind"
            );
            self.discard_key(&stored.key, "unsupported_resolved_kind").await;
            return Err(AppError::UploadFailed(format!(
                "storage resolved upload as {}",
                stored.resolved_kind
            )));
        };

        if kind != requested {
            tracing::debug!(%requested, resolved = %kind, "storage overrode requested media kind");
        }

        metrics::record_upload("success");
        drop(source);

        Ok(MediaRef {
            url: stored.url,
            kind,
            key: stored.key,
        })
    }

    /// Best-effort removal of an uploaded object nothing will reference
    pub async fn discard(&self, media: &MediaRef, reason: &str) {
        self.discard_key(&media.key, reason).await;
    }

    async fn discard_key(&self, key: &str, reason: &str) {
        if let Err(e) = self.storage.delete(key).await {
            metrics::record_cleanup_failure(reason);
            tracing::warn!(%key, reason, error = %e, "failed to remove orphaned media object");
        }
    }
}
