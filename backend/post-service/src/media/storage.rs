/// Object storage seam for post media
///
/// `S3ObjectStorage` applies the bounding-box limit before the put, since S3
/// has no server-side transforms. Both the limit and the reported kind follow
/// the sniffed bytes rather than the MIME type the caller declared.
use async_trait::async_trait;
use bytes::Bytes;
use image::imageops::FilterType;
use image::GenericImageView;
use s3_utils::S3Operations;
use std::io::Cursor;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("{0}")]
    Upload(String),

    #[error("{0}")]
    Delete(String),

    #[error("transform failed: {0}")]
    Transform(String),
}

/// Aspect-preserving bounding box; never upscales
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeLimit {
    pub max_width: u32,
    pub max_height: u32,
}

impl ResizeLimit {
    pub fn square(edge: u32) -> Self {
        Self {
            max_width: edge,
            max_height: edge,
        }
    }

    /// Target dimensions, or None when the image already fits
    pub fn fit(&self, width: u32, height: u32) -> Option<(u32, u32)> {
        if width == 0 || height == 0 || (width <= self.max_width && height <= self.max_height) {
            return None;
        }

        let scale = f64::min(
            self.max_width as f64 / width as f64,
            self.max_height as f64 / height as f64,
        );
        let w = ((width as f64 * scale).round() as u32).clamp(1, self.max_width);
        let h = ((height as f64 * scale).round() as u32).clamp(1, self.max_height);
        Some((w, h))
    }
}

#[derive(Debug, Clone)]
pub struct UploadOptions {
    pub content_type: String,
    /// Bound applied when the body is image data; None uploads it untouched
    pub resize: Option<ResizeLimit>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub url: String,
    /// Kind as resolved by the backend: `image`, `video` or `raw`
    pub resolved_kind: String,
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(&self, body: Bytes, options: UploadOptions) -> Result<StoredObject, StorageError>;

    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

pub struct S3ObjectStorage {
    ops: S3Operations,
}

impl S3ObjectStorage {
    pub fn new(ops: S3Operations) -> Self {
        Self { ops }
    }
}

#[async_trait]
impl ObjectStorage for S3ObjectStorage {
    async fn upload(&self, body: Bytes, options: UploadOptions) -> Result<StoredObject, StorageError> {
        let body = match image_limit(&body, options.resize) {
            Some(limit) => tokio::task::spawn_blocking(move || limit_image(body, limit))
                .await
                .map_err(|e| StorageError::Transform(e.to_string()))??,
            None => body,
        };

        let detected = infer::get(&body);
        let resolved_kind = match detected.map(|t| t.matcher_type()) {
            Some(infer::MatcherType::Image) => "image",
            Some(infer::MatcherType::Video) => "video",
            _ => "raw",
        };
        let extension = detected.map(|t| t.extension()).unwrap_or("bin");
        let content_type = detected
            .map(|t| t.mime_type().to_string())
            .unwrap_or(options.content_type);

        let key = self.ops.config().new_object_key(extension);
        let url = self
            .ops
            .put_object(&key, body.to_vec(), &content_type)
            .await
            .map_err(|e| StorageError::Upload(e.to_string()))?;

        Ok(StoredObject {
            key,
            url,
            resolved_kind: resolved_kind.to_string(),
        })
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.ops
            .delete_object(key)
            .await
            .map_err(|e| StorageError::Delete(e.to_string()))
    }
}

/// Limit to apply, if any; only image bytes are transformed
fn image_limit(body: &[u8], resize: Option<ResizeLimit>) -> Option<ResizeLimit> {
    resize.filter(|_| infer::is_image(body))
}

/// Shrink an encoded image into the bounding box, keeping its format
fn limit_image(body: Bytes, limit: ResizeLimit) -> Result<Bytes, StorageError> {
    let format =
        image::guess_format(&body).map_err(|e| StorageError::Transform(e.to_string()))?;
    let img = image::load_from_memory_with_format(&body, format)
        .map_err(|e| StorageError::Transform(e.to_string()))?;

    let (width, height) = img.dimensions();
    let Some((w, h)) = limit.fit(width, height) else {
        return Ok(body);
    };

    let resized = img.resize_exact(w, h, FilterType::Lanczos3);
    let mut out = Cursor::new(Vec::new());
    resized
        .write_to(&mut out, format)
        .map_err(|e| StorageError::Transform(e.to_string()))?;

    tracing::debug!(width, height, w, h, "image limited before upload");

    Ok(Bytes::from(out.into_inner()))
}
