/// S3 configuration shared by media-owning services
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Config {
    /// S3 bucket name
    pub bucket: String,
    /// AWS region
    pub region: String,
    /// Base URL objects are served from (CDN domain or bucket endpoint)
    pub public_base_url: String,
    /// Prefix prepended to every generated object key
    pub key_prefix: String,
    /// Custom endpoint (MinIO, LocalStack)
    pub endpoint_url: Option<String>,
    /// Whether to use path-style addressing (required by most S3-compatible stores)
    pub force_path_style: bool,
}

impl S3Config {
    /// Load S3 configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        let bucket = std::env::var("S3_BUCKET").unwrap_or_else(|_| "post-media".to_string());
        if bucket.trim().is_empty() {
            return Err("S3_BUCKET cannot be empty".to_string());
        }

        let region = std::env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string());
        let public_base_url = std::env::var("S3_PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("https://{}.s3.{}.amazonaws.com", bucket, region));

        Ok(Self {
            bucket,
            region,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            key_prefix: std::env::var("S3_KEY_PREFIX")
                .unwrap_or_else(|_| "posts".to_string())
                .trim_matches('/')
                .to_string(),
            endpoint_url: std::env::var("S3_ENDPOINT_URL")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            force_path_style: std::env::var("S3_FORCE_PATH_STYLE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
        })
    }

    /// Generate a fresh object key under the configured prefix
    pub fn new_object_key(&self, extension: &str) -> String {
        let id = Uuid::new_v4();
        let extension = extension.trim_start_matches('.');
        match (self.key_prefix.is_empty(), extension.is_empty()) {
            (true, true) => id.to_string(),
            (true, false) => format!("{}.{}", id, extension),
            (false, true) => format!("{}/{}", self.key_prefix, id),
            (false, false) => format!("{}/{}.{}", self.key_prefix, id, extension),
        }
    }

    /// Public URL for an object key
    pub fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key.trim_start_matches('/'))
    }
}
