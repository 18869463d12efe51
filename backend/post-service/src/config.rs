/// Configuration management for Post Service
///
/// Loads settings from environment variables (optionally seeded from `.env`).
use s3_utils::S3Config;
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub s3: S3Config,
    pub media: MediaConfig,
    /// Deadline applied to every document-store call
    pub store_timeout: Duration,
}

/// Application settings
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Application environment (development, staging, production)
    pub env: String,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Media upload limits
#[derive(Debug, Clone)]
pub struct MediaConfig {
    /// Bounding box edge for image uploads
    pub max_dimension: u32,
    pub max_upload_bytes: u64,
    pub upload_timeout: Duration,
    /// Directory incoming attachments are staged in before upload
    pub tmp_dir: PathBuf,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            max_dimension: 1080,
            max_upload_bytes: 50 * 1024 * 1024,
            upload_timeout: Duration::from_millis(30_000),
            tmp_dir: std::env::temp_dir(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        let app_env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        let production = app_env.eq_ignore_ascii_case("production");

        let database_url = match std::env::var("DATABASE_URL") {
            Ok(url) => url,
            Err(_) if production => {
                return Err("DATABASE_URL must be set in production".to_string())
            }
            Err(_) => "postgresql://localhost/posts".to_string(),
        };

        let defaults = MediaConfig::default();

        Ok(Config {
            app: AppConfig {
                env: app_env,
                host: std::env::var("POST_SERVICE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env_or_default("POST_SERVICE_PORT", 8084)?,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: parse_env_or_default("DATABASE_MAX_CONNECTIONS", 10)?,
            },
            s3: S3Config::from_env()?,
            media: MediaConfig {
                max_dimension: parse_env_or_default("MEDIA_MAX_DIMENSION", defaults.max_dimension)?,
                max_upload_bytes: parse_env_or_default(
                    "MEDIA_MAX_UPLOAD_BYTES",
                    defaults.max_upload_bytes,
                )?,
                upload_timeout: Duration::from_millis(parse_env_or_default(
                    "MEDIA_UPLOAD_TIMEOUT_MS",
                    30_000,
                )?),
                tmp_dir: std::env::var("MEDIA_TMP_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.tmp_dir),
            },
            store_timeout: Duration::from_millis(parse_env_or_default("STORE_TIMEOUT_MS", 5_000)?),
        })
    }
}

fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(val) => val
            .trim()
            .parse()
            .map_err(|e| format!("Failed to parse {}='{}': {}", key, val, e)),
        Err(_) => Ok(default),
    }
}
