/// Post Service Library
///
/// Post creation with media upload, and the like / bookmark / comment
/// mutations that keep a post and its user-side references consistent.
///
/// # Modules
///
/// - `handlers`: HTTP request handlers
/// - `models`: Posts, comments, users and their enriched views
/// - `services`: Post store, engagement transitions, use-case orchestration
/// - `media`: Attachment validation and object storage uploads
/// - `db`: Repository traits and PostgreSQL implementations
/// - `middleware`: Gateway-forwarded caller identity
/// - `error`: Error types and handling
/// - `config`: Configuration management
/// - `metrics`: Prometheus collectors
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod media;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::{AppError, Result};
