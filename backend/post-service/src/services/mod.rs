/// Business logic layer for post-service
///
/// - `post_store`: persistence, enrichment and deletion
/// - `engagement`: like / bookmark / comment state transitions
/// - `posts`: use-case orchestration consumed by handlers
pub mod engagement;
pub mod post_store;
pub mod posts;

pub use post_store::PostStore;
pub use posts::PostService;
