//! Prometheus metrics for post-service.
//!
//! Collectors are registered on the default registry and rendered by the
//! `/metrics` handler.

use actix_web::HttpResponse;
use lazy_static::lazy_static;
use prometheus::{register_int_counter_vec, Encoder, IntCounterVec, TextEncoder};

lazy_static! {
    /// Post operations by name and outcome (`ok` or an error kind).
    pub static ref POST_OPERATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "post_operations_total",
        "Post operations segmented by operation and result",
        &["operation", "result"]
    )
    .expect("failed to register post_operations_total");

    pub static ref MEDIA_UPLOADS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "media_uploads_total",
        "Media upload attempts segmented by result",
        &["result"]
    )
    .expect("failed to register media_uploads_total");

    /// Remote objects that could not be removed and may be leaked.
    pub static ref MEDIA_CLEANUP_FAILURES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "media_cleanup_failures_total",
        "Failed advisory media deletions segmented by reason",
        &["reason"]
    )
    .expect("failed to register media_cleanup_failures_total");

    pub static ref BOOKMARK_PARTIAL_WRITES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "bookmark_partial_writes_total",
        "Bookmark toggles where only one side of the post/user pair was written",
        &["failed_side"]
    )
    .expect("failed to register bookmark_partial_writes_total");
}

pub fn record_operation<T>(operation: &str, result: &crate::Result<T>) {
    let outcome = match result {
        Ok(_) => "ok",
        Err(e) => e.kind(),
    };
    POST_OPERATIONS_TOTAL
        .with_label_values(&[operation, outcome])
        .inc();
}

pub fn record_upload(result: &str) {
    MEDIA_UPLOADS_TOTAL.with_label_values(&[result]).inc();
}

pub fn record_cleanup_failure(reason: &str) {
    MEDIA_CLEANUP_FAILURES_TOTAL
        .with_label_values(&[reason])
        .inc();
}

pub fn record_bookmark_partial_write(failed_side: &str) {
    BOOKMARK_PARTIAL_WRITES_TOTAL
        .with_label_values(&[failed_side])
        .inc();
}

/// Actix handler that renders Prometheus metrics in text format.
pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
