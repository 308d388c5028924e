//! Prometheus metrics for vote-service.
//!
//! Exposes vote collectors, PostgreSQL store collectors and an HTTP handler
//! for the `/metrics` endpoint.

use actix_web::HttpResponse;
use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_histogram_vec, register_int_counter_vec,
    register_int_gauge_vec, Encoder, Histogram, HistogramVec, IntCounterVec, IntGaugeVec,
    TextEncoder,
};

lazy_static! {
    /// Applied transitions by requested action and resulting outcome.
    pub static ref VOTE_TRANSITIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "vote_transitions_total",
        "Vote transitions segmented by action and outcome",
        &["action", "outcome"]
    )
    .expect("failed to register vote_transitions_total");

    pub static ref VOTE_OPERATION_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "vote_operation_duration_seconds",
        "Vote service operation latency",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]
    )
    .expect("failed to register vote_operation_duration_seconds");

    /// Failed operations by error kind (unauthorized, not_found, conflict, ...).
    pub static ref VOTE_ERRORS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "vote_errors_total",
        "Vote service errors segmented by operation and kind",
        &["operation", "kind"]
    )
    .expect("failed to register vote_errors_total");

    /// Time spent waiting for a pooled connection before a store call.
    pub static ref VOTE_DB_ACQUIRE_SECONDS: Histogram = register_histogram!(
        "vote_db_acquire_seconds",
        "Time to check out a PostgreSQL connection",
        vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]
    )
    .expect("failed to register vote_db_acquire_seconds");

    pub static ref VOTE_DB_ACQUIRE_ERRORS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "vote_db_acquire_errors_total",
        "Failed connection checkouts segmented by reason",
        &["reason"]
    )
    .expect("failed to register vote_db_acquire_errors_total");

    /// Wait on the post row lock taken by every transition.
    pub static ref VOTE_POST_LOCK_WAIT_SECONDS: Histogram = register_histogram!(
        "vote_post_lock_wait_seconds",
        "Time a transition waits for the post row lock",
        vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0]
    )
    .expect("failed to register vote_post_lock_wait_seconds");

    pub static ref VOTE_DB_POOL_CONNECTIONS: IntGaugeVec = register_int_gauge_vec!(
        "vote_db_pool_connections",
        "PostgreSQL pool connections by state",
        &["state"]
    )
    .expect("failed to register vote_db_pool_connections");
}

pub fn record_transition(action: &str, outcome: &str) {
    VOTE_TRANSITIONS_TOTAL
        .with_label_values(&[action, outcome])
        .inc();
}

pub fn record_duration(operation: &str, seconds: f64) {
    VOTE_OPERATION_DURATION_SECONDS
        .with_label_values(&[operation])
        .observe(seconds);
}

pub fn record_error(operation: &str, kind: &str) {
    VOTE_ERRORS_TOTAL.with_label_values(&[operation, kind]).inc();
}

pub fn record_acquire(seconds: f64, failure: Option<&str>) {
    VOTE_DB_ACQUIRE_SECONDS.observe(seconds);
    if let Some(reason) = failure {
        VOTE_DB_ACQUIRE_ERRORS_TOTAL.with_label_values(&[reason]).inc();
    }
}

pub fn record_lock_wait(seconds: f64) {
    VOTE_POST_LOCK_WAIT_SECONDS.observe(seconds);
}

pub fn set_pool_connections(idle: i64, active: i64, max: i64) {
    VOTE_DB_POOL_CONNECTIONS.with_label_values(&["idle"]).set(idle);
    VOTE_DB_POOL_CONNECTIONS.with_label_values(&["active"]).set(active);
    VOTE_DB_POOL_CONNECTIONS.with_label_values(&["max"]).set(max);
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collectors_register_and_count() {
        record_transition("like", "liked");
        record_error("apply_vote", "not_found");
        record_duration("apply_vote", 0.002);

        assert!(
            VOTE_TRANSITIONS_TOTAL
                .with_label_values(&["like", "liked"])
                .get()
                >= 1
        );
        assert!(
            VOTE_ERRORS_TOTAL
                .with_label_values(&["apply_vote", "not_found"])
                .get()
                >= 1
        );
    }

    #[test]
    fn test_store_collectors() {
        let before = VOTE_POST_LOCK_WAIT_SECONDS.get_sample_count();
        record_lock_wait(0.003);
        assert!(VOTE_POST_LOCK_WAIT_SECONDS.get_sample_count() > before);

        record_acquire(0.001, Some("timeout"));
        assert!(
            VOTE_DB_ACQUIRE_ERRORS_TOTAL
                .with_label_values(&["timeout"])
                .get()
                >= 1
        );

        set_pool_connections(3, 2, 10);
        assert_eq!(VOTE_DB_POOL_CONNECTIONS.with_label_values(&["active"]).get(), 2);
    }
}
