//! Metric recording for store operations.
//!
//! Goes through the `metrics` facade, so recording is a no-op unless the
//! embedding process installs a recorder. The server installs the
//! Prometheus exporter and serves these under `/metrics`.

use std::time::Duration;

use metrics::{counter, histogram};

/// Record an append attempt and its outcome, labeled by topic.
pub fn record_append(topic: &str, success: bool) {
    let labels = [("topic", topic.to_string())];
    counter!("message_store_appends_total", &labels).increment(1);
    if !success {
        counter!("message_store_appends_failed_total", &labels).increment(1);
    }
}

/// Record a retrieval attempt and its outcome, labeled by topic.
pub fn record_get(topic: &str, success: bool) {
    let labels = [("topic", topic.to_string())];
    counter!("message_store_gets_total", &labels).increment(1);
    if !success {
        counter!("message_store_gets_failed_total", &labels).increment(1);
    }
}

/// Record the duration of one garbage collection cycle.
pub fn record_gc_cycle(duration: Duration) {
    histogram!("message_store_gc_duration_seconds").record(duration.as_secs_f64());
}

/// Register descriptions for all store metrics with the installed recorder.
pub fn describe_metrics() {
    metrics::describe_counter!(
        "message_store_appends_total",
        "The total number of messages appended (including append failures) to the message store by topic"
    );
    metrics::describe_counter!(
        "message_store_appends_failed_total",
        "The total number of failed appends to the message store by topic"
    );
    metrics::describe_counter!(
        "message_store_gets_total",
        "The total number of retrievals (including retrieval failures) from the message store by topic"
    );
    metrics::describe_counter!(
        "message_store_gets_failed_total",
        "The total number of failed retrievals from the message store by topic"
    );
    metrics::describe_histogram!(
        "message_store_gc_duration_seconds",
        "The distribution of message store garbage collection cycle durations in seconds"
    );
}
