//! Dispatch metrics
//!
//! Thin wrappers over the `metrics` facade. Without an installed recorder
//! every call is a no-op, so the dispatcher records unconditionally.

use contracts::{BatchReport, DeliveryOutcome};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};

pub const DELIVERIES_TOTAL: &str = "fanout_deliveries_total";
pub const DELIVERY_LATENCY_MS: &str = "fanout_delivery_latency_ms";
pub const ENUMERATION_ERRORS_TOTAL: &str = "fanout_enumeration_errors_total";
pub const BATCHES_TOTAL: &str = "fanout_batches_total";
pub const BATCH_DURATION_SECONDS: &str = "fanout_batch_duration_seconds";
pub const LAST_BATCH_SUCCEEDED: &str = "fanout_last_batch_succeeded";
pub const LAST_BATCH_FAILED: &str = "fanout_last_batch_failed";

/// Register help text and units with the installed recorder
pub fn describe_metrics() {
    describe_counter!(
        DELIVERIES_TOTAL,
        Unit::Count,
        "Delivery units by outcome (delivered, skipped, failed)"
    );
    describe_histogram!(
        DELIVERY_LATENCY_MS,
        Unit::Milliseconds,
        "Gateway hand-over time of successful deliveries"
    );
    describe_counter!(
        ENUMERATION_ERRORS_TOTAL,
        Unit::Count,
        "Candidates excluded because their session lookup errored"
    );
    describe_counter!(
        BATCHES_TOTAL,
        Unit::Count,
        "Broadcast batches by terminal status"
    );
    describe_histogram!(
        BATCH_DURATION_SECONDS,
        Unit::Seconds,
        "Wall time from batch start to summary"
    );
    describe_gauge!(LAST_BATCH_SUCCEEDED, "Successful deliveries of the last batch");
    describe_gauge!(LAST_BATCH_FAILED, "Failed deliveries of the last batch");
}

/// Record one delivery unit outcome
pub fn record_delivery(outcome: &DeliveryOutcome) {
    counter!(
        DELIVERIES_TOTAL,
        "outcome" => outcome.as_label()
    )
    .increment(1);
}

/// Record gateway delivery latency
pub fn record_delivery_latency_ms(latency_ms: f64) {
    histogram!(DELIVERY_LATENCY_MS).record(latency_ms);
}

/// Record a candidate excluded because its validity lookup errored
pub fn record_enumeration_error() {
    counter!(ENUMERATION_ERRORS_TOTAL).increment(1);
}

/// Record a finished batch
pub fn record_batch_report(report: &BatchReport) {
    let status = if report.interrupted {
        "interrupted"
    } else if report.deadline_expired {
        "deadline_expired"
    } else {
        "completed"
    };
    counter!(BATCHES_TOTAL, "status" => status).increment(1);
    histogram!(BATCH_DURATION_SECONDS).record(report.elapsed.as_secs_f64());
    gauge!(LAST_BATCH_SUCCEEDED).set(report.succeeded as f64);
    gauge!(LAST_BATCH_FAILED).set(report.failed as f64);
}

/// Record a batch refused before start (usage error, admission)
pub fn record_batch_rejected(reason: &'static str) {
    counter!(BATCHES_TOTAL, "status" => "rejected", "reason" => reason).increment(1);
}
