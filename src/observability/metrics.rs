//! Metrics collection using metrics-rs.

use crate::flow::FlowStatus;
use metrics::{Unit, counter, gauge, histogram};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Whether metrics have been initialized.
static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

// Metric names as constants for consistency
const AGGREGATIONS: &str = "parallax_aggregator_aggregations";
const BUFFERS_SUBMITTED: &str = "parallax_aggregator_buffers_submitted";
const BUFFERS_FLUSHED: &str = "parallax_aggregator_buffers_flushed";
const FLOW_ERRORS: &str = "parallax_aggregator_flow_errors";
const SEEKS: &str = "parallax_aggregator_seeks";
const PADS: &str = "parallax_aggregator_pads";
const AGGREGATE_TIME_NS: &str = "parallax_aggregator_aggregate_time_ns";

/// Initialize metrics descriptions.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init_metrics() {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        return;
    }

    metrics::describe_counter!(
        AGGREGATIONS,
        Unit::Count,
        "Number of aggregation steps executed"
    );
    metrics::describe_counter!(
        BUFFERS_SUBMITTED,
        Unit::Count,
        "Buffers deposited into sink pad slots"
    );
    metrics::describe_counter!(
        BUFFERS_FLUSHED,
        Unit::Count,
        "Pending buffers discarded by flush, release or deactivation"
    );
    metrics::describe_counter!(
        FLOW_ERRORS,
        Unit::Count,
        "Aggregation steps that returned an error flow status"
    );
    metrics::describe_counter!(SEEKS, Unit::Count, "Seek events handled on the source pad");
    metrics::describe_gauge!(PADS, Unit::Count, "Number of registered sink pads");
    metrics::describe_histogram!(
        AGGREGATE_TIME_NS,
        Unit::Nanoseconds,
        "Time spent in one aggregation step"
    );
}

/// Record one aggregation step and its duration.
#[inline]
pub fn record_aggregation(element: &str, elapsed: Duration) {
    counter!(AGGREGATIONS, "element" => element.to_string()).increment(1);
    histogram!(AGGREGATE_TIME_NS, "element" => element.to_string())
        .record(elapsed.as_nanos() as f64);
}

/// Record a buffer stored into a slot.
#[inline]
pub fn record_buffer_submitted(element: &str) {
    counter!(BUFFERS_SUBMITTED, "element" => element.to_string()).increment(1);
}

/// Record a pending buffer discarded without being aggregated.
#[inline]
pub fn record_buffer_flushed(element: &str) {
    counter!(BUFFERS_FLUSHED, "element" => element.to_string()).increment(1);
}

/// Record an aggregation step that failed.
#[inline]
pub fn record_flow_error(element: &str, status: FlowStatus) {
    counter!(FLOW_ERRORS, "element" => element.to_string(), "status" => status.name())
        .increment(1);
}

/// Record a seek handled on the source pad.
#[inline]
pub fn record_seek(element: &str, flushing: bool) {
    counter!(SEEKS, "element" => element.to_string(), "flush" => flushing.to_string())
        .increment(1);
}

/// Record the current number of sink pads.
#[inline]
pub fn record_pad_count(element: &str, pads: usize) {
    gauge!(PADS, "element" => element.to_string()).set(pads as f64);
}
