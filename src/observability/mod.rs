//! Observability features: metrics and tracing.
//!
//! ## Metrics
//!
//! | Metric | Type | Description |
//! |--------|------|-------------|
//! | `parallax_aggregator_aggregations` | Counter | Aggregation steps executed |
//! | `parallax_aggregator_buffers_submitted` | Counter | Buffers stored into pad slots |
//! | `parallax_aggregator_buffers_flushed` | Counter | Pending buffers discarded |
//! | `parallax_aggregator_flow_errors` | Counter | Failed aggregation steps |
//! | `parallax_aggregator_seeks` | Counter | Seeks handled on the source pad |
//! | `parallax_aggregator_pads` | Gauge | Registered sink pads |
//! | `parallax_aggregator_aggregate_time_ns` | Histogram | Time per aggregation step |
//!
//! All metrics carry an `element` label with the aggregator's name.
//! Recording without an installed recorder is a no-op.
//!
//! ## Tracing
//!
//! The aggregator logs through `tracing` with an `aggregator` field and, for
//! pad operations, a `pad` field. The aggregation thread runs inside
//! [`span_aggregate_task`].

mod metrics;
mod tracing_support;

pub use metrics::{
    init_metrics, record_aggregation, record_buffer_flushed, record_buffer_submitted,
    record_flow_error, record_pad_count, record_seek,
};
pub use tracing_support::{span_aggregate_task, span_aggregator, span_seek};
