//! Tracing spans for the aggregator.

use tracing::{Level, Span, span};

/// Create a span for one aggregator instance.
///
/// # Example
///
/// ```rust
/// use parallax_aggregator::observability::span_aggregator;
///
/// let span = span_aggregator("mixer");
/// let _guard = span.enter();
/// ```
#[inline]
pub fn span_aggregator(name: &str) -> Span {
    span!(Level::INFO, "aggregator", name = %name)
}

/// Create the span entered by the aggregation thread for its lifetime.
#[inline]
pub fn span_aggregate_task(name: &str) -> Span {
    span!(Level::DEBUG, "aggregate_task", aggregator = %name)
}

/// Create a span for handling one seek on the source pad.
#[inline]
pub fn span_seek(name: &str, flushing: bool) -> Span {
    span!(Level::DEBUG, "seek", aggregator = %name, flushing = flushing)
}
