//! The capability a concrete aggregator implements.

use super::context::AggregateContext;
use crate::element::PadId;
use crate::error::Result;
use crate::event::{Event, EventResult};
use crate::flow::FlowStatus;
use crate::query::Query;

/// Behaviour of a concrete N-to-1 aggregator.
///
/// Only [`aggregate`](Aggregate::aggregate) is required. Every method runs
/// with the coordinator lock held, so implementations never need their own
/// synchronization, but they must not call back into the aggregator's
/// public API from inside a hook.
///
/// # Example
///
/// ```rust
/// use parallax_aggregator::aggregator::{Aggregate, AggregateContext};
/// use parallax_aggregator::{Buffer, Event, FlowStatus};
///
/// /// Forwards the first pad's buffer and drops the rest.
/// struct FirstWins;
///
/// impl Aggregate for FirstWins {
///     fn aggregate(&mut self, ctx: &mut AggregateContext<'_>) -> FlowStatus {
///         if ctx.all_eos() {
///             ctx.push_event(Event::Eos);
///             return FlowStatus::Eos;
///         }
///         let mut first: Option<Buffer> = None;
///         for pad in ctx.pads() {
///             let taken = ctx.take_buffer(pad);
///             if first.is_none() {
///                 first = taken;
///             }
///         }
///         match first {
///             Some(buffer) => ctx.finish_buffer(buffer),
///             None => FlowStatus::Ok,
///         }
///     }
/// }
/// ```
pub trait Aggregate: Send + 'static {
    /// Produce output from the pads' pending buffers.
    ///
    /// Called only when every pad holds a buffer or reached EOS. Buffers are
    /// drained with [`AggregateContext::take_buffer`]; output goes out through
    /// [`AggregateContext::finish_buffer`]. When every pad is EOS the
    /// implementation should push EOS once and return [`FlowStatus::Eos`].
    fn aggregate(&mut self, ctx: &mut AggregateContext<'_>) -> FlowStatus;

    /// A flushing seek completed on every pad.
    fn flush(&mut self) -> FlowStatus {
        FlowStatus::Ok
    }

    /// One pad received a flush-stop.
    fn pad_flush(&mut self, _pad: PadId) {}

    /// An event the aggregator does not handle itself arrived on a pad.
    ///
    /// `NotHandled` forwards the event downstream.
    fn pad_event(&mut self, _pad: PadId, _event: &Event) -> EventResult {
        EventResult::NotHandled
    }

    /// A query other than seeking arrived on a sink pad.
    fn pad_query(&mut self, _pad: PadId, _query: &mut Query) -> bool {
        false
    }

    /// A query other than seeking arrived on the source pad.
    fn src_query(&mut self, _query: &mut Query) -> bool {
        false
    }

    /// The aggregator is being activated.
    fn start(&mut self) -> Result<()> {
        Ok(())
    }

    /// The aggregator was deactivated and its task joined.
    fn stop(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<F> Aggregate for F
where
    F: FnMut(&mut AggregateContext<'_>) -> FlowStatus + Send + 'static,
{
    fn aggregate(&mut self, ctx: &mut AggregateContext<'_>) -> FlowStatus {
        self(ctx)
    }
}
