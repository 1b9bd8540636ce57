//! Combiner: the simplest useful aggregator.
//!
//! Concatenates one buffer from every pad into a single output buffer.

use crate::aggregator::{Aggregate, AggregateContext};
use crate::buffer::Buffer;
use crate::clock::ClockTime;
use crate::error::Result;
use crate::event::Event;
use crate::flow::FlowStatus;
use crate::metadata::Metadata;
use bytes::BytesMut;
use std::time::Duration;
use tracing::debug;

/// An aggregator that concatenates the pending buffers of all pads, in pad
/// order, into one output buffer.
///
/// Output buffers get a running timestamp: the first one starts at zero and
/// each one advances it by the configured duration. Pads that reached EOS
/// contribute nothing. Once every pad is EOS, EOS is pushed downstream
/// exactly once.
///
/// # Example
///
/// ```rust
/// use parallax_aggregator::aggregator::Aggregator;
/// use parallax_aggregator::elements::BufferCombiner;
/// use std::time::Duration;
///
/// let aggregator = Aggregator::new(
///     BufferCombiner::new().with_duration(Duration::from_millis(20)),
/// );
/// let _pad = aggregator.request_pad(None)?;
/// # Ok::<(), parallax_aggregator::Error>(())
/// ```
#[derive(Debug)]
pub struct BufferCombiner {
    duration: ClockTime,
    position: ClockTime,
    sequence: u64,
    eos_sent: bool,
}

impl BufferCombiner {
    /// Create a combiner producing 100 ms buffers.
    pub fn new() -> Self {
        Self {
            duration: ClockTime::from_millis(100),
            position: ClockTime::ZERO,
            sequence: 0,
            eos_sent: false,
        }
    }

    /// Set the duration stamped on each output buffer.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration.into();
        self
    }

    /// Number of buffers produced since the last reset.
    pub fn produced(&self) -> u64 {
        self.sequence
    }

    fn reset(&mut self) {
        self.position = ClockTime::ZERO;
        self.sequence = 0;
        self.eos_sent = false;
    }
}

impl Default for BufferCombiner {
    fn default() -> Self {
        Self::new()
    }
}

impl Aggregate for BufferCombiner {
    fn aggregate(&mut self, ctx: &mut AggregateContext<'_>) -> FlowStatus {
        if ctx.all_eos() {
            if !self.eos_sent {
                debug!(aggregator = ctx.name(), "all pads EOS");
                ctx.push_event(Event::Eos);
                self.eos_sent = true;
            }
            return FlowStatus::Eos;
        }

        let mut data = BytesMut::new();
        for pad in ctx.pads() {
            if let Some(buffer) = ctx.take_buffer(pad) {
                data.extend_from_slice(buffer.as_bytes());
            }
        }

        let metadata = Metadata::from_sequence(self.sequence)
            .with_pts(self.position)
            .with_duration(self.duration);
        self.position = self.position.saturating_add(self.duration);
        self.sequence += 1;

        ctx.finish_buffer(Buffer::new(data.freeze(), metadata))
    }

    fn flush(&mut self) -> FlowStatus {
        self.reset();
        FlowStatus::Ok
    }

    fn start(&mut self) -> Result<()> {
        self.reset();
        Ok(())
    }
}
