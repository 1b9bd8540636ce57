//! View of the coordinator handed to [`Aggregate::aggregate`].
//!
//! [`Aggregate::aggregate`]: super::Aggregate::aggregate

use super::coordinator::{Core, push_downstream};
use crate::buffer::Buffer;
use crate::element::PadId;
use crate::event::{Event, Segment, StreamStartEvent};
use crate::flow::FlowStatus;
use tracing::{info, trace, warn};

/// Exclusive access to every pad's slot for the duration of one
/// aggregation step.
pub struct AggregateContext<'a> {
    core: &'a mut Core,
    name: &'a str,
}

impl<'a> AggregateContext<'a> {
    pub(crate) fn new(core: &'a mut Core, name: &'a str) -> Self {
        Self { core, name }
    }

    /// Name of the aggregator.
    pub fn name(&self) -> &str {
        self.name
    }

    /// All registered pads, in creation order.
    pub fn pads(&self) -> Vec<PadId> {
        self.core.ports.keys().copied().collect()
    }

    /// Number of registered pads.
    pub fn pad_count(&self) -> usize {
        self.core.ports.len()
    }

    /// Name of a pad.
    pub fn pad_name(&self, pad: PadId) -> Option<&str> {
        self.core.ports.get(&pad).map(|port| &*port.name)
    }

    /// Check whether a pad holds a buffer.
    pub fn has_buffer(&self, pad: PadId) -> bool {
        self.core
            .ports
            .get(&pad)
            .is_some_and(|port| port.slot.is_occupied())
    }

    /// Check whether a pad reached EOS.
    pub fn is_eos(&self, pad: PadId) -> bool {
        self.core
            .ports
            .get(&pad)
            .is_some_and(|port| port.slot.is_eos())
    }

    /// Check whether every pad reached EOS.
    pub fn all_eos(&self) -> bool {
        !self.core.ports.is_empty() && self.core.ports.values().all(|port| port.slot.is_eos())
    }

    /// Segment of a pad.
    pub fn pad_segment(&self, pad: PadId) -> Option<&Segment> {
        self.core.ports.get(&pad).map(|port| &port.segment)
    }

    /// Take the pad's pending buffer, freeing its slot and waking its
    /// producer.
    pub fn take_buffer(&mut self, pad: PadId) -> Option<Buffer> {
        let port = self.core.ports.get_mut(&pad)?;
        let buffer = port.slot.take()?;
        trace!(aggregator = %self.name, pad = %port.name, "buffer consumed");
        port.waiters.notify_all();
        Some(buffer)
    }

    /// Output segment.
    pub fn segment(&self) -> &Segment {
        &self.core.output.segment
    }

    /// Mutable output segment, e.g. to switch it to another format.
    pub fn segment_mut(&mut self) -> &mut Segment {
        &mut self.core.output.segment
    }

    /// Check whether a flushing seek is in progress.
    pub fn is_flush_seeking(&self) -> bool {
        self.core.barrier.is_open()
    }

    /// Push an output buffer downstream.
    ///
    /// Sends the stream-start event first if none was sent in this cycle,
    /// then the output segment if it changed. While a flushing seek is in
    /// progress the segment is held back and the buffer is dropped with
    /// `Ok`.
    pub fn finish_buffer(&mut self, buffer: Buffer) -> FlowStatus {
        let seeking = self.core.barrier.is_open();

        if self.core.output.send_stream_start {
            let stream_id = self.core.output.next_stream_id();
            info!(aggregator = %self.name, %stream_id, "pushing stream start");
            if !self.push_event(Event::StreamStart(StreamStartEvent::new(stream_id))) {
                warn!(aggregator = %self.name, "sending stream start event failed");
            }
            self.core.output.send_stream_start = false;
        }

        if self.core.output.send_segment && !seeking {
            info!(aggregator = %self.name, "pushing segment");
            let segment = self.core.output.segment.clone();
            if !self.push_event(Event::Segment(segment)) {
                warn!(aggregator = %self.name, "sending segment event failed");
            }
            self.core.output.send_segment = false;
        }

        if seeking {
            trace!(aggregator = %self.name, "flushing seek in progress, dropping output buffer");
            return FlowStatus::Ok;
        }

        match &self.core.downstream {
            Some(peer) => {
                trace!(aggregator = %self.name, len = buffer.len(), "pushing buffer");
                peer.chain(buffer)
            }
            None => FlowStatus::NotLinked,
        }
    }

    /// Push an event downstream. Returns `false` if no peer accepted it.
    pub fn push_event(&mut self, event: Event) -> bool {
        push_downstream(self.core.downstream.as_ref(), event)
    }
}
