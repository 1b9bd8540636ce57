//! Peer interfaces on either side of the aggregator.
//!
//! The aggregator does not own its neighbours. It talks to them through
//! these traits: an [`UpstreamPeer`] per sink pad (receives seeks and other
//! upstream events) and one [`DownstreamPeer`] on the source pad (receives
//! buffers and downstream events).

use crate::buffer::Buffer;
use crate::event::Event;
use crate::flow::FlowStatus;

/// The element linked after the aggregator's source pad.
pub trait DownstreamPeer: Send + Sync {
    /// Push one buffer. The returned status becomes the aggregation result.
    fn chain(&self, buffer: Buffer) -> FlowStatus;

    /// Push one event. Returns `true` if the event was accepted.
    fn event(&self, event: Event) -> bool;
}

/// The element linked before one of the aggregator's sink pads.
pub trait UpstreamPeer: Send + Sync {
    /// Deliver an upstream event. Returns `true` if the event was accepted.
    fn event(&self, event: Event) -> bool;
}
