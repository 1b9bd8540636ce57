//! Sink pads: internal per-pad state and the producer-facing handle.

use super::barrier::PadBarrier;
use super::coordinator::Inner;
use super::slot::Slot;
use crate::buffer::Buffer;
use crate::element::{PadId, UpstreamPeer};
use crate::event::{Event, Segment};
use crate::flow::FlowStatus;
use crate::query::Query;
use std::fmt;
use std::sync::{Arc, Condvar, Weak};

/// State of one sink pad, owned by the coordinator.
pub(crate) struct Port {
    pub(crate) name: Arc<str>,
    pub(crate) slot: Slot,
    pub(crate) segment: Segment,
    pub(crate) barrier: PadBarrier,
    pub(crate) upstream: Option<Arc<dyn UpstreamPeer>>,
    /// Producers blocked on this pad wait here, using the coordinator mutex.
    pub(crate) waiters: Arc<Condvar>,
}

impl Port {
    pub(crate) fn new(name: Arc<str>) -> Self {
        Self {
            name,
            slot: Slot::new(),
            segment: Segment::default(),
            barrier: PadBarrier::default(),
            upstream: None,
            waiters: Arc::new(Condvar::new()),
        }
    }
}

/// Handle to a sink pad, used by the producer feeding it.
///
/// The handle does not keep the aggregator alive. Once the pad is released
/// or the aggregator is dropped, data calls return [`FlowStatus::Flushing`]
/// and event calls return `false`.
///
/// Only one thread may submit to a given pad at a time.
#[derive(Clone)]
pub struct PadHandle {
    id: PadId,
    name: Arc<str>,
    inner: Weak<Inner>,
}

impl PadHandle {
    pub(crate) fn new(id: PadId, name: Arc<str>, inner: Weak<Inner>) -> Self {
        Self { id, name, inner }
    }

    /// Pad identifier.
    pub fn id(&self) -> PadId {
        self.id
    }

    /// Pad name, e.g. `"sink_0"`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Deposit a buffer and wait until the aggregation step consumes it.
    ///
    /// Returns the flow status of the step that consumed the buffer,
    /// `Flushing` if the pad is (or starts) flushing before that, and `Eos`
    /// if the pad already received EOS. Blocks while the slot is occupied.
    pub fn submit(&self, buffer: Buffer) -> FlowStatus {
        match self.inner.upgrade() {
            Some(inner) => inner.submit(self.id, buffer),
            None => FlowStatus::Flushing,
        }
    }

    /// Signal that no more data will arrive on this pad.
    ///
    /// Waits for a pending buffer to be consumed first. Returns `false` if
    /// the pad is flushing or no longer registered.
    pub fn notify_end_of_stream(&self) -> bool {
        self.inner
            .upgrade()
            .is_some_and(|inner| inner.notify_end_of_stream(self.id))
    }

    /// Start flushing: discard the pending buffer and release blocked producers.
    pub fn notify_flush_start(&self) -> bool {
        self.inner
            .upgrade()
            .is_some_and(|inner| inner.flush_start(self.id))
    }

    /// Stop flushing.
    pub fn notify_flush_stop(&self) -> bool {
        self.inner
            .upgrade()
            .is_some_and(|inner| inner.flush_stop(self.id))
    }

    /// Replace the pad's segment.
    pub fn update_timeline(&self, segment: Segment) -> bool {
        self.inner
            .upgrade()
            .is_some_and(|inner| inner.update_timeline(self.id, segment))
    }

    /// Deliver an event arriving from upstream.
    ///
    /// Flush, EOS and segment events map onto the calls above; stream-start
    /// is consumed; anything else goes to the element's `pad_event` hook and,
    /// if unhandled, downstream.
    pub fn send_event(&self, event: Event) -> bool {
        self.inner
            .upgrade()
            .is_some_and(|inner| inner.pad_event(self.id, event))
    }

    /// Answer a query arriving from upstream.
    pub fn query(&self, query: &mut Query) -> bool {
        self.inner
            .upgrade()
            .is_some_and(|inner| inner.pad_query(self.id, query))
    }

    /// Link the element that feeds this pad; it receives forwarded seeks.
    pub fn link_upstream(&self, peer: Arc<dyn UpstreamPeer>) -> bool {
        self.inner
            .upgrade()
            .is_some_and(|inner| inner.set_upstream(self.id, Some(peer)))
    }

    /// Remove the upstream link.
    pub fn unlink_upstream(&self) -> bool {
        self.inner
            .upgrade()
            .is_some_and(|inner| inner.set_upstream(self.id, None))
    }

    /// Check whether the pad is still registered.
    pub fn is_registered(&self) -> bool {
        self.with_port(|_| ()).is_some()
    }

    /// Check whether the pad received EOS.
    pub fn is_eos(&self) -> bool {
        self.with_port(|port| port.slot.is_eos()).unwrap_or(false)
    }

    /// Check whether the pad is flushing. Unregistered pads count as flushing.
    pub fn is_flushing(&self) -> bool {
        self.with_port(|port| port.slot.is_flushing()).unwrap_or(true)
    }

    /// Check whether a buffer is waiting in the pad's slot.
    pub fn has_pending(&self) -> bool {
        self.with_port(|port| port.slot.is_occupied()).unwrap_or(false)
    }

    /// The pad's current segment.
    pub fn segment(&self) -> Option<Segment> {
        self.with_port(|port| port.segment.clone())
    }

    fn with_port<R>(&self, f: impl FnOnce(&Port) -> R) -> Option<R> {
        let inner = self.inner.upgrade()?;
        let guard = inner.lock();
        guard.core.ports.get(&self.id).map(f)
    }
}

impl fmt::Debug for PadHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PadHandle")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

impl PartialEq for PadHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && Weak::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for PadHandle {}
