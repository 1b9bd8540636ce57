//! CollectSink: a downstream peer that records everything it receives.

use crate::buffer::Buffer;
use crate::element::DownstreamPeer;
use crate::event::{Event, Segment};
use crate::flow::FlowStatus;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Everything a [`CollectSink`] received so far.
#[derive(Debug, Default, Clone)]
pub struct Collected {
    /// Buffers, in arrival order (empty if the sink only counts).
    pub buffers: Vec<Buffer>,
    /// Number of buffers received.
    pub buffer_count: u64,
    /// Events other than flush-start / flush-stop, in arrival order.
    pub events: Vec<Event>,
    /// Number of flush-start events received.
    pub flush_starts: usize,
    /// Number of flush-stop events received.
    pub flush_stops: usize,
}

impl Collected {
    /// Number of EOS events received.
    pub fn eos_count(&self) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, Event::Eos))
            .count()
    }
}

/// A [`DownstreamPeer`] that records buffers and events for inspection.
///
/// Replies to buffers with a configurable [`FlowStatus`] (default `Ok`) and
/// to events with a configurable acceptance flag (default `true`).
///
/// # Example
///
/// ```rust
/// use parallax_aggregator::element::DownstreamPeer;
/// use parallax_aggregator::elements::CollectSink;
/// use parallax_aggregator::{Buffer, Event, FlowStatus};
///
/// let sink = CollectSink::new();
/// assert_eq!(sink.chain(Buffer::from_bytes(vec![1])), FlowStatus::Ok);
/// assert!(sink.event(Event::FlushStart));
/// assert_eq!(sink.buffer_count(), 1);
/// assert_eq!(sink.flush_start_count(), 1);
/// ```
#[derive(Debug)]
pub struct CollectSink {
    state: Mutex<SinkState>,
    changed: Condvar,
}

#[derive(Debug)]
struct SinkState {
    collected: Collected,
    keep_buffers: bool,
    reply: FlowStatus,
    accept_events: bool,
}

impl CollectSink {
    /// Create a sink that stores every buffer.
    pub fn new() -> Self {
        Self::build(true)
    }

    /// Create a sink that only counts buffers.
    pub fn counting() -> Self {
        Self::build(false)
    }

    fn build(keep_buffers: bool) -> Self {
        Self {
            state: Mutex::new(SinkState {
                collected: Collected::default(),
                keep_buffers,
                reply: FlowStatus::Ok,
                accept_events: true,
            }),
            changed: Condvar::new(),
        }
    }

    /// Set the status returned for every buffer.
    pub fn with_reply(self, reply: FlowStatus) -> Self {
        self.set_reply(reply);
        self
    }

    fn lock(&self) -> MutexGuard<'_, SinkState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Change the status returned for buffers.
    pub fn set_reply(&self, reply: FlowStatus) {
        self.lock().reply = reply;
    }

    /// Change whether events are accepted.
    pub fn set_accept_events(&self, accept: bool) {
        self.lock().accept_events = accept;
    }

    /// Snapshot of everything received.
    pub fn collected(&self) -> Collected {
        self.lock().collected.clone()
    }

    /// Buffers received so far.
    pub fn buffers(&self) -> Vec<Buffer> {
        self.lock().collected.buffers.clone()
    }

    /// Number of buffers received.
    pub fn buffer_count(&self) -> u64 {
        self.lock().collected.buffer_count
    }

    /// Events received so far, flush events excluded.
    pub fn events(&self) -> Vec<Event> {
        self.lock().collected.events.clone()
    }

    /// Names of the received events, flush events excluded.
    pub fn event_names(&self) -> Vec<String> {
        self.lock()
            .collected
            .events
            .iter()
            .map(|event| event.name().to_string())
            .collect()
    }

    /// Segments received so far.
    pub fn segments(&self) -> Vec<Segment> {
        self.lock()
            .collected
            .events
            .iter()
            .filter_map(|event| match event {
                Event::Segment(segment) => Some(segment.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of EOS events received.
    pub fn eos_count(&self) -> usize {
        self.lock().collected.eos_count()
    }

    /// Number of flush-start events received.
    pub fn flush_start_count(&self) -> usize {
        self.lock().collected.flush_starts
    }

    /// Number of flush-stop events received.
    pub fn flush_stop_count(&self) -> usize {
        self.lock().collected.flush_stops
    }

    /// Forget everything received.
    pub fn clear(&self) {
        self.lock().collected = Collected::default();
    }

    /// Wait until `condition` holds or `timeout` elapses.
    ///
    /// Returns whether the condition held.
    pub fn wait_until(
        &self,
        timeout: Duration,
        mut condition: impl FnMut(&Collected) -> bool,
    ) -> bool {
        let deadline = Instant::now() + timeout;
        let mut guard = self.lock();
        loop {
            if condition(&guard.collected) {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            guard = self
                .changed
                .wait_timeout(guard, deadline - now)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|poisoned| poisoned.into_inner().0);
        }
    }

    /// Wait until at least `count` buffers arrived.
    pub fn wait_for_buffers(&self, count: u64, timeout: Duration) -> bool {
        self.wait_until(timeout, |c| c.buffer_count >= count)
    }

    /// Wait until an EOS event arrived.
    pub fn wait_for_eos(&self, timeout: Duration) -> bool {
        self.wait_until(timeout, |c| c.eos_count() > 0)
    }

    /// Wait until at least `count` flush-stop events arrived.
    pub fn wait_for_flush_stops(&self, count: usize, timeout: Duration) -> bool {
        self.wait_until(timeout, |c| c.flush_stops >= count)
    }
}

impl Default for CollectSink {
    fn default() -> Self {
        Self::new()
    }
}

impl DownstreamPeer for CollectSink {
    fn chain(&self, buffer: Buffer) -> FlowStatus {
        let mut state = self.lock();
        state.collected.buffer_count += 1;
        if state.keep_buffers {
            state.collected.buffers.push(buffer);
        }
        let reply = state.reply;
        drop(state);
        self.changed.notify_all();
        reply
    }

    fn event(&self, event: Event) -> bool {
        let mut state = self.lock();
        match event {
            Event::FlushStart => state.collected.flush_starts += 1,
            Event::FlushStop(_) => state.collected.flush_stops += 1,
            other => state.collected.events.push(other),
        }
        let accept = state.accept_events;
        drop(state);
        self.changed.notify_all();
        accept
    }
}
