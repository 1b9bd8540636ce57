//! Flush barrier opened by a flushing seek.
//!
//! ```text
//! Idle ──seek(FLUSH)──> AwaitingFlushStart ──first flush-start──> Flushing
//!  ^                                                                 │
//!  └────────────── flush-stop seen on every pad ─────────────────────┘
//! ```
//!
//! While the barrier is open every pad tracks its own progress through
//! `pending_flush_start` / `pending_flush_stop`; the barrier closes once no
//! pad has either flag set.

use super::coordinator::{Inner, State, push_downstream};
use crate::element::PadId;
use crate::event::{Event, FlushStopEvent, SeekEvent};
use crate::observability::{record_buffer_flushed, record_seek, span_seek};
use std::sync::{Arc, MutexGuard};
use tracing::{debug, info, trace, warn};

/// Phase of the barrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarrierPhase {
    /// No flushing seek in progress.
    Idle,
    /// Seek forwarded upstream, no flush-start seen yet.
    AwaitingFlushStart,
    /// Flush-start forwarded downstream and aggregation paused.
    Flushing,
}

/// Coordinator-wide barrier state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct FlushBarrier {
    seek_in_progress: bool,
    flush_start_pending: bool,
}

impl FlushBarrier {
    pub(crate) fn phase(&self) -> BarrierPhase {
        match (self.seek_in_progress, self.flush_start_pending) {
            (false, _) => BarrierPhase::Idle,
            (true, true) => BarrierPhase::AwaitingFlushStart,
            (true, false) => BarrierPhase::Flushing,
        }
    }

    #[inline]
    pub(crate) fn is_open(&self) -> bool {
        self.seek_in_progress
    }

    /// Open for a new flushing seek.
    pub(crate) fn open(&mut self) {
        self.seek_in_progress = true;
        self.flush_start_pending = true;
    }

    /// Claim the right to forward the cycle's flush-start.
    ///
    /// Returns `true` exactly once per open barrier.
    pub(crate) fn claim_flush_start(&mut self) -> bool {
        if self.seek_in_progress && self.flush_start_pending {
            self.flush_start_pending = false;
            true
        } else {
            false
        }
    }

    /// Close the barrier.
    ///
    /// Returns `true` if a flush-start was forwarded during this cycle, in
    /// which case the matching flush-stop must be forwarded too.
    pub(crate) fn close(&mut self) -> bool {
        let forwarded = self.phase() == BarrierPhase::Flushing;
        self.seek_in_progress = false;
        self.flush_start_pending = false;
        forwarded
    }
}

/// Per-pad barrier sub-state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct PadBarrier {
    pub(crate) pending_flush_start: bool,
    pub(crate) pending_flush_stop: bool,
}

impl PadBarrier {
    /// Expect a flush-start on this pad.
    pub(crate) fn arm(&mut self) {
        self.pending_flush_start = true;
        self.pending_flush_stop = false;
    }

    /// A flush-start arrived: now expect the flush-stop.
    pub(crate) fn on_flush_start(&mut self) {
        if self.pending_flush_start {
            self.pending_flush_start = false;
            self.pending_flush_stop = true;
        }
    }

    pub(crate) fn on_flush_stop(&mut self) {
        self.pending_flush_stop = false;
    }

    pub(crate) fn clear(&mut self) {
        *self = Self::default();
    }

    /// Nothing outstanding on this pad.
    #[inline]
    pub(crate) fn is_settled(&self) -> bool {
        !self.pending_flush_start && !self.pending_flush_stop
    }
}

impl Inner {
    /// Flush-start on a sink pad.
    ///
    /// The first flush-start of a seek cycle pauses the aggregation task and
    /// is forwarded downstream; all others are absorbed.
    pub(crate) fn flush_start(self: &Arc<Self>, pad: PadId) -> bool {
        let mut guard = self.lock();
        let core = &mut guard.core;
        let Some(port) = core.ports.get_mut(&pad) else {
            return false;
        };

        if port.slot.start_flush().is_some() {
            record_buffer_flushed(&self.name);
        }
        port.barrier.on_flush_start();
        port.waiters.notify_all();
        debug!(aggregator = %self.name, pad = %port.name, "flush-start");
        core.bump();

        if !core.barrier.claim_flush_start() {
            trace!(aggregator = %self.name, "flush-start absorbed");
            return true;
        }

        core.running = false;
        let paused = core.task_epoch;
        core.output.send_segment = true;
        core.output.segment.position = core.output.segment.start;
        self.changed.notify_all();
        let downstream = core.downstream.clone();
        drop(guard);

        info!(aggregator = %self.name, "flushing seek: pausing aggregation task, forwarding flush-start");
        if !push_downstream(downstream.as_ref(), Event::FlushStart) {
            debug!(aggregator = %self.name, "downstream refused flush-start");
        }
        self.task.join_paused(self, paused);
        true
    }

    /// Flush-stop on a sink pad.
    ///
    /// During a seek cycle the last outstanding flush-stop closes the barrier.
    pub(crate) fn flush_stop(self: &Arc<Self>, pad: PadId) -> bool {
        let mut guard = self.lock();
        let State { core, element } = &mut *guard;
        let Some(port) = core.ports.get_mut(&pad) else {
            return false;
        };

        port.slot.stop_flush();
        debug!(aggregator = %self.name, pad = %port.name, "flush-stop");
        element.pad_flush(pad);

        if core.barrier.is_open() {
            port.barrier.on_flush_stop();
            self.maybe_close_barrier(guard);
        }
        true
    }

    /// Close the barrier if no pad has a flush-start or flush-stop outstanding.
    pub(crate) fn maybe_close_barrier(self: &Arc<Self>, mut guard: MutexGuard<'_, State>) {
        let State { core, element } = &mut *guard;
        if !core.barrier.is_open() || !core.barrier_settled() {
            return;
        }

        let forwarded = core.barrier.close();
        core.output.send_segment = true;
        let status = element.flush();
        if !status.is_ok() {
            warn!(aggregator = %self.name, flow = %status, "flush hook failed");
        }
        let downstream = core.downstream.clone();
        drop(guard);

        info!(aggregator = %self.name, "flush barrier closed");
        if forwarded {
            push_downstream(
                downstream.as_ref(),
                Event::FlushStop(FlushStopEvent::default()),
            );
            self.resume_task();
        }
    }

    /// Abandon an open barrier after a failed seek.
    ///
    /// If the flush-start already went downstream, the matching flush-stop
    /// follows and the task resumes.
    pub(crate) fn abort_barrier(self: &Arc<Self>) {
        let mut guard = self.lock();
        let core = &mut guard.core;
        if !core.barrier.is_open() {
            return;
        }
        let forwarded = core.barrier.close();
        for port in core.ports.values_mut() {
            port.barrier.clear();
        }
        warn!(aggregator = %self.name, forwarded, "seek failed, aborting flush barrier");
        if !forwarded {
            return;
        }

        core.output.send_segment = true;
        let downstream = core.downstream.clone();
        drop(guard);

        push_downstream(
            downstream.as_ref(),
            Event::FlushStop(FlushStopEvent::default()),
        );
        self.resume_task();
    }

    /// Handle a seek arriving on the source pad.
    pub(crate) fn seek(self: &Arc<Self>, seek: SeekEvent) -> bool {
        let flushing = seek.is_flushing();
        let span = span_seek(&self.name, flushing);
        let _enter = span.enter();
        record_seek(&self.name, flushing);

        let peers = {
            let mut guard = self.lock();
            let core = &mut guard.core;
            if flushing {
                core.barrier.open();
                for port in core.ports.values_mut() {
                    port.barrier.arm();
                }
            }
            let applied = core.output.segment.do_seek(
                seek.rate,
                seek.format,
                seek.flags,
                seek.start.seek_type,
                seek.start.position,
                seek.stop.seek_type,
                seek.stop.position,
            );
            if !applied {
                debug!(aggregator = %self.name, "seek does not apply to the output segment");
            }
            core.ports
                .iter()
                .map(|(id, port)| (*id, port.upstream.clone()))
                .collect::<Vec<_>>()
        };

        if peers.is_empty() {
            warn!(aggregator = %self.name, "seek with no sink pads");
            if flushing {
                self.abort_barrier();
            }
            return false;
        }

        let mut result = true;
        for (pad, peer) in peers {
            let accepted = match &peer {
                Some(peer) => peer.event(Event::Seek(seek.clone())),
                None => true,
            };
            if !accepted || peer.is_none() {
                // This branch will never flush; don't wait for it.
                if let Some(port) = self.lock().core.ports.get_mut(&pad) {
                    port.barrier.clear();
                }
            }
            if !accepted {
                debug!(aggregator = %self.name, pad = %pad, "seek refused upstream");
            }
            result &= accepted;
        }

        if flushing {
            if result {
                let guard = self.lock();
                self.maybe_close_barrier(guard);
            } else {
                self.abort_barrier();
            }
        }

        info!(aggregator = %self.name, result, "seek handled");
        result
    }

    /// Handle an event arriving on the source pad.
    pub(crate) fn src_event(self: &Arc<Self>, event: Event) -> bool {
        match event {
            Event::Seek(seek) => self.seek(seek),
            Event::Navigation(_) => {
                debug!(aggregator = %self.name, "navigation events are not supported");
                false
            }
            other if !other.is_upstream() => {
                debug!(aggregator = %self.name, event = other.name(), "downstream event on the source pad");
                false
            }
            other => {
                let peers = self.upstream_peers();
                if peers.is_empty() {
                    return false;
                }
                peers.into_iter().fold(true, |ok, (_, peer)| {
                    peer.is_none_or(|peer| peer.event(other.clone())) && ok
                })
            }
        }
    }
}
