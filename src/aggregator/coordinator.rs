//! Coordinator state and the producer-side protocol.
//!
//! All pads, their slots, the generation counter and the barrier live in one
//! [`State`] behind one mutex. Producers block on their pad's condition
//! variable (with that same mutex), the aggregation task blocks on
//! `changed`. Every change that may affect readiness bumps `generation`
//! before notifying, so the task never misses a wakeup.

use super::AggregatorConfig;
use super::barrier::FlushBarrier;
use super::pad::Port;
use super::registry::PadRegistry;
use super::task::AggregatorTask;
use super::traits::Aggregate;
use crate::buffer::Buffer;
use crate::element::{DownstreamPeer, PadId, UpstreamPeer};
use crate::error::{Error, Result};
use crate::event::{Event, EventResult, Segment, SegmentFormat};
use crate::flow::FlowStatus;
use crate::observability::{record_buffer_flushed, record_buffer_submitted};
use crate::query::Query;
use std::collections::BTreeMap;
use std::hash::{BuildHasher, RandomState};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, trace, warn};

pub(crate) struct Inner {
    pub(crate) name: String,
    pub(crate) state: Mutex<State>,
    pub(crate) changed: Condvar,
    pub(crate) task: AggregatorTask,
}

pub(crate) struct State {
    pub(crate) core: Core,
    pub(crate) element: Box<dyn Aggregate>,
}

pub(crate) struct Core {
    pub(crate) ports: BTreeMap<PadId, Port>,
    pub(crate) registry: PadRegistry,
    /// Between `activate` and `deactivate`.
    pub(crate) active: bool,
    /// The aggregation task should be looping. Cleared while a flush
    /// barrier holds the task paused.
    pub(crate) running: bool,
    /// Incremented every time `running` is set; identifies one run of the
    /// aggregation task.
    pub(crate) task_epoch: u64,
    pub(crate) generation: u64,
    pub(crate) last_flow_result: FlowStatus,
    pub(crate) barrier: FlushBarrier,
    pub(crate) output: OutputState,
    pub(crate) downstream: Option<Arc<dyn DownstreamPeer>>,
}

impl Core {
    /// Every pad holds a buffer or is EOS, and there is at least one pad.
    pub(crate) fn is_ready(&self) -> bool {
        !self.ports.is_empty() && self.ports.values().all(|port| port.slot.is_ready())
    }

    pub(crate) fn bump(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    pub(crate) fn barrier_settled(&self) -> bool {
        self.ports.values().all(|port| port.barrier.is_settled())
    }
}

/// Source pad state: the output segment and the sticky events still owed
/// downstream.
pub(crate) struct OutputState {
    pub(crate) segment: Segment,
    pub(crate) send_stream_start: bool,
    pub(crate) send_segment: bool,
    stream_id_prefix: String,
    streams: u64,
    hasher: RandomState,
}

impl OutputState {
    fn new(stream_id_prefix: String) -> Self {
        Self {
            segment: Segment::new(SegmentFormat::Time),
            send_stream_start: true,
            send_segment: true,
            stream_id_prefix,
            streams: 0,
            hasher: RandomState::new(),
        }
    }

    pub(crate) fn reset(&mut self) {
        self.segment = Segment::new(SegmentFormat::Time);
        self.send_stream_start = true;
        self.send_segment = true;
    }

    /// Generate a fresh `"{prefix}-{:08x}"` stream id.
    pub(crate) fn next_stream_id(&mut self) -> String {
        self.streams += 1;
        let value = self.hasher.hash_one(self.streams) as u32;
        format!("{}-{:08x}", self.stream_id_prefix, value)
    }
}

/// Push an event to an optional downstream peer.
pub(crate) fn push_downstream(peer: Option<&Arc<dyn DownstreamPeer>>, event: Event) -> bool {
    match peer {
        Some(peer) => peer.event(event),
        None => {
            trace!(event = event.name(), "no downstream peer, dropping event");
            false
        }
    }
}

impl Inner {
    pub(crate) fn new(config: &AggregatorConfig, element: Box<dyn Aggregate>) -> Self {
        Self {
            name: config.name.clone(),
            state: Mutex::new(State {
                core: Core {
                    ports: BTreeMap::new(),
                    registry: PadRegistry::new(config.pad_template()),
                    active: false,
                    running: false,
                    task_epoch: 0,
                    generation: 0,
                    last_flow_result: FlowStatus::Ok,
                    barrier: FlushBarrier::default(),
                    output: OutputState::new(config.stream_id_prefix.clone()),
                    downstream: None,
                },
                element,
            }),
            changed: Condvar::new(),
            task: AggregatorTask::new(config.thread_name()),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait_on<'a>(&self, cond: &Condvar, guard: MutexGuard<'a, State>) -> MutexGuard<'a, State> {
        cond.wait(guard).unwrap_or_else(PoisonError::into_inner)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    pub(crate) fn activate(self: &Arc<Self>) -> Result<()> {
        {
            let mut guard = self.lock();
            let State { core, element } = &mut *guard;
            if core.active {
                return Err(Error::InvalidState(format!(
                    "aggregator '{}' is already active",
                    self.name
                )));
            }
            element.start()?;
            core.active = true;
            core.last_flow_result = FlowStatus::Ok;
            core.barrier.close();
            core.output.reset();
            for port in core.ports.values_mut() {
                port.slot.stop_flush();
                port.barrier.clear();
            }
            core.bump();
        }

        info!(aggregator = %self.name, "activating");
        if let Err(err) = self.task.start(self) {
            warn!(aggregator = %self.name, error = %err, "failed to start aggregation task");
            self.deactivate();
            return Err(err);
        }
        Ok(())
    }

    pub(crate) fn deactivate(&self) {
        {
            let mut guard = self.lock();
            let core = &mut guard.core;
            if !core.active {
                return;
            }
            core.active = false;
            core.running = false;
            core.barrier.close();
            for port in core.ports.values_mut() {
                if port.slot.start_flush().is_some() {
                    record_buffer_flushed(&self.name);
                }
                port.barrier.clear();
                port.waiters.notify_all();
            }
            core.bump();
            self.changed.notify_all();
        }

        info!(aggregator = %self.name, "deactivating, stopping aggregation task");
        self.task.join();

        let mut guard = self.lock();
        let State { core, element } = &mut *guard;
        if let Err(err) = element.stop() {
            warn!(aggregator = %self.name, error = %err, "stop hook failed");
        }
        core.output.reset();
        core.last_flow_result = FlowStatus::Ok;
    }

    /// Allow the task to loop again after a pause.
    ///
    /// Returns `false` if the aggregator is inactive or already running.
    pub(crate) fn mark_running(&self) -> bool {
        let mut guard = self.lock();
        let core = &mut guard.core;
        if !core.active || core.running {
            return false;
        }
        core.running = true;
        core.task_epoch = core.task_epoch.wrapping_add(1);
        core.bump();
        self.changed.notify_all();
        true
    }

    pub(crate) fn is_running(&self) -> bool {
        self.lock().core.running
    }

    pub(crate) fn resume_task(self: &Arc<Self>) {
        info!(aggregator = %self.name, "resuming aggregation task");
        if let Err(err) = self.task.start(self) {
            warn!(aggregator = %self.name, error = %err, "failed to restart aggregation task");
        }
    }

    // ========================================================================
    // Producer side
    // ========================================================================

    pub(crate) fn submit(&self, pad: PadId, buffer: Buffer) -> FlowStatus {
        let mut guard = self.lock();
        let (epoch, waiters) = match guard.core.ports.get(&pad) {
            None => return FlowStatus::Flushing,
            Some(port) if port.slot.is_flushing() => {
                debug!(aggregator = %self.name, pad = %port.name, "pad is flushing, refusing buffer");
                return FlowStatus::Flushing;
            }
            Some(port) if port.slot.is_eos() => {
                debug!(aggregator = %self.name, pad = %port.name, "pad is EOS, refusing buffer");
                return FlowStatus::Eos;
            }
            Some(port) => (port.slot.flush_epoch(), Arc::clone(&port.waiters)),
        };

        loop {
            match guard.core.ports.get(&pad) {
                Some(port) if port.slot.flush_epoch() == epoch => {
                    if !port.slot.is_occupied() {
                        break;
                    }
                    trace!(aggregator = %self.name, pad = %port.name, "waiting for free slot");
                }
                _ => return FlowStatus::Flushing,
            }
            guard = self.wait_on(&waiters, guard);
        }

        let core = &mut guard.core;
        let Some(port) = core.ports.get_mut(&pad) else {
            return FlowStatus::Flushing;
        };
        port.slot.store(buffer);
        let ticket = port.slot.consumed() + 1;
        trace!(aggregator = %self.name, pad = %port.name, "buffer queued");
        core.bump();
        record_buffer_submitted(&self.name);
        self.changed.notify_one();

        loop {
            guard = self.wait_on(&waiters, guard);
            match guard.core.ports.get(&pad) {
                Some(port) if port.slot.flush_epoch() == epoch => {
                    if port.slot.consumed() >= ticket {
                        return guard.core.last_flow_result;
                    }
                }
                _ => return FlowStatus::Flushing,
            }
        }
    }

    pub(crate) fn notify_end_of_stream(&self, pad: PadId) -> bool {
        let mut guard = self.lock();
        let (epoch, waiters) = match guard.core.ports.get(&pad) {
            Some(port) if !port.slot.is_flushing() => {
                (port.slot.flush_epoch(), Arc::clone(&port.waiters))
            }
            _ => return false,
        };

        loop {
            match guard.core.ports.get(&pad) {
                Some(port) if port.slot.flush_epoch() == epoch => {
                    if !port.slot.is_occupied() {
                        break;
                    }
                    trace!(aggregator = %self.name, pad = %port.name, "waiting for slot to drain before EOS");
                }
                _ => return false,
            }
            guard = self.wait_on(&waiters, guard);
        }

        let core = &mut guard.core;
        let Some(port) = core.ports.get_mut(&pad) else {
            return false;
        };
        port.slot.set_eos();
        debug!(aggregator = %self.name, pad = %port.name, "EOS");
        core.bump();
        self.changed.notify_one();
        true
    }

    pub(crate) fn update_timeline(&self, pad: PadId, segment: Segment) -> bool {
        let mut guard = self.lock();
        match guard.core.ports.get_mut(&pad) {
            Some(port) => {
                trace!(aggregator = %self.name, pad = %port.name, ?segment, "segment updated");
                port.segment = segment;
                true
            }
            None => false,
        }
    }

    /// Route an event arriving on a sink pad.
    pub(crate) fn pad_event(self: &Arc<Self>, pad: PadId, event: Event) -> bool {
        match event {
            Event::FlushStart => self.flush_start(pad),
            Event::FlushStop(_) => self.flush_stop(pad),
            Event::Eos => self.notify_end_of_stream(pad),
            Event::Segment(segment) => self.update_timeline(pad, segment),
            Event::StreamStart(_) => self.lock().core.ports.contains_key(&pad),
            other => {
                let mut guard = self.lock();
                let State { core, element } = &mut *guard;
                if !core.ports.contains_key(&pad) {
                    return false;
                }
                match element.pad_event(pad, &other) {
                    EventResult::Handled => true,
                    EventResult::Error => false,
                    EventResult::NotHandled => {
                        let downstream = core.downstream.clone();
                        drop(guard);
                        debug!(aggregator = %self.name, event = other.name(), "forwarding event downstream");
                        push_downstream(downstream.as_ref(), other)
                    }
                }
            }
        }
    }

    pub(crate) fn pad_query(&self, pad: PadId, query: &mut Query) -> bool {
        let mut guard = self.lock();
        let State { core, element } = &mut *guard;
        if !core.ports.contains_key(&pad) {
            return false;
        }
        match query {
            Query::Seeking(seeking) => {
                seeking.set_not_seekable();
                true
            }
            other => element.pad_query(pad, other),
        }
    }

    pub(crate) fn src_query(&self, query: &mut Query) -> bool {
        match query {
            Query::Seeking(seeking) => {
                seeking.set_not_seekable();
                true
            }
            other => self.lock().element.src_query(other),
        }
    }

    // ========================================================================
    // Peers
    // ========================================================================

    pub(crate) fn set_downstream(&self, peer: Option<Arc<dyn DownstreamPeer>>) {
        self.lock().core.downstream = peer;
    }

    pub(crate) fn set_upstream(&self, pad: PadId, peer: Option<Arc<dyn UpstreamPeer>>) -> bool {
        match self.lock().core.ports.get_mut(&pad) {
            Some(port) => {
                port.upstream = peer;
                true
            }
            None => false,
        }
    }

    /// Snapshot of every pad's upstream peer, in pad order.
    pub(crate) fn upstream_peers(&self) -> Vec<(PadId, Option<Arc<dyn UpstreamPeer>>)> {
        self.lock()
            .core
            .ports
            .iter()
            .map(|(id, port)| (*id, port.upstream.clone()))
            .collect()
    }
}
