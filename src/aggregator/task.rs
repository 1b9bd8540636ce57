//! The aggregation task: one dedicated thread per aggregator.
//!
//! The thread loops while `running` is set. Pausing (flush barrier) and
//! stopping (deactivation) both clear `running` and join the thread; resuming
//! spawns a fresh one. Starts and joins are serialized by the handle mutex,
//! so at most one aggregation thread exists at any time.

use super::context::AggregateContext;
use super::coordinator::{Inner, State};
use crate::error::{Error, Result};
use crate::flow::FlowStatus;
use crate::observability::{record_aggregation, record_flow_error, span_aggregate_task};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Instant;
use tracing::{debug, error, trace, warn};

pub(crate) struct AggregatorTask {
    thread_name: String,
    handle: Mutex<Option<JoinHandle<()>>>,
    thread_id: Mutex<Option<ThreadId>>,
}

impl AggregatorTask {
    pub(crate) fn new(thread_name: String) -> Self {
        Self {
            thread_name,
            handle: Mutex::new(None),
            thread_id: Mutex::new(None),
        }
    }

    fn handle(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.handle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Check whether the caller is the aggregation thread itself.
    pub(crate) fn is_current(&self) -> bool {
        let id = *self.thread_id.lock().unwrap_or_else(PoisonError::into_inner);
        id == Some(thread::current().id())
    }

    /// Start (or restart) the aggregation thread.
    ///
    /// Does nothing if the aggregator is inactive or the task already runs.
    /// Called from the aggregation thread itself, it only re-arms `running`
    /// so the current loop keeps going.
    pub(crate) fn start(&self, inner: &Arc<Inner>) -> Result<()> {
        if self.is_current() {
            inner.mark_running();
            return Ok(());
        }

        let mut handle = self.handle();
        if let Some(old) = handle.take() {
            if inner.is_running() {
                *handle = Some(old);
                return Ok(());
            }
            if old.join().is_err() {
                error!(aggregator = %inner.name, "aggregation task panicked");
            }
        }

        if !inner.mark_running() {
            return Ok(());
        }

        let worker = Arc::clone(inner);
        match thread::Builder::new()
            .name(self.thread_name.clone())
            .spawn(move || worker.run())
        {
            Ok(spawned) => {
                *self.thread_id.lock().unwrap_or_else(PoisonError::into_inner) =
                    Some(spawned.thread().id());
                *handle = Some(spawned);
                debug!(aggregator = %inner.name, thread = %self.thread_name, "aggregation task started");
                Ok(())
            }
            Err(err) => {
                inner.lock().core.running = false;
                Err(Error::Io(err))
            }
        }
    }

    /// Wait for the aggregation thread to exit.
    ///
    /// The caller must have cleared `running` first. A join requested from
    /// the aggregation thread itself is skipped; that thread exits on its
    /// own once the current step returns.
    pub(crate) fn join(&self) {
        if self.is_current() {
            trace!(thread = %self.thread_name, "join requested from the aggregation thread");
            return;
        }
        let handle = self.handle().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                error!(thread = %self.thread_name, "aggregation task panicked");
            }
        }
    }

    /// Wait for the run of the task that was paused at `epoch` to exit.
    ///
    /// If the task was restarted since (`task_epoch` moved on), the stored
    /// handle belongs to the new run and is left alone.
    pub(crate) fn join_paused(&self, inner: &Inner, epoch: u64) {
        if self.is_current() {
            trace!(thread = %self.thread_name, "pause requested from the aggregation thread");
            return;
        }
        let handle = {
            let mut handle = self.handle();
            if inner.lock().core.task_epoch != epoch {
                debug!(aggregator = %inner.name, "task already resumed, not joining");
                return;
            }
            handle.take()
        };
        if let Some(handle) = handle {
            if handle.join().is_err() {
                error!(thread = %self.thread_name, "aggregation task panicked");
            }
        }
    }
}

impl Inner {
    /// Body of the aggregation thread.
    fn run(self: Arc<Self>) {
        let span = span_aggregate_task(&self.name);
        let _enter = span.enter();

        let mut guard = self.lock();
        let mut seen = guard.core.generation.wrapping_sub(1);
        loop {
            while guard.core.running && seen == guard.core.generation {
                guard = self
                    .changed
                    .wait(guard)
                    .unwrap_or_else(PoisonError::into_inner);
            }
            if !guard.core.running {
                break;
            }
            seen = guard.core.generation;

            if guard.core.is_ready() {
                self.aggregate_once(&mut guard);
            }
        }
        drop(guard);
        debug!(aggregator = %self.name, "aggregation task stopped");
    }

    /// Run one aggregation step. The caller holds the coordinator lock and
    /// has checked readiness.
    fn aggregate_once(&self, guard: &mut MutexGuard<'_, State>) {
        let State { core, element } = &mut **guard;
        trace!(aggregator = %self.name, "aggregating");

        let started = Instant::now();
        let mut status = {
            let mut ctx = AggregateContext::new(core, &self.name);
            element.aggregate(&mut ctx)
        };
        record_aggregation(&self.name, started.elapsed());

        if status == FlowStatus::Flushing && core.barrier.is_open() {
            status = FlowStatus::Ok;
        }
        if status.is_error() {
            warn!(aggregator = %self.name, flow = %status, "aggregation failed");
            record_flow_error(&self.name, status);
        }
        trace!(aggregator = %self.name, flow = %status, "aggregation done");
        core.last_flow_result = status;
    }
}
