//! N-to-1 stream aggregation.
//!
//! An [`Aggregator`] owns any number of request sink pads and one output.
//! Each pad holds at most one pending buffer. Producers hand buffers over
//! with [`PadHandle::submit`] from their own threads and block until the
//! buffer is consumed. A single aggregation thread waits until every pad
//! holds a buffer or reached EOS, then runs the element's
//! [`Aggregate::aggregate`] step.
//!
//! Flushing seeks on the output are forwarded to every pad's upstream peer.
//! The aggregator pauses its thread on the first flush-start that comes
//! back, forwards exactly one flush-start and one flush-stop downstream, and
//! resumes once every pad saw its flush-stop.
//!
//! # Example
//!
//! ```rust
//! use parallax_aggregator::aggregator::Aggregator;
//! use parallax_aggregator::elements::{BufferCombiner, CollectSink};
//! use parallax_aggregator::{Buffer, FlowStatus};
//! use std::sync::Arc;
//! use std::thread;
//!
//! let sink = Arc::new(CollectSink::new());
//! let aggregator = Aggregator::new(BufferCombiner::new());
//! aggregator.link_downstream(sink.clone());
//!
//! let a = aggregator.request_pad(None)?;
//! let b = aggregator.request_pad(None)?;
//! aggregator.activate()?;
//!
//! let producer = thread::spawn(move || a.submit(Buffer::from_bytes(vec![1, 2])));
//! assert_eq!(b.submit(Buffer::from_bytes(vec![3])), FlowStatus::Ok);
//! assert_eq!(producer.join().unwrap(), FlowStatus::Ok);
//!
//! assert_eq!(sink.buffers()[0].as_bytes(), &[1, 2, 3]);
//! aggregator.deactivate();
//! # Ok::<(), parallax_aggregator::Error>(())
//! ```

mod barrier;
mod config;
mod context;
mod coordinator;
mod pad;
mod registry;
mod slot;
mod task;
mod traits;

pub use barrier::BarrierPhase;
pub use config::AggregatorConfig;
pub use context::AggregateContext;
pub use pad::PadHandle;
pub use traits::Aggregate;

use crate::element::{DownstreamPeer, PadId};
use crate::error::Result;
use crate::event::{Event, SeekEvent, Segment};
use crate::flow::FlowStatus;
use crate::observability::{init_metrics, span_aggregator};
use crate::query::Query;
use coordinator::Inner;
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// The aggregation base element.
///
/// Dropping the aggregator deactivates it, which releases every blocked
/// producer and joins the aggregation thread.
pub struct Aggregator {
    inner: Arc<Inner>,
}

impl Aggregator {
    /// Create an aggregator with the default configuration.
    pub fn new(element: impl Aggregate) -> Self {
        Self::build(&AggregatorConfig::default(), Box::new(element))
    }

    /// Create an aggregator with a custom configuration.
    pub fn with_config(config: AggregatorConfig, element: impl Aggregate) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(&config, Box::new(element)))
    }

    fn build(config: &AggregatorConfig, element: Box<dyn Aggregate>) -> Self {
        init_metrics();
        Self {
            inner: Arc::new(Inner::new(config, element)),
        }
    }

    /// Element name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    // ========================================================================
    // Output
    // ========================================================================

    /// Link the element that receives the aggregated output.
    pub fn link_downstream(&self, peer: Arc<dyn DownstreamPeer>) {
        self.inner.set_downstream(Some(peer));
    }

    /// Remove the downstream link. Output then fails with `NotLinked`.
    pub fn unlink_downstream(&self) {
        self.inner.set_downstream(None);
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Clear every pad's flushing state and start the aggregation thread.
    ///
    /// Fails if the aggregator is already active, the element's `start` hook
    /// fails, or the thread cannot be spawned.
    pub fn activate(&self) -> Result<()> {
        let span = span_aggregator(&self.inner.name);
        let _enter = span.enter();
        self.inner.activate()
    }

    /// Set every pad flushing, wake blocked producers and join the
    /// aggregation thread. Does nothing if the aggregator is inactive.
    pub fn deactivate(&self) {
        let span = span_aggregator(&self.inner.name);
        let _enter = span.enter();
        self.inner.deactivate();
    }

    /// Check whether the aggregator is active.
    pub fn is_active(&self) -> bool {
        self.inner.lock().core.active
    }

    // ========================================================================
    // Pads
    // ========================================================================

    /// Create a sink pad, optionally with a specific name such as `"sink_4"`.
    pub fn request_pad(&self, name: Option<&str>) -> Result<PadHandle> {
        self.inner.add_port(name)
    }

    /// Remove a sink pad. A producer blocked on it returns `Flushing`.
    pub fn release_pad(&self, pad: &PadHandle) -> Result<()> {
        self.inner.remove_port(pad.id())
    }

    /// Handles to every registered pad, in creation order.
    pub fn pads(&self) -> Vec<PadHandle> {
        let guard = self.inner.lock();
        guard
            .core
            .ports
            .iter()
            .map(|(id, port)| {
                PadHandle::new(*id, Arc::clone(&port.name), Arc::downgrade(&self.inner))
            })
            .collect()
    }

    /// Handle to a registered pad.
    pub fn pad(&self, id: PadId) -> Option<PadHandle> {
        let guard = self.inner.lock();
        guard
            .core
            .ports
            .get(&id)
            .map(|port| PadHandle::new(id, Arc::clone(&port.name), Arc::downgrade(&self.inner)))
    }

    /// Number of registered pads.
    pub fn pad_count(&self) -> usize {
        self.inner.lock().core.ports.len()
    }

    // ========================================================================
    // Source pad
    // ========================================================================

    /// Deliver an event arriving from downstream.
    ///
    /// Seeks are forwarded to every pad's upstream peer; navigation events
    /// are refused; anything else is forwarded upstream as is.
    pub fn send_src_event(&self, event: Event) -> bool {
        self.inner.src_event(event)
    }

    /// Seek all inputs. Returns `true` only if every linked upstream peer
    /// accepted the seek.
    pub fn seek(&self, seek: SeekEvent) -> bool {
        self.inner.seek(seek)
    }

    /// Answer a query arriving from downstream.
    ///
    /// The aggregated output is never seekable.
    pub fn src_query(&self, query: &mut Query) -> bool {
        self.inner.src_query(query)
    }

    // ========================================================================
    // State
    // ========================================================================

    /// Flow status of the last aggregation step.
    pub fn last_flow_result(&self) -> FlowStatus {
        self.inner.lock().core.last_flow_result
    }

    /// Generation counter, bumped on every readiness-relevant change.
    pub fn generation(&self) -> u64 {
        self.inner.lock().core.generation
    }

    /// Check whether a flushing seek is in progress.
    pub fn is_flush_seeking(&self) -> bool {
        self.inner.lock().core.barrier.is_open()
    }

    /// Phase of the flush barrier.
    pub fn barrier_phase(&self) -> BarrierPhase {
        self.inner.lock().core.barrier.phase()
    }

    /// Current output segment.
    pub fn output_segment(&self) -> Segment {
        self.inner.lock().core.output.segment.clone()
    }
}

impl fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guard = self.inner.lock();
        f.debug_struct("Aggregator")
            .field("name", &self.inner.name)
            .field("active", &guard.core.active)
            .field("pads", &guard.core.ports.len())
            .field("generation", &guard.core.generation)
            .finish()
    }
}

impl Drop for Aggregator {
    fn drop(&mut self) {
        if self.inner.lock().core.active {
            info!(aggregator = %self.inner.name, "dropped while active");
            self.inner.deactivate();
        }
    }
}
