//! # Parallax Aggregator
//!
//! N-to-1 stream aggregation for Parallax pipelines.
//!
//! An [`Aggregator`] collects buffers from any number of dynamically
//! requested sink pads, each fed by its own producer thread, and runs one
//! aggregation step whenever every pad holds a buffer or reached EOS. The
//! step itself is supplied by an [`Aggregate`] implementation.
//!
//! ## Features
//!
//! - **Single-slot pads**: one pending buffer per pad, producers block
//!   until it is consumed
//! - **One aggregation thread**: woken through a generation counter, so no
//!   readiness change is ever missed
//! - **Flushing seeks**: fanned out to every input, with exactly one
//!   flush-start / flush-stop pair forwarded downstream
//! - **Dynamic pads**: add or remove inputs while data flows
//!
//! ## Quick Start
//!
//! ```rust
//! use parallax_aggregator::prelude::*;
//! use std::sync::Arc;
//!
//! let sink = Arc::new(CollectSink::new());
//! let aggregator = Aggregator::new(BufferCombiner::new());
//! aggregator.link_downstream(sink.clone());
//!
//! let pad = aggregator.request_pad(None)?;
//! aggregator.activate()?;
//!
//! assert_eq!(pad.submit(Buffer::from_bytes(vec![1, 2, 3])), FlowStatus::Ok);
//! assert!(pad.notify_end_of_stream());
//! assert!(sink.wait_for_eos(std::time::Duration::from_secs(5)));
//! # Ok::<(), parallax_aggregator::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod aggregator;
pub mod buffer;
pub mod clock;
pub mod element;
pub mod elements;
pub mod error;
pub mod event;
pub mod flow;
pub mod metadata;
pub mod observability;
pub mod query;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::aggregator::{
        Aggregate, AggregateContext, Aggregator, AggregatorConfig, PadHandle,
    };
    pub use crate::buffer::Buffer;
    pub use crate::clock::ClockTime;
    pub use crate::element::{DownstreamPeer, PadId, UpstreamPeer};
    pub use crate::elements::{BufferCombiner, CollectSink, TestUpstream};
    pub use crate::error::{Error, Result};
    pub use crate::event::{Event, SeekEvent, SeekFlags, Segment};
    pub use crate::flow::FlowStatus;
    pub use crate::metadata::Metadata;
}

pub use aggregator::{Aggregate, Aggregator, PadHandle};
pub use buffer::Buffer;
pub use clock::ClockTime;
pub use error::{Error, Result};
pub use event::Event;
pub use flow::FlowStatus;
pub use metadata::Metadata;
