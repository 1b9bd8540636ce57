//! Peers for driving an aggregator in tests and benchmarks.
//!
//! - [`CollectSink`]: downstream peer recording buffers and events
//! - [`TestUpstream`]: upstream peer recording events, with an optional reaction

mod collect;
mod upstream;

pub use collect::{CollectSink, Collected};
pub use upstream::TestUpstream;
