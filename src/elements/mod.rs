//! Built-in elements.
//!
//! ## Aggregators
//! - [`BufferCombiner`]: concatenates one buffer per pad into one output
//!
//! ## Testing
//! - [`CollectSink`]: records everything pushed downstream
//! - [`TestUpstream`]: records events sent upstream

mod combine;
pub mod testing;

pub use combine::BufferCombiner;
pub use testing::{CollectSink, Collected, TestUpstream};
