//! Error types for the aggregator.
//!
//! Only structural operations (activation, pad requests, configuration) report
//! errors through [`Error`]. The data path (buffer submission, events) reports
//! through [`FlowStatus`](crate::flow::FlowStatus) and plain booleans, the same
//! way a pipeline pad does.

use crate::element::PadId;
use thiserror::Error;

/// Result type alias using the aggregator's Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for aggregator operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Generic element failure.
    #[error("element error: {0}")]
    Element(String),

    /// Operation not allowed in the current lifecycle state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The pad handle does not belong to a registered pad.
    #[error("pad not found: {0}")]
    PadNotFound(PadId),

    /// A requested pad name does not match the template or was already issued.
    #[error("invalid pad name: {0}")]
    InvalidPadName(String),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error (thread spawning).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
