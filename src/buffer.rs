//! Buffer type carried through the aggregator.
//!
//! A [`Buffer`] is the unit of data a producer deposits into a pad's slot and
//! the unit the aggregation step emits downstream. The payload is a
//! reference-counted [`Bytes`], so cloning a buffer never copies data.

use crate::clock::ClockTime;
use crate::metadata::Metadata;
use bytes::Bytes;

/// An immutable payload plus its metadata.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Buffer {
    data: Bytes,
    metadata: Metadata,
}

impl Buffer {
    /// Create a buffer from a payload and metadata.
    pub fn new(data: impl Into<Bytes>, metadata: Metadata) -> Self {
        Self {
            data: data.into(),
            metadata,
        }
    }

    /// Create a buffer with default metadata.
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self::new(data, Metadata::default())
    }

    /// Create an empty buffer.
    pub fn empty() -> Self {
        Self::new(Bytes::new(), Metadata::default())
    }

    /// Payload bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Payload handle (cheap clone).
    #[inline]
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Payload length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the payload is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Buffer metadata.
    #[inline]
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Mutable buffer metadata.
    #[inline]
    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    /// Presentation timestamp.
    #[inline]
    pub fn pts(&self) -> ClockTime {
        self.metadata.pts
    }

    /// Duration.
    #[inline]
    pub fn duration(&self) -> ClockTime {
        self.metadata.duration
    }

    /// Split into payload and metadata.
    pub fn into_parts(self) -> (Bytes, Metadata) {
        (self.data, self.metadata)
    }
}
