//! Buffer metadata types.

use crate::clock::ClockTime;

/// Flags indicating buffer properties.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferFlags {
    /// First buffer after a flush or a stream start.
    pub discont: bool,
    /// Buffer contains a sync point (keyframe equivalent).
    pub sync_point: bool,
    /// Buffer is a gap/discontinuity marker.
    pub gap: bool,
}

/// Metadata associated with a buffer.
///
/// Timestamps use [`ClockTime::NONE`] when unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metadata {
    /// Presentation timestamp.
    pub pts: ClockTime,

    /// Duration of this buffer's content.
    pub duration: ClockTime,

    /// Monotonic sequence number within a stream.
    pub sequence: u64,

    /// Byte offset in the original source.
    pub offset: Option<u64>,

    /// Buffer flags.
    pub flags: BufferFlags,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            pts: ClockTime::NONE,
            duration: ClockTime::NONE,
            sequence: 0,
            offset: None,
            flags: BufferFlags::default(),
        }
    }
}

impl Metadata {
    /// Create new metadata with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create metadata with a sequence number.
    pub fn from_sequence(sequence: u64) -> Self {
        Self {
            sequence,
            ..Default::default()
        }
    }

    /// Set the presentation timestamp.
    pub fn with_pts(mut self, pts: ClockTime) -> Self {
        self.pts = pts;
        self
    }

    /// Set the duration.
    pub fn with_duration(mut self, duration: ClockTime) -> Self {
        self.duration = duration;
        self
    }

    /// Set the byte offset.
    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Mark as discontinuous.
    pub fn with_discont(mut self) -> Self {
        self.flags.discont = true;
        self
    }

    /// End timestamp (`pts + duration`), if both are set.
    pub fn end(&self) -> Option<ClockTime> {
        if self.pts.is_some() && self.duration.is_some() {
            Some(self.pts + self.duration)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_defaults_are_unset() {
        let meta = Metadata::new();
        assert!(meta.pts.is_none());
        assert!(meta.duration.is_none());
        assert_eq!(meta.end(), None);
        assert!(!meta.flags.discont);
    }

    #[test]
    fn test_metadata_builder() {
        let meta = Metadata::from_sequence(7)
            .with_pts(ClockTime::from_millis(100))
            .with_duration(ClockTime::from_millis(40))
            .with_offset(4096)
            .with_discont();

        assert_eq!(meta.sequence, 7);
        assert_eq!(meta.end(), Some(ClockTime::from_millis(140)));
        assert_eq!(meta.offset, Some(4096));
        assert!(meta.flags.discont);
    }
}
