//! Segment timeline.
//!
//! A [`Segment`] maps stream positions to running time. Each sink pad keeps
//! the segment of its most recent segment event; the aggregator keeps one
//! more for its output and repositions it when a seek arrives.

use super::{SeekFlags, SeekType};
use crate::clock::ClockTime;

/// Format of segment positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SegmentFormat {
    /// Positions in nanoseconds.
    #[default]
    Time,
    /// Positions in bytes.
    Bytes,
    /// Element-specific default format.
    Default,
}

/// Flags for segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SegmentFlags(u32);

impl SegmentFlags {
    /// No special flags.
    pub const NONE: Self = Self(0);
    /// Running time was reset to 0 by a flushing seek.
    pub const RESET: Self = Self(1 << 0);
    /// Skip to position (don't play intermediate data).
    pub const SKIP: Self = Self(1 << 1);
    /// This is a segment seek.
    pub const SEGMENT: Self = Self(1 << 2);

    /// Create empty flags.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Check if empty.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Check if contains a flag.
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Union of flags.
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

/// A playback segment.
///
/// `stop` and `duration` are `None` when unbounded or unknown.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// Format of all positions in this segment.
    pub format: SegmentFormat,
    /// Segment flags.
    pub flags: SegmentFlags,
    /// Playback rate (1.0 = normal speed, negative = reverse).
    pub rate: f64,
    /// Rate already applied upstream.
    pub applied_rate: f64,
    /// Running time of `start`.
    pub base: u64,
    /// First position of the segment.
    pub start: u64,
    /// Last position of the segment.
    pub stop: Option<u64>,
    /// Stream time of `start`.
    pub time: u64,
    /// Current position.
    pub position: u64,
    /// Total stream duration, if known.
    pub duration: Option<u64>,
}

impl Default for Segment {
    fn default() -> Self {
        Self::new(SegmentFormat::Time)
    }
}

impl Segment {
    /// Create an empty segment in the given format.
    pub fn new(format: SegmentFormat) -> Self {
        Self {
            format,
            flags: SegmentFlags::empty(),
            rate: 1.0,
            applied_rate: 1.0,
            base: 0,
            start: 0,
            stop: None,
            time: 0,
            position: 0,
            duration: None,
        }
    }

    /// Create a time segment covering `[start, stop]`.
    pub fn new_time(start: ClockTime, stop: Option<ClockTime>) -> Self {
        Self {
            start: start.nanos(),
            stop: stop.map(ClockTime::nanos),
            time: start.nanos(),
            position: start.nanos(),
            ..Self::new(SegmentFormat::Time)
        }
    }

    /// Create a byte segment covering `[start, stop]`.
    pub fn new_bytes(start: u64, stop: Option<u64>) -> Self {
        Self {
            start,
            stop,
            time: start,
            position: start,
            ..Self::new(SegmentFormat::Bytes)
        }
    }

    /// Reset to an empty segment, keeping the format.
    pub fn reset(&mut self) {
        *self = Self::new(self.format);
    }

    /// Set the playback rate.
    pub fn with_rate(mut self, rate: f64) -> Self {
        self.rate = rate;
        self
    }

    /// Set the total duration.
    pub fn with_duration(mut self, duration: u64) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Check if `position` lies inside `[start, stop]`.
    pub fn contains(&self, position: u64) -> bool {
        position >= self.start && self.stop.is_none_or(|stop| position <= stop)
    }

    /// Convert a stream position to running time.
    ///
    /// Returns `None` for positions outside the segment and for reverse
    /// playback without a stop position.
    pub fn to_running_time(&self, position: u64) -> Option<u64> {
        if !self.contains(position) {
            return None;
        }
        let abs_rate = self.rate.abs();
        let elapsed = if self.rate > 0.0 {
            position - self.start
        } else {
            self.stop? - position
        };
        let scaled = if abs_rate == 1.0 {
            elapsed
        } else {
            (elapsed as f64 / abs_rate) as u64
        };
        Some(self.base.saturating_add(scaled))
    }

    /// Reposition the segment for a seek.
    ///
    /// Returns `false` and leaves the segment untouched when the seek cannot
    /// be applied: zero rate, a format mismatch, an end-relative position
    /// without a known duration, or a start past the stop.
    #[allow(clippy::too_many_arguments)]
    pub fn do_seek(
        &mut self,
        rate: f64,
        format: SegmentFormat,
        flags: SeekFlags,
        start_type: SeekType,
        start: i64,
        stop_type: SeekType,
        stop: i64,
    ) -> bool {
        if rate == 0.0 || format != self.format {
            return false;
        }

        let new_start = match self.resolve(start_type, start) {
            Resolved::Keep => self.start,
            Resolved::Unbounded => 0,
            Resolved::At(pos) => pos,
            Resolved::Invalid => return false,
        };
        let new_stop = match self.resolve(stop_type, stop) {
            Resolved::Keep => self.stop,
            Resolved::Unbounded => None,
            Resolved::At(pos) => Some(pos),
            Resolved::Invalid => return false,
        };
        if new_stop.is_some_and(|stop| stop < new_start) {
            return false;
        }

        let base = if flags.contains(SeekFlags::FLUSH) {
            0
        } else {
            self.to_running_time(self.position).unwrap_or(self.base)
        };

        let mut seg_flags = SegmentFlags::empty();
        if flags.contains(SeekFlags::FLUSH) {
            seg_flags = seg_flags.union(SegmentFlags::RESET);
        }
        if flags.contains(SeekFlags::SEGMENT) {
            seg_flags = seg_flags.union(SegmentFlags::SEGMENT);
        }
        if flags.contains(SeekFlags::SKIP) {
            seg_flags = seg_flags.union(SegmentFlags::SKIP);
        }

        self.rate = rate;
        self.applied_rate = 1.0;
        self.flags = seg_flags;
        self.base = base;
        self.start = new_start;
        self.stop = new_stop;
        self.time = new_start;
        self.position = if rate > 0.0 {
            new_start
        } else {
            new_stop.or(self.duration).unwrap_or(new_start)
        };
        true
    }

    fn resolve(&self, seek_type: SeekType, value: i64) -> Resolved {
        let offset_from = |origin: u64| {
            let pos = origin as i128 + value as i128;
            Resolved::At(pos.clamp(0, u64::MAX as i128) as u64)
        };
        match seek_type {
            SeekType::None => Resolved::Keep,
            SeekType::Set if value < 0 => Resolved::Unbounded,
            SeekType::Set => Resolved::At(value as u64),
            SeekType::Current => offset_from(self.position),
            SeekType::End => match self.duration {
                Some(duration) => offset_from(duration),
                None => Resolved::Invalid,
            },
        }
    }
}

enum Resolved {
    Keep,
    Unbounded,
    At(u64),
    Invalid,
}
