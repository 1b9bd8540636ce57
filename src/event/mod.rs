//! Events exchanged between the aggregator and its peers.
//!
//! Events are out-of-band signals that travel alongside buffers:
//!
//! - **Downstream events** flow with data (stream-start, segment, EOS)
//! - **Upstream events** flow against data (seek, QoS, navigation)
//! - **Bidirectional events** can flow either way (flush, custom)
//!
//! The aggregator's source pad only passes on events for which
//! [`Event::is_upstream`] holds.
//!
//! Flush events are not serialized with data: a flush-start takes effect
//! immediately and discards whatever a pad is holding.
//!
//! # Example
//!
//! ```rust
//! use parallax_aggregator::clock::ClockTime;
//! use parallax_aggregator::event::{Event, SeekEvent, SeekFlags};
//!
//! let seek = SeekEvent::new_time(ClockTime::from_secs(5));
//! assert!(seek.flags.contains(SeekFlags::FLUSH));
//!
//! let event = Event::Seek(seek);
//! assert!(event.is_upstream());
//! assert_eq!(event.name(), "seek");
//! ```

pub mod segment;

pub use segment::{Segment, SegmentFlags, SegmentFormat};

use crate::clock::ClockTime;
use std::collections::HashMap;

// ============================================================================
// Event Enum
// ============================================================================

/// Events that flow through a pipeline.
#[derive(Debug, Clone)]
pub enum Event {
    // ========== Downstream Events ==========
    /// Start of a new stream.
    StreamStart(StreamStartEvent),

    /// Defines the playback timeline for the following buffers.
    Segment(Segment),

    /// End of stream - no more data will be produced.
    Eos,

    // ========== Upstream Events ==========
    /// Seek request.
    Seek(SeekEvent),

    /// Quality of Service feedback.
    Qos(QosEvent),

    /// User input from a display sink.
    Navigation(NavigationEvent),

    // ========== Bidirectional Events ==========
    /// Flush start - immediately discard buffered data.
    FlushStart,

    /// Flush stop - resume normal operation.
    FlushStop(FlushStopEvent),

    /// Custom application event.
    Custom(CustomEvent),
}

impl Event {
    /// Check if this event may travel upstream (against data).
    ///
    /// True for seek, QoS and navigation, and for the bidirectional flush
    /// and custom events.
    pub fn is_upstream(&self) -> bool {
        !matches!(
            self,
            Event::StreamStart(_) | Event::Segment(_) | Event::Eos
        )
    }

    /// Get a human-readable name for this event type.
    pub fn name(&self) -> &str {
        match self {
            Event::StreamStart(_) => "stream-start",
            Event::Segment(_) => "segment",
            Event::Eos => "eos",
            Event::Seek(_) => "seek",
            Event::Qos(_) => "qos",
            Event::Navigation(_) => "navigation",
            Event::FlushStart => "flush-start",
            Event::FlushStop(_) => "flush-stop",
            Event::Custom(c) => &c.name,
        }
    }
}

// ============================================================================
// Stream Start Event
// ============================================================================

/// Stream start event - begins a new logical stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamStartEvent {
    /// Unique stream identifier.
    pub stream_id: String,
}

impl StreamStartEvent {
    /// Create a new stream start event.
    pub fn new(stream_id: impl Into<String>) -> Self {
        Self {
            stream_id: stream_id.into(),
        }
    }
}

// ============================================================================
// Seek Event
// ============================================================================

/// Seek event - request to jump to a position.
///
/// Sent upstream to request that sources seek to a new position.
#[derive(Debug, Clone)]
pub struct SeekEvent {
    /// Seek rate (1.0 = normal, 2.0 = 2x speed, -1.0 = reverse).
    pub rate: f64,
    /// Format of start/stop positions.
    pub format: SegmentFormat,
    /// Seek flags.
    pub flags: SeekFlags,
    /// Start position.
    pub start: SeekPosition,
    /// Stop position.
    pub stop: SeekPosition,
}

impl SeekEvent {
    /// Create a flushing time-based seek to a position.
    pub fn new_time(position: ClockTime) -> Self {
        Self {
            rate: 1.0,
            format: SegmentFormat::Time,
            flags: SeekFlags::FLUSH,
            start: SeekPosition::set(position.nanos() as i64),
            stop: SeekPosition::none(),
        }
    }

    /// Create a flushing byte-based seek.
    pub fn new_bytes(position: u64) -> Self {
        Self {
            rate: 1.0,
            format: SegmentFormat::Bytes,
            flags: SeekFlags::FLUSH,
            start: SeekPosition::set(position as i64),
            stop: SeekPosition::none(),
        }
    }

    /// Set the seek rate.
    pub fn with_rate(mut self, rate: f64) -> Self {
        self.rate = rate;
        self
    }

    /// Set seek flags.
    pub fn with_flags(mut self, flags: SeekFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Set the stop position.
    pub fn with_stop(mut self, stop: SeekPosition) -> Self {
        self.stop = stop;
        self
    }

    /// Check for the flush flag.
    pub fn is_flushing(&self) -> bool {
        self.flags.contains(SeekFlags::FLUSH)
    }
}

/// Position in a seek event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeekPosition {
    /// Type of seek.
    pub seek_type: SeekType,
    /// Position value (interpretation depends on seek_type).
    pub position: i64,
}

impl SeekPosition {
    /// Create an absolute position.
    pub fn set(position: i64) -> Self {
        Self {
            seek_type: SeekType::Set,
            position,
        }
    }

    /// Create a relative position (from current).
    pub fn current(offset: i64) -> Self {
        Self {
            seek_type: SeekType::Current,
            position: offset,
        }
    }

    /// Create a position relative to end.
    pub fn end(offset: i64) -> Self {
        Self {
            seek_type: SeekType::End,
            position: offset,
        }
    }

    /// No position change.
    pub fn none() -> Self {
        Self {
            seek_type: SeekType::None,
            position: -1,
        }
    }
}

/// Type of seek position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SeekType {
    /// Don't change this position.
    #[default]
    None,
    /// Absolute position.
    Set,
    /// Relative to current position.
    Current,
    /// Relative to end.
    End,
}

/// Flags for seek events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SeekFlags(u32);

impl SeekFlags {
    /// No special flags.
    pub const NONE: Self = Self(0);
    /// Flush pipeline before seek.
    pub const FLUSH: Self = Self(1 << 0);
    /// Seek to exact position (may be slower).
    pub const ACCURATE: Self = Self(1 << 1);
    /// Seek to nearest keyframe.
    pub const KEY_UNIT: Self = Self(1 << 2);
    /// Segment seek; post segment-done instead of EOS.
    pub const SEGMENT: Self = Self(1 << 3);
    /// Skip intermediate data (trick modes).
    pub const SKIP: Self = Self(1 << 4);

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

// ============================================================================
// QoS / Navigation Events
// ============================================================================

/// Quality of Service event - feedback about processing performance.
#[derive(Debug, Clone)]
pub struct QosEvent {
    /// Proportion of frames being dropped (0.0 - 1.0).
    pub proportion: f64,
    /// Difference between expected and actual processing time.
    pub diff: ClockTime,
    /// Timestamp of the problematic buffer.
    pub timestamp: ClockTime,
}

impl QosEvent {
    /// Create a new QoS event.
    pub fn new(proportion: f64, diff: ClockTime, timestamp: ClockTime) -> Self {
        Self {
            proportion,
            diff,
            timestamp,
        }
    }
}

/// Navigation event - pointer or key input reported by a display sink.
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationEvent {
    /// Input kind ("mouse-move", "key-press", ...).
    pub kind: String,
    /// Pointer x coordinate.
    pub x: f64,
    /// Pointer y coordinate.
    pub y: f64,
}

impl NavigationEvent {
    /// Create a navigation event.
    pub fn new(kind: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            kind: kind.into(),
            x,
            y,
        }
    }
}

// ============================================================================
// Flush Stop Event
// ============================================================================

/// Flush stop event - resume normal operation after flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushStopEvent {
    /// Whether to reset running time to 0.
    pub reset_time: bool,
}

impl FlushStopEvent {
    /// Create a new flush stop event.
    pub fn new(reset_time: bool) -> Self {
        Self { reset_time }
    }
}

impl Default for FlushStopEvent {
    fn default() -> Self {
        Self { reset_time: true }
    }
}

// ============================================================================
// Custom Event
// ============================================================================

/// Custom application event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomEvent {
    /// Event name.
    pub name: String,
    /// Event data as key-value pairs.
    pub data: HashMap<String, String>,
}

impl CustomEvent {
    /// Create a new custom event.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: HashMap::new(),
        }
    }

    /// Add data to the event.
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Get a value from the event data.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }
}

// ============================================================================
// Event Result
// ============================================================================

/// Result of offering an event to an element hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResult {
    /// Event was handled, don't propagate.
    Handled,
    /// Event was not handled, propagate to next element.
    NotHandled,
    /// Event handling failed.
    Error,
}

impl EventResult {
    /// Check if the event was handled.
    pub fn is_handled(&self) -> bool {
        matches!(self, EventResult::Handled)
    }
}
