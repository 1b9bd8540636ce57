//! Queries answered by the aggregator and its hooks.
//!
//! A query is a question asked of a pad that is answered in place: the
//! handler fills in the result fields and returns `true` when it answered.

use crate::event::SegmentFormat;

/// A query sent to a pad.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// Can the stream be seeked in the given format?
    Seeking(SeekingQuery),
    /// Current position in the given format.
    Position(PositionQuery),
    /// Total duration in the given format.
    Duration(DurationQuery),
}

impl Query {
    /// Create a seeking query for a format.
    pub fn seeking(format: SegmentFormat) -> Self {
        Query::Seeking(SeekingQuery::new(format))
    }

    /// Create a position query for a format.
    pub fn position(format: SegmentFormat) -> Self {
        Query::Position(PositionQuery {
            format,
            position: None,
        })
    }

    /// Create a duration query for a format.
    pub fn duration(format: SegmentFormat) -> Self {
        Query::Duration(DurationQuery {
            format,
            duration: None,
        })
    }

    /// Get a human-readable name for this query type.
    pub fn name(&self) -> &'static str {
        match self {
            Query::Seeking(_) => "seeking",
            Query::Position(_) => "position",
            Query::Duration(_) => "duration",
        }
    }
}

/// Seeking capability query.
#[derive(Debug, Clone, PartialEq)]
pub struct SeekingQuery {
    /// Format being asked about.
    pub format: SegmentFormat,
    /// Whether seeking is possible.
    pub seekable: bool,
    /// First seekable position.
    pub start: i64,
    /// Last seekable position (-1 for unknown).
    pub end: i64,
}

impl SeekingQuery {
    /// Create an unanswered seeking query.
    pub fn new(format: SegmentFormat) -> Self {
        Self {
            format,
            seekable: false,
            start: -1,
            end: -1,
        }
    }

    /// Fill in the answer.
    pub fn set(&mut self, seekable: bool, start: i64, end: i64) {
        self.seekable = seekable;
        self.start = start;
        self.end = end;
    }

    /// Answer "not seekable", echoing the requested format.
    pub fn set_not_seekable(&mut self) {
        self.set(false, 0, -1);
    }
}

/// Position query.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionQuery {
    /// Format of the answer.
    pub format: SegmentFormat,
    /// Answered position.
    pub position: Option<u64>,
}

/// Duration query.
#[derive(Debug, Clone, PartialEq)]
pub struct DurationQuery {
    /// Format of the answer.
    pub format: SegmentFormat,
    /// Answered duration.
    pub duration: Option<u64>,
}
