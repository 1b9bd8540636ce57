//! Nanosecond timestamps.
//!
//! [`ClockTime`] is the time type used for buffer timestamps and for
//! time-format segments. `ClockTime::NONE` marks an unset timestamp.

use std::time::Duration;

/// Time in nanoseconds (8 bytes, Copy).
///
/// # Examples
///
/// ```rust
/// use parallax_aggregator::clock::ClockTime;
///
/// let t = ClockTime::from_secs(1) + ClockTime::from_millis(500);
///
/// assert_eq!(t.millis(), 1500);
/// assert_eq!(format!("{}", t), "1.500s");
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ClockTime(u64);

impl ClockTime {
    /// Zero time.
    pub const ZERO: Self = Self(0);

    /// Largest valid time (one below the NONE sentinel).
    pub const MAX: Self = Self(u64::MAX - 1);

    /// Unset time.
    pub const NONE: Self = Self(u64::MAX);

    /// Create from nanoseconds.
    #[inline]
    pub const fn from_nanos(ns: u64) -> Self {
        Self(ns)
    }

    /// Create from milliseconds.
    #[inline]
    pub const fn from_millis(ms: u64) -> Self {
        Self(ms.saturating_mul(1_000_000))
    }

    /// Create from seconds.
    #[inline]
    pub const fn from_secs(s: u64) -> Self {
        Self(s.saturating_mul(1_000_000_000))
    }

    /// Nanoseconds.
    #[inline]
    pub const fn nanos(self) -> u64 {
        self.0
    }

    /// Whole milliseconds.
    #[inline]
    pub const fn millis(self) -> u64 {
        self.0 / 1_000_000
    }

    /// Whole seconds.
    #[inline]
    pub const fn secs(self) -> u64 {
        self.0 / 1_000_000_000
    }

    /// Check for the NONE sentinel.
    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == u64::MAX
    }

    /// Check that this is a valid time.
    #[inline]
    pub const fn is_some(self) -> bool {
        !self.is_none()
    }

    /// Saturating addition; NONE is absorbing.
    #[inline]
    pub const fn saturating_add(self, rhs: Self) -> Self {
        if self.is_none() || rhs.is_none() {
            return Self::NONE;
        }
        match self.0.saturating_add(rhs.0) {
            u64::MAX => Self::MAX,
            v => Self(v),
        }
    }

    /// Saturating subtraction; NONE is absorbing.
    #[inline]
    pub const fn saturating_sub(self, rhs: Self) -> Self {
        if self.is_none() || rhs.is_none() {
            return Self::NONE;
        }
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl std::ops::Add for ClockTime {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        self.saturating_add(rhs)
    }
}

impl std::ops::AddAssign for ClockTime {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = self.saturating_add(rhs);
    }
}

impl std::ops::Sub for ClockTime {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        self.saturating_sub(rhs)
    }
}

impl From<Duration> for ClockTime {
    #[inline]
    fn from(d: Duration) -> Self {
        Self(u64::try_from(d.as_nanos()).unwrap_or(u64::MAX - 1))
    }
}

impl From<ClockTime> for Duration {
    #[inline]
    fn from(t: ClockTime) -> Self {
        if t.is_none() {
            Duration::ZERO
        } else {
            Duration::from_nanos(t.0)
        }
    }
}

impl std::fmt::Display for ClockTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_none() {
            write!(f, "NONE")
        } else {
            write!(f, "{}.{:03}s", self.secs(), self.millis() % 1000)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_time_units() {
        let t = ClockTime::from_millis(2500);
        assert_eq!(t.nanos(), 2_500_000_000);
        assert_eq!(t.millis(), 2500);
        assert_eq!(t.secs(), 2);
    }

    #[test]
    fn test_clock_time_none_is_absorbing() {
        assert!((ClockTime::NONE + ClockTime::from_secs(1)).is_none());
        assert!((ClockTime::from_secs(1) - ClockTime::NONE).is_none());
        assert!(ClockTime::ZERO.is_some());
    }

    #[test]
    fn test_clock_time_saturates_below_none() {
        let t = ClockTime::MAX + ClockTime::from_secs(1);
        assert_eq!(t, ClockTime::MAX);
        assert!(t.is_some());
        assert_eq!(ClockTime::ZERO - ClockTime::from_secs(1), ClockTime::ZERO);
    }

    #[test]
    fn test_clock_time_display() {
        assert_eq!(format!("{}", ClockTime::from_millis(1500)), "1.500s");
        assert_eq!(format!("{}", ClockTime::NONE), "NONE");
    }
}
