//! Flow status returned along the data path.
//!
//! Every buffer push, every producer-side submission and every aggregation
//! step reports a [`FlowStatus`]. Errors from downstream travel back to all
//! producers through the coordinator's last flow result:
//!
//! ```text
//! producer ──submit──> slot ──aggregate──> downstream
//!     ^                                       │
//!     └──────────── FlowStatus ───────────────┘
//! ```

/// Result of a data-path operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum FlowStatus {
    /// Data was accepted.
    #[default]
    Ok = 0,

    /// No downstream peer is linked.
    NotLinked = 1,

    /// The receiving pad is flushing; data was discarded.
    Flushing = 2,

    /// End of stream reached; no more data is accepted.
    Eos = 3,

    /// Format negotiation failed downstream.
    NotNegotiated = 4,

    /// Fatal processing error.
    Error = 5,
}

impl FlowStatus {
    /// Check for `Ok`.
    #[inline]
    pub fn is_ok(self) -> bool {
        self == FlowStatus::Ok
    }

    /// Check for a result that counts as an error when reported by an
    /// aggregation step (anything but `Ok`, `Eos` or `Flushing`).
    #[inline]
    pub fn is_error(self) -> bool {
        matches!(
            self,
            FlowStatus::NotLinked | FlowStatus::NotNegotiated | FlowStatus::Error
        )
    }

    /// Short lowercase name for logs and metric labels.
    pub fn name(self) -> &'static str {
        match self {
            FlowStatus::Ok => "ok",
            FlowStatus::NotLinked => "not-linked",
            FlowStatus::Flushing => "flushing",
            FlowStatus::Eos => "eos",
            FlowStatus::NotNegotiated => "not-negotiated",
            FlowStatus::Error => "error",
        }
    }
}

impl From<u8> for FlowStatus {
    fn from(value: u8) -> Self {
        match value {
            0 => FlowStatus::Ok,
            1 => FlowStatus::NotLinked,
            2 => FlowStatus::Flushing,
            3 => FlowStatus::Eos,
            4 => FlowStatus::NotNegotiated,
            _ => FlowStatus::Error,
        }
    }
}

impl From<FlowStatus> for u8 {
    fn from(status: FlowStatus) -> Self {
        status as u8
    }
}

impl std::fmt::Display for FlowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_status_classification() {
        assert!(FlowStatus::Ok.is_ok());
        assert!(!FlowStatus::Flushing.is_error());
        assert!(!FlowStatus::Eos.is_error());
        assert!(FlowStatus::NotLinked.is_error());
        assert!(FlowStatus::Error.is_error());
    }

    #[test]
    fn test_flow_status_u8_conversion() {
        for status in [
            FlowStatus::Ok,
            FlowStatus::NotLinked,
            FlowStatus::Flushing,
            FlowStatus::Eos,
            FlowStatus::NotNegotiated,
            FlowStatus::Error,
        ] {
            assert_eq!(FlowStatus::from(u8::from(status)), status);
        }
        assert_eq!(FlowStatus::from(200), FlowStatus::Error);
    }

    #[test]
    fn test_flow_status_display() {
        assert_eq!(FlowStatus::NotLinked.to_string(), "not-linked");
        assert_eq!(FlowStatus::default(), FlowStatus::Ok);
    }
}
