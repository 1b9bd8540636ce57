//! Pad templates and pad identifiers.
//!
//! Request pads are named from a template such as `"sink_%u"`: the `%u`
//! is replaced by the pad's serial number.

use crate::error::{Error, Result};
use std::fmt;

/// Direction of a pad (input or output).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PadDirection {
    /// An input pad (receives buffers from upstream).
    Input,
    /// An output pad (sends buffers downstream).
    Output,
}

/// Whether a pad is always present or created dynamically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PadPresence {
    /// Pad is always present on the element.
    Always,
    /// Pad is created on demand by the element itself.
    Sometimes,
    /// Pad is created when the application requests it.
    Request,
}

/// Template for creating pads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PadTemplate {
    /// Name pattern for this pad (e.g., "src", "sink_%u").
    pub name: String,
    /// Direction of this pad.
    pub direction: PadDirection,
    /// Whether this pad is always present or created on demand.
    pub presence: PadPresence,
}

impl PadTemplate {
    /// Create a new pad template.
    pub fn new(name: impl Into<String>, direction: PadDirection, presence: PadPresence) -> Self {
        Self {
            name: name.into(),
            direction,
            presence,
        }
    }

    /// Create a template for request input pads, e.g. `"sink_%u"`.
    pub fn request_input(name: impl Into<String>) -> Self {
        Self::new(name, PadDirection::Input, PadPresence::Request)
    }

    /// Create a template for an always-present output pad.
    pub fn output(name: impl Into<String>) -> Self {
        Self::new(name, PadDirection::Output, PadPresence::Always)
    }

    /// Check that a request template contains exactly one `%u`.
    pub fn validate(&self) -> Result<()> {
        if self.presence == PadPresence::Request && self.name.matches("%u").count() != 1 {
            return Err(Error::Config(format!(
                "request pad template '{}' must contain exactly one %u",
                self.name
            )));
        }
        Ok(())
    }

    /// Format a pad name for a serial number.
    pub fn pad_name(&self, serial: u32) -> String {
        self.name.replacen("%u", &serial.to_string(), 1)
    }

    /// Extract the serial number from a pad name produced by this template.
    ///
    /// Returns `None` if the name does not match the template.
    pub fn parse_serial(&self, name: &str) -> Option<u32> {
        let (prefix, suffix) = self.name.split_once("%u")?;
        let digits = name.strip_prefix(prefix)?.strip_suffix(suffix)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }
}

/// Identifier of a sink pad within one aggregator.
///
/// Serials are never reused, so a stale id never aliases a newer pad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PadId(u32);

impl PadId {
    /// Create from a serial number.
    pub const fn new(serial: u32) -> Self {
        Self(serial)
    }

    /// Serial number of the pad.
    pub const fn serial(self) -> u32 {
        self.0
    }
}

impl fmt::Display for PadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
