//! Aggregator configuration.

use crate::element::PadTemplate;
use crate::error::{Error, Result};

/// Configuration of one aggregator instance.
///
/// # Example
///
/// ```rust
/// use parallax_aggregator::aggregator::AggregatorConfig;
///
/// let config = AggregatorConfig::new()
///     .with_name("mixer")
///     .with_sink_template("in_%u");
///
/// assert!(config.validate().is_ok());
/// assert_eq!(config.thread_name(), "mixer-aggregate");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatorConfig {
    /// Element name used in logs, metric labels and the thread name.
    pub name: String,
    /// Name template for request sink pads.
    pub sink_template: String,
    /// Prefix of the generated stream-start id.
    pub stream_id_prefix: String,
    /// Name of the aggregation thread (defaults to `"{name}-aggregate"`).
    pub thread_name: Option<String>,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            name: "aggregator".to_string(),
            sink_template: "sink_%u".to_string(),
            stream_id_prefix: "agg".to_string(),
            thread_name: None,
        }
    }
}

impl AggregatorConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the element name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the sink pad template.
    pub fn with_sink_template(mut self, template: impl Into<String>) -> Self {
        self.sink_template = template.into();
        self
    }

    /// Set the stream-start id prefix.
    pub fn with_stream_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.stream_id_prefix = prefix.into();
        self
    }

    /// Set the aggregation thread name.
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = Some(name.into());
        self
    }

    /// Effective aggregation thread name.
    pub fn thread_name(&self) -> String {
        self.thread_name
            .clone()
            .unwrap_or_else(|| format!("{}-aggregate", self.name))
    }

    /// Template used for request sink pads.
    pub fn pad_template(&self) -> PadTemplate {
        PadTemplate::request_input(self.sink_template.clone())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::Config("aggregator name must not be empty".into()));
        }
        if self.stream_id_prefix.is_empty() {
            return Err(Error::Config("stream id prefix must not be empty".into()));
        }
        if self.thread_name.as_deref().is_some_and(str::is_empty) {
            return Err(Error::Config("thread name must not be empty".into()));
        }
        self.pad_template().validate()
    }
}
