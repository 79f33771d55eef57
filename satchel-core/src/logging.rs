//! Unified logging system
//!
//! Structured `tracing` output for the session engine and its hosts.

use serde::{Deserialize, Serialize};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty, compact)
    pub format: LogFormat,
    /// Whether to include file and line information
    pub include_location: bool,
    /// Whether to include thread information
    pub include_thread: bool,
    /// Whether to emit span close events with their timings
    pub enable_span_timing: bool,
    /// Custom filter directives
    pub filter_directives: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
    Compact,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            include_location: true,
            include_thread: false,
            enable_span_timing: false,
            filter_directives: vec![
                "satchel_core=debug".to_string(),
                "satchel_web=debug".to_string(),
            ],
        }
    }
}

impl LoggingConfig {
    /// Configuration with a single level applied to the satchel crates
    pub fn with_level(level: &str) -> Self {
        Self {
            level: level.to_string(),
            filter_directives: vec![
                format!("satchel_core={}", level),
                format!("satchel_web={}", level),
                "tower_http=debug".to_string(),
            ],
            ..Self::default()
        }
    }

    fn build_filter(&self) -> Result<EnvFilter, Box<dyn std::error::Error + Send + Sync>> {
        let mut filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level));

        for directive in &self.filter_directives {
            filter = filter.add_directive(directive.parse()?);
        }

        Ok(filter)
    }

    fn build_layer(&self) -> Box<dyn Layer<Registry> + Send + Sync> {
        let span_events = if self.enable_span_timing {
            FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };

        let layer = fmt::layer()
            .with_span_events(span_events)
            .with_file(self.include_location)
            .with_line_number(self.include_location)
            .with_thread_ids(self.include_thread)
            .with_thread_names(self.include_thread);

        match self.format {
            LogFormat::Json => layer.json().boxed(),
            LogFormat::Pretty => layer.pretty().boxed(),
            LogFormat::Compact => layer.compact().boxed(),
        }
    }
}

/// Initialize the logging system
///
/// Fails if a global subscriber is already installed or a filter directive does not parse.
pub fn init_logging(
    config: &LoggingConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = config.build_filter()?;

    tracing_subscriber::registry()
        .with(config.build_layer())
        .with(filter)
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_level_sets_directives() {
        let config = LoggingConfig::with_level("trace");
        assert_eq!(config.level, "trace");
        assert!(config
            .filter_directives
            .contains(&"satchel_core=trace".to_string()));
    }

    #[test]
    fn test_bad_directive_is_rejected() {
        let config = LoggingConfig {
            filter_directives: vec!["satchel_core=not_a_level".to_string()],
            ..LoggingConfig::default()
        };
        assert!(config.build_filter().is_err());
    }
}
