use super::ConfigSource;
use crate::error::{Result, WeaverError};
use crate::logging::LoggerOptions;
use serde::Deserialize;
use std::time::Duration;

/// Key of the framework's own section in the configuration tree
pub const FRAMEWORK_KEY: &str = "weaver";

/// Framework options, read from the `weaver` subtree
///
/// ```toml
/// [weaver]
/// shutdown_timeout_ms = 5000
/// stop_grace_ms = 10000
///
/// [weaver.logger]
/// level = "info"
/// type = "text"
/// add_source = false
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FrameworkOptions {
    pub logger: LoggerOptions,
    /// Upper bound for each component's Shutdown call
    pub shutdown_timeout_ms: Option<u64>,
    /// How long a stop waits for Start tasks to return
    pub stop_grace_ms: Option<u64>,
}

impl FrameworkOptions {
    /// Read the options from `source`; an absent section yields the defaults.
    pub fn load(source: &dyn ConfigSource) -> Result<Self> {
        match source.subtree(FRAMEWORK_KEY)? {
            Some(value) => serde_json::from_value(value).map_err(|err| {
                WeaverError::Config(format!("invalid [{FRAMEWORK_KEY}] section: {err}"))
            }),
            None => Ok(Self::default()),
        }
    }

    pub fn shutdown_timeout(&self) -> Option<Duration> {
        self.shutdown_timeout_ms.map(Duration::from_millis)
    }

    pub fn stop_grace(&self) -> Option<Duration> {
        self.stop_grace_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValueSource;
    use crate::logging::LogFormat;
    use serde_json::json;

    #[test]
    fn test_defaults_without_section() {
        let options = FrameworkOptions::load(&ValueSource::default()).unwrap();
        assert_eq!(options.logger.level, "info");
        assert_eq!(options.shutdown_timeout(), None);
    }

    #[test]
    fn test_reads_section() {
        let source = ValueSource::new(json!({
            "weaver": {
                "logger": {"level": "debug", "type": "json", "add_source": true},
                "shutdown_timeout_ms": 250
            }
        }));

        let options = FrameworkOptions::load(&source).unwrap();
        assert_eq!(options.logger.level, "debug");
        assert_eq!(options.logger.format, LogFormat::Json);
        assert!(options.logger.add_source);
        assert_eq!(options.shutdown_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(options.stop_grace(), None);
    }

    #[test]
    fn test_invalid_section_is_a_config_error() {
        let source = ValueSource::new(json!({"weaver": {"shutdown_timeout_ms": "soon"}}));
        assert!(matches!(
            FrameworkOptions::load(&source),
            Err(WeaverError::Config(_))
        ));
    }
}
