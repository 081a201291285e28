//! Component loggers
//!
//! Every component receives a [`Logger`] when it is allocated. Loggers are
//! produced by a [`MakeLogger`] factory that is built once and handed to the
//! container, so there is no process-wide logger state.

use dashmap::DashMap;
use serde::Deserialize;
use std::sync::Arc;
use tracing::Span;
use tracing_subscriber::EnvFilter;

/// A named, structured logger handed to a component.
///
/// Log through the span so every event carries the component name:
///
/// ```rust,ignore
/// tracing::info!(parent: self.base.logger().span(), user = %name, "greeting");
/// ```
#[derive(Clone, Debug)]
pub struct Logger {
    component: Arc<str>,
    span: Span,
}

impl Logger {
    pub fn new(component: impl Into<Arc<str>>, span: Span) -> Self {
        Self {
            component: component.into(),
            span,
        }
    }

    /// Name of the component this logger belongs to
    pub fn component(&self) -> &str {
        &self.component
    }

    pub fn span(&self) -> &Span {
        &self.span
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new("", Span::none())
    }
}

/// Factory yielding a logger for a component name
pub trait MakeLogger: Send + Sync {
    fn make_logger(&self, component: &str) -> Logger;
}

/// Default factory: one `component` span per name, memoized.
#[derive(Default)]
pub struct SpanLoggers {
    loggers: DashMap<String, Logger>,
}

impl SpanLoggers {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MakeLogger for SpanLoggers {
    fn make_logger(&self, component: &str) -> Logger {
        self.loggers
            .entry(component.to_string())
            .or_insert_with(|| {
                Logger::new(component, tracing::info_span!("component", name = %component))
            })
            .clone()
    }
}

/// Output format of the installed subscriber
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    #[serde(alias = "console")]
    Text,
    Json,
}

/// Logger section of the framework options (`weaver.logger`)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggerOptions {
    pub level: String,
    #[serde(rename = "type", alias = "format")]
    pub format: LogFormat,
    pub add_source: bool,
}

impl Default for LoggerOptions {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            add_source: false,
        }
    }
}

impl LoggerOptions {
    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(self.level.to_lowercase()))
            .unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Install a global `tracing` subscriber built from `options`.
///
/// Returns `false` when a subscriber was already installed; the existing one
/// is left untouched.
pub fn init(options: &LoggerOptions) -> bool {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(options.filter())
        .with_file(options.add_source)
        .with_line_number(options.add_source);

    let installed = match options.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };
    installed.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loggers_are_memoized_per_component() {
        let loggers = SpanLoggers::new();
        let first = loggers.make_logger("hello.chat");
        let second = loggers.make_logger("hello.chat");
        assert_eq!(first.component(), "hello.chat");
        assert_eq!(first.span().id(), second.span().id());
        assert_eq!(loggers.loggers.len(), 1);
    }

    #[test]
    fn test_logger_options_accept_type_key() {
        let options: LoggerOptions =
            serde_json::from_value(serde_json::json!({ "level": "DEBUG", "type": "json" }))
                .unwrap();
        assert_eq!(options.format, LogFormat::Json);
        assert_eq!(options.level, "DEBUG");
        assert!(!options.add_source);
    }
}
