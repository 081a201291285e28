use crate::config::{ConfigSource, FrameworkOptions};
use crate::di::Container;
use crate::error::Result;
use crate::logging::{MakeLogger, SpanLoggers};
use crate::registry::{ComponentDescriptor, Registry};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Builder for constructing a dependency injection container
///
/// Without an explicit registry or descriptors, the container is built from
/// every component submitted with [`register!`](crate::register).
///
/// # Example
/// ```rust,ignore
/// let container = ContainerBuilder::new()
///     .register(descriptor!(dyn Chat => ChatImpl, "chat"))
///     .source(FileSource::open("weaver.toml")?)
///     .shutdown_timeout(Duration::from_secs(5))
///     .build()?;
/// ```
#[derive(Default)]
pub struct ContainerBuilder {
    registry: Option<Registry>,
    descriptors: Vec<ComponentDescriptor>,
    source: Option<Arc<dyn ConfigSource>>,
    loggers: Option<Arc<dyn MakeLogger>>,
    token: Option<CancellationToken>,
    shutdown_timeout: Option<Duration>,
    stop_grace: Option<Duration>,
}

impl ContainerBuilder {
    /// Create a new container builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing registry
    pub fn registry(mut self, registry: Registry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Register a component descriptor
    pub fn register(mut self, descriptor: ComponentDescriptor) -> Self {
        self.descriptors.push(descriptor);
        self
    }

    /// Bind configuration fields from `source`
    pub fn source(self, source: impl ConfigSource + 'static) -> Self {
        self.shared_source(Arc::new(source))
    }

    /// Bind configuration fields from a source shared with the caller
    pub fn shared_source(mut self, source: Arc<dyn ConfigSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Set the factory that names each component's logger
    pub fn loggers(mut self, loggers: impl MakeLogger + 'static) -> Self {
        self.loggers = Some(Arc::new(loggers));
        self
    }

    /// Use `token` as the root run token instead of a fresh one
    pub fn token(mut self, token: CancellationToken) -> Self {
        self.token = Some(token);
        self
    }

    /// Bound each component's Shutdown call
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = Some(timeout);
        self
    }

    /// Bound how long a stop waits for Start tasks to return
    pub fn stop_grace(mut self, grace: Duration) -> Self {
        self.stop_grace = Some(grace);
        self
    }

    /// Build the container
    ///
    /// Validates the registry and reads the framework options from the
    /// configuration source. Options set on the builder take precedence.
    pub fn build(self) -> Result<Container> {
        let mut registry = match self.registry {
            Some(registry) => registry,
            None if self.descriptors.is_empty() => Registry::registered()?,
            None => Registry::default(),
        };
        for descriptor in self.descriptors {
            registry.register(descriptor)?;
        }
        registry.validate()?;

        let options = match &self.source {
            Some(source) => FrameworkOptions::load(source.as_ref())?,
            None => FrameworkOptions::default(),
        };

        tracing::debug!(components = registry.len(), "Container built");
        Ok(Container::from_parts(
            registry,
            self.source,
            self.loggers
                .unwrap_or_else(|| Arc::new(SpanLoggers::new()) as Arc<dyn MakeLogger>),
            self.token.unwrap_or_default(),
            self.shutdown_timeout.or(options.shutdown_timeout()),
            self.stop_grace.or(options.stop_grace()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValueSource;
    use crate::di::{Base, Component};
    use crate::logging::Logger;
    use crate::{descriptor, Main, WeaverError};
    use serde_json::json;

    #[derive(Debug, Default)]
    struct Solo {
        base: Base,
    }

    impl Component for Solo {
        fn set_logger(&mut self, logger: Logger) {
            self.base.set_logger(logger);
        }
    }

    impl Main for Solo {}

    struct Prefixed;

    impl MakeLogger for Prefixed {
        fn make_logger(&self, component: &str) -> Logger {
            Logger::new(format!("test/{component}"), tracing::Span::none())
        }
    }

    #[tokio::test]
    async fn test_builds_with_custom_loggers() {
        let container = ContainerBuilder::new()
            .register(descriptor!(main Solo, "solo"))
            .loggers(Prefixed)
            .build()
            .unwrap();

        let solo = container.resolve_impl::<Solo>().await.unwrap();
        assert_eq!(solo.base.logger().component(), "test/solo");
    }

    #[tokio::test]
    async fn test_uses_given_token() {
        let token = CancellationToken::new();
        let container = ContainerBuilder::new()
            .register(descriptor!(main Solo, "solo"))
            .token(token.clone())
            .build()
            .unwrap();

        token.cancel();
        assert!(container.token().is_cancelled());
    }

    #[test]
    fn test_rejects_invalid_framework_options() {
        let result = ContainerBuilder::new()
            .register(descriptor!(main Solo, "solo"))
            .source(ValueSource::new(json!({"weaver": {"stop_grace_ms": -1}})))
            .build();

        assert!(matches!(result, Err(WeaverError::Config(_))));
    }
}
