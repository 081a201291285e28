//! Application Bootstrap
//!
//! Provides a high-level API for running a weaver application: build the
//! component graph from its root, start everything, hand the root to the
//! application callback, then stop.

use super::{cancel_on_signal, LifecycleError};
use crate::config::{ConfigSource, ConfigWatcher, FileSource, FrameworkOptions};
use crate::di::{Component, Container, ContainerBuilder, Main};
use crate::error::{Result, WeaverError};
use crate::logging;
use crate::registry::{ComponentDescriptor, Registry};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Environment variable naming the configuration file
pub const CONFIG_ENV: &str = "SERVICE_CONFIG";

/// A container ready to run, plus the process-level wiring around it
///
/// # Example
///
/// ```rust,ignore
/// use weaver::lifecycle::Application;
///
/// #[tokio::main]
/// async fn main() -> weaver::Result<()> {
///     Application::builder()
///         .config_from_env()
///         .build()?
///         .run::<App, _, _>(|ctx, app| async move {
///             app.serve(ctx).await
///         })
///         .await
/// }
/// ```
pub struct Application {
    container: Container,
    watch_path: Option<PathBuf>,
    handle_signals: bool,
}

impl Application {
    /// Create a new application builder
    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::new()
    }

    /// Get a reference to the container
    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Build the graph reachable from root `R`, start every component, and
    /// run `app` with the run token and the root.
    ///
    /// Once `app` returns, the run is cancelled and every component stopped.
    /// The first error wins: the callback's, then a Start fault, then a
    /// failed Shutdown. If the run fails before the callback, whatever was
    /// already built is shut down before the error is returned.
    pub async fn run<R, F, Fut>(self, app: F) -> Result<()>
    where
        R: Component + Main,
        F: FnOnce(CancellationToken, Arc<R>) -> Fut,
        Fut: Future<Output = anyhow::Result<()>>,
    {
        let container = self.container;
        let token = container.token();

        let root = match container.resolve_impl::<R>().await {
            Ok(root) => root,
            Err(err) => return Err(abandon(&container, err).await),
        };
        let _watcher = match self
            .watch_path
            .map(|path| ConfigWatcher::spawn(container.clone(), path))
            .transpose()
        {
            Ok(watcher) => watcher,
            Err(err) => return Err(abandon(&container, err).await),
        };
        let signals = self.handle_signals.then(|| cancel_on_signal(token.clone()));

        tracing::info!("Starting application...");
        if let Err(err) = container.start().await {
            if let Some(signals) = signals {
                signals.abort();
            }
            return Err(abandon(&container, err).await);
        }

        let outcome = app(token.clone(), root).await;
        if let Err(err) = &outcome {
            tracing::error!(error = %err, "Application returned an error");
        }

        tracing::info!("Shutting down application...");
        token.cancel();
        let stopped = container.stop().await;
        if let Some(signals) = signals {
            signals.abort();
        }

        outcome.map_err(WeaverError::App)?;
        let report = stopped?;
        if !report.is_clean() {
            return Err(LifecycleError::Shutdown(report).into());
        }

        tracing::info!("Application shutdown complete");
        Ok(())
    }
}

/// Cancel the run and shut down every component built so far, then hand
/// back `err`.
async fn abandon(container: &Container, err: WeaverError) -> WeaverError {
    tracing::error!(error = %err, "Application failed to start, shutting down");
    container.token().cancel();
    match container.stop().await {
        Ok(report) if !report.is_clean() => {
            tracing::warn!(%report, "Shutdown after a failed start was not clean");
        }
        Ok(report) => tracing::info!(invoked = report.invoked.len(), "Shutdown complete"),
        Err(stop) => tracing::warn!(error = %stop, "Stop after a failed start failed"),
    }
    err
}

/// Builder for Application
pub struct ApplicationBuilder {
    container: ContainerBuilder,
    source: Option<Arc<dyn ConfigSource>>,
    config_file: Option<PathBuf>,
    watch_config: bool,
    handle_signals: bool,
    init_logging: bool,
}

impl Default for ApplicationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ApplicationBuilder {
    /// Create a new application builder
    pub fn new() -> Self {
        Self {
            container: ContainerBuilder::new(),
            source: None,
            config_file: None,
            watch_config: false,
            handle_signals: true,
            init_logging: true,
        }
    }

    /// Use `registry` instead of the components submitted with `register!`
    pub fn registry(mut self, registry: Registry) -> Self {
        self.container = self.container.registry(registry);
        self
    }

    pub fn register(mut self, descriptor: ComponentDescriptor) -> Self {
        self.container = self.container.register(descriptor);
        self
    }

    /// Read configuration from `source`
    pub fn source(mut self, source: impl ConfigSource + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    /// Read configuration from the file at `path`
    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Read configuration from the file named by `SERVICE_CONFIG`, if set
    pub fn config_from_env(mut self) -> Self {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) if !path.is_empty() => self.config_file = Some(PathBuf::from(path)),
            _ => tracing::debug!("{CONFIG_ENV} not set, running without a configuration file"),
        }
        self
    }

    /// Reload the configuration file when it changes
    pub fn watch_config(mut self, watch: bool) -> Self {
        self.watch_config = watch;
        self
    }

    /// Cancel the run on SIGINT, SIGTERM or SIGQUIT (on by default)
    pub fn handle_signals(mut self, handle: bool) -> Self {
        self.handle_signals = handle;
        self
    }

    /// Install the `tracing` subscriber from `weaver.logger` (on by default)
    pub fn init_logging(mut self, init: bool) -> Self {
        self.init_logging = init;
        self
    }

    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.container = self.container.shutdown_timeout(timeout);
        self
    }

    pub fn stop_grace(mut self, grace: Duration) -> Self {
        self.container = self.container.stop_grace(grace);
        self
    }

    /// Load the configuration and build the container
    pub fn build(self) -> Result<Application> {
        let source = match (&self.config_file, self.source) {
            (Some(path), _) => Some(Arc::new(FileSource::open(path)?) as Arc<dyn ConfigSource>),
            (None, source) => source,
        };

        if self.init_logging {
            let options = match &source {
                Some(source) => FrameworkOptions::load(source.as_ref())?,
                None => FrameworkOptions::default(),
            };
            logging::init(&options.logger);
        }

        let container = match source {
            Some(source) => self.container.shared_source(source),
            None => self.container,
        }
        .build()?;

        let watch_path = match (self.watch_config, self.config_file) {
            (true, Some(path)) => Some(path),
            (true, None) => {
                tracing::warn!("Configuration watching requested without a configuration file");
                None
            }
            (false, _) => None,
        };

        Ok(Application {
            container,
            watch_path,
            handle_signals: self.handle_signals,
        })
    }
}
