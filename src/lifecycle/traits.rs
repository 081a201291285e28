//! Lifecycle hook traits
//!
//! These traits define the contract for components that take part in the
//! Init, Start and Shutdown phases. A component advertises the hooks it
//! implements through [`Component::hooks`](crate::Component::hooks).

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Called once, after configuration and references are bound
///
/// A failure discards the instance and fails the resolution that asked for it.
///
/// # Example
///
/// ```rust,ignore
/// use weaver::lifecycle::OnInit;
/// use async_trait::async_trait;
///
/// #[async_trait]
/// impl OnInit for DatabaseImpl {
///     async fn init(&self, _ctx: &CancellationToken) -> anyhow::Result<()> {
///         self.pool.connect(&self.config.config().url).await?;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait OnInit: Send + Sync {
    async fn init(&self, ctx: &CancellationToken) -> anyhow::Result<()>;
}

/// Called concurrently for every component once the root is built
///
/// `start` may run for the whole lifetime of the component. It must return
/// promptly once `ctx` is cancelled. An error or panic cancels the run.
#[async_trait]
pub trait OnStart: Send + Sync {
    async fn start(&self, ctx: &CancellationToken) -> anyhow::Result<()>;
}

/// Called once per stop, after every Start task has returned
///
/// Errors are logged; they never prevent other components from shutting down.
#[async_trait]
pub trait OnShutdown: Send + Sync {
    async fn shutdown(&self, ctx: &CancellationToken) -> anyhow::Result<()>;
}

/// The lifecycle capabilities of a component, probed once when it is built
#[derive(Clone, Default)]
pub struct Hooks {
    init: Option<Arc<dyn OnInit>>,
    start: Option<Arc<dyn OnStart>>,
    shutdown: Option<Arc<dyn OnShutdown>>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_init<T: OnInit + 'static>(mut self, hook: Arc<T>) -> Self {
        self.init = Some(hook as Arc<dyn OnInit>);
        self
    }

    pub fn with_start<T: OnStart + 'static>(mut self, hook: Arc<T>) -> Self {
        self.start = Some(hook as Arc<dyn OnStart>);
        self
    }

    pub fn with_shutdown<T: OnShutdown + 'static>(mut self, hook: Arc<T>) -> Self {
        self.shutdown = Some(hook as Arc<dyn OnShutdown>);
        self
    }

    pub fn init(&self) -> Option<&Arc<dyn OnInit>> {
        self.init.as_ref()
    }

    pub fn start(&self) -> Option<&Arc<dyn OnStart>> {
        self.start.as_ref()
    }

    pub fn shutdown(&self) -> Option<&Arc<dyn OnShutdown>> {
        self.shutdown.as_ref()
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("init", &self.init.is_some())
            .field("start", &self.start.is_some())
            .field("shutdown", &self.shutdown.is_some())
            .finish()
    }
}
