use crate::di::{ConfigField, Reference};
use crate::lifecycle::Hooks;
use crate::logging::Logger;
use std::any::Any;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Conversion of a shared component into an erased handle.
///
/// Implemented for every `'static` type; it lets the container downcast a
/// `dyn Component` back to its implementation.
pub trait IntoAny: Any + Send + Sync {
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> IntoAny for T {
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// The capability contract between a component implementation and the container.
///
/// The container allocates the implementation with `Default`, then calls the
/// setters and enumerations below exactly once, in this order:
/// [`set_logger`](Self::set_logger), [`set_cancel`](Self::set_cancel),
/// [`config_fields`](Self::config_fields), [`references`](Self::references),
/// and finally [`hooks`](Self::hooks) once the instance is shared.
///
/// This trait is usually implemented with `#[derive(Component)]`.
///
/// # Example
/// ```rust,ignore
/// use weaver::{Base, Component, Logger, Ref, Reference};
///
/// #[derive(Default)]
/// pub struct UserImpl {
///     base: Base,
///     chat: Ref<dyn Chat>,
/// }
///
/// impl Component for UserImpl {
///     fn set_logger(&mut self, logger: Logger) {
///         self.base.set_logger(logger);
///     }
///
///     fn references(&self) -> Vec<&dyn Reference> {
///         vec![&self.chat as &dyn Reference]
///     }
/// }
/// ```
pub trait Component: IntoAny {
    /// Receive the component's logger
    fn set_logger(&mut self, logger: Logger);

    /// Receive the token that cancels the whole run
    fn set_cancel(&mut self, _token: CancellationToken) {}

    /// Configuration fields to bind from the configuration source
    fn config_fields(&self) -> Vec<ConfigField> {
        Vec::new()
    }

    /// Declared dependencies on other components
    fn references(&self) -> Vec<&dyn Reference> {
        Vec::new()
    }

    /// Lifecycle hooks this component takes part in
    fn hooks(self: Arc<Self>) -> Hooks {
        Hooks::default()
    }
}

/// Marker for the root component of an application.
///
/// The root is registered under `dyn Main` (see [`descriptor!`](crate::descriptor))
/// and handed to the application callback once the graph is built.
pub trait Main: Send + Sync {}

/// Logger and run-cancellation storage for component implementations.
///
/// Embed it and forward the setters to it, or let `#[derive(Component)]` do so.
#[derive(Debug, Default)]
pub struct Base {
    logger: Logger,
    cancel: Option<CancellationToken>,
}

impl Base {
    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn set_logger(&mut self, logger: Logger) {
        self.logger = logger;
    }

    pub fn set_cancel(&mut self, token: CancellationToken) {
        self.cancel = Some(token);
    }

    /// Token cancelled when the run ends
    pub fn run_token(&self) -> Option<&CancellationToken> {
        self.cancel.as_ref()
    }

    /// Abort the whole run: every Start task and the application callback
    /// observe cancellation.
    pub fn cancel_run(&self) {
        match &self.cancel {
            Some(token) => token.cancel(),
            None => tracing::warn!(
                component = self.logger.component(),
                "cancel_run called before the component was wired"
            ),
        }
    }
}
