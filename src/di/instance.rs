use crate::di::Component;
use crate::lifecycle::{Hooks, InstanceState};
use crate::registry::AnyHandle;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// A built component held in the container's cache
pub struct Instance {
    name: String,
    component: Arc<dyn Component>,
    hooks: Hooks,
    state: Mutex<InstanceState>,
}

impl Instance {
    /// Wrap a component whose fields are bound. Its hooks are probed once,
    /// here; the container moves it to `Initialized` after Init succeeds.
    pub(crate) fn new(name: impl Into<String>, component: Arc<dyn Component>) -> Self {
        let hooks = Arc::clone(&component).hooks();
        Self {
            name: name.into(),
            component,
            hooks,
            state: Mutex::new(InstanceState::ReferencesBound),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn component(&self) -> &Arc<dyn Component> {
        &self.component
    }

    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    pub fn state(&self) -> InstanceState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Erased handle to the implementation, for downcasting
    pub fn handle(&self) -> AnyHandle {
        Arc::clone(&self.component).into_any()
    }

    pub(crate) fn transition(&self, next: InstanceState) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if !state.can_transition(next) {
            tracing::warn!(
                component = %self.name,
                from = %*state,
                to = %next,
                "Unexpected lifecycle transition"
            );
        }
        tracing::trace!(component = %self.name, from = %*state, to = %next, "Lifecycle transition");
        *state = next;
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("name", &self.name)
            .field("state", &self.state())
            .field("hooks", &self.hooks)
            .finish()
    }
}
