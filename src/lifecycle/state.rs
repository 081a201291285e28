/// Lifecycle state of a component instance
///
/// ```text
/// Unbuilt → Allocated → ConfigBound → ReferencesBound → Initialized
///         → Started → Running → ShuttingDown → Shutdown
/// ```
///
/// Only instances that reached `Initialized` are cached; earlier failures
/// discard the instance. A config reload moves `Shutdown` back to `Started`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, strum_macros::Display)]
pub enum InstanceState {
    Unbuilt,
    Allocated,
    ConfigBound,
    ReferencesBound,
    Initialized,
    Started,
    Running,
    ShuttingDown,
    Shutdown,
}

impl InstanceState {
    /// Whether `next` is a legal successor of `self`
    pub fn can_transition(self, next: InstanceState) -> bool {
        use InstanceState::*;

        matches!(
            (self, next),
            (Unbuilt, Allocated)
                | (Allocated, ConfigBound)
                | (Allocated | ConfigBound, ReferencesBound)
                | (ReferencesBound, Initialized)
                | (Initialized | Shutdown, Started)
                | (Started, Running)
                | (Initialized | Started | Running, ShuttingDown)
                | (ShuttingDown, Shutdown)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::InstanceState::*;

    #[test]
    fn test_build_path() {
        assert!(Unbuilt.can_transition(Allocated));
        assert!(Allocated.can_transition(ConfigBound));
        assert!(Allocated.can_transition(ReferencesBound));
        assert!(ReferencesBound.can_transition(Initialized));
        assert!(!Allocated.can_transition(Initialized));
    }

    #[test]
    fn test_run_path() {
        assert!(Initialized.can_transition(Started));
        assert!(Started.can_transition(Running));
        assert!(Running.can_transition(ShuttingDown));
        assert!(Initialized.can_transition(ShuttingDown));
        assert!(ShuttingDown.can_transition(Shutdown));
        assert!(Shutdown.can_transition(Started));
        assert!(!Shutdown.can_transition(Running));
    }
}
