//! Lifecycle-specific error types

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// A Start task that did not return cleanly
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StartFault {
    #[error("{component} failed to start: {message}")]
    Failed { component: String, message: String },

    #[error("{component} panicked while running: {message}")]
    Panicked { component: String, message: String },

    #[error("{component} start task was aborted")]
    Aborted { component: String },
}

impl StartFault {
    pub fn component(&self) -> &str {
        match self {
            Self::Failed { component, .. }
            | Self::Panicked { component, .. }
            | Self::Aborted { component } => component,
        }
    }
}

/// A component whose Shutdown hook did not complete cleanly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownFailure {
    pub component: String,
    pub message: String,
}

/// Outcome of a Shutdown pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Components whose Shutdown hook was invoked, in call order
    pub invoked: Vec<String>,
    pub failures: Vec<ShutdownFailure>,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for ShutdownReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} components failed to shut down",
            self.failures.len(),
            self.invoked.len()
        )?;
        for failure in &self.failures {
            write!(f, "; {}: {}", failure.component, failure.message)?;
        }
        Ok(())
    }
}

/// Errors that can occur during lifecycle operations
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// One or more Start tasks failed; the run was cancelled.
    ///
    /// `shutdown` holds the report of the Shutdown pass that followed, when
    /// the error comes from a stop.
    #[error("{} component(s) faulted during start: {}{}", faults.len(), join(faults), shutdown_note(shutdown))]
    Start {
        faults: Vec<StartFault>,
        shutdown: ShutdownReport,
    },

    #[error("Shutdown failed: {0}")]
    Shutdown(ShutdownReport),

    /// Operation timed out
    #[error("Timeout during {phase} after {after:?}")]
    Timeout { phase: String, after: Duration },
}

impl LifecycleError {
    pub fn start(faults: Vec<StartFault>) -> Self {
        Self::Start {
            faults,
            shutdown: ShutdownReport::default(),
        }
    }

    pub fn timeout(phase: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            phase: phase.into(),
            after,
        }
    }

    /// Faults collected from the Start phase, if this is a start error
    pub fn faults(&self) -> &[StartFault] {
        match self {
            Self::Start { faults, .. } => faults,
            _ => &[],
        }
    }
}

fn join(faults: &[StartFault]) -> String {
    faults
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn shutdown_note(report: &ShutdownReport) -> String {
    if report.is_clean() {
        String::new()
    } else {
        format!(" (then {report})")
    }
}

/// A specialized Result type for lifecycle operations
pub type Result<T> = std::result::Result<T, LifecycleError>;
