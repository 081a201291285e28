use crate::lifecycle::LifecycleError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, WeaverError>;

#[derive(Debug, Error)]
pub enum WeaverError {
    #[error("Registration of {component:?} failed: {message}")]
    Registration { component: String, message: String },

    #[error("Component not found: {type_name}")]
    Resolution { type_name: String },

    #[error("Failed to wire {component:?}: {message}")]
    Wiring { component: String, message: String },

    #[error("Component {component:?} initialization failed: {source}")]
    Init {
        component: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("Application failed: {0}")]
    App(#[source] anyhow::Error),
}

impl WeaverError {
    pub fn registration(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Registration {
            component: component.into(),
            message: message.into(),
        }
    }

    pub fn resolution(type_name: impl Into<String>) -> Self {
        Self::Resolution {
            type_name: type_name.into(),
        }
    }

    pub fn wiring(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Wiring {
            component: component.into(),
            message: message.into(),
        }
    }
}

impl From<figment::Error> for WeaverError {
    fn from(err: figment::Error) -> Self {
        WeaverError::Config(err.to_string())
    }
}

/// Failure to bind a configuration subtree into a component field.
///
/// Never fatal: the field keeps its previous (or default) value.
#[derive(Debug, Error)]
pub enum ConfigBindError {
    #[error("lookup of key {key:?} failed: {message}")]
    Source { key: String, message: String },

    #[error("cannot decode key {key:?} into {target}: {source}")]
    Decode {
        key: String,
        target: &'static str,
        #[source]
        source: serde_json::Error,
    },
}
