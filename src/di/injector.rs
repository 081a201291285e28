//! Field injection: configuration binding and reference wiring

use crate::config::ConfigSource;
use crate::di::{Component, ConfigField};
use crate::di::config::ConfigTarget;
use crate::error::{ConfigBindError, Result, WeaverError};
use crate::registry::{AnyHandle, TypeKey};
use async_trait::async_trait;
use std::sync::Arc;

/// A bound configuration field, kept so a reload can bind it again
pub(crate) struct ConfigSubscriber {
    component: String,
    field: &'static str,
    key: &'static str,
    target: Arc<dyn ConfigTarget>,
}

impl ConfigSubscriber {
    /// Fetch the subtree for this field's key and decode it into the field.
    ///
    /// Returns `Ok(false)` when the source has no value under the key.
    pub(crate) fn bind(&self, source: &dyn ConfigSource) -> std::result::Result<bool, ConfigBindError> {
        let subtree = source
            .subtree(self.key)
            .map_err(|err| ConfigBindError::Source {
                key: self.key.to_string(),
                message: err.to_string(),
            })?;
        let Some(value) = subtree else {
            return Ok(false);
        };
        self.target
            .apply(value)
            .map_err(|source| ConfigBindError::Decode {
                key: self.key.to_string(),
                target: self.target.type_name(),
                source,
            })?;
        Ok(true)
    }

    /// [`bind`](Self::bind), logging the outcome. Failures are never fatal.
    pub(crate) fn bind_logged(&self, source: &dyn ConfigSource) {
        match self.bind(source) {
            Ok(true) => tracing::debug!(
                component = %self.component,
                field = self.field,
                key = self.key,
                "Configuration bound"
            ),
            Ok(false) => tracing::debug!(
                component = %self.component,
                field = self.field,
                key = self.key,
                "No configuration under key, keeping defaults"
            ),
            Err(err) => tracing::warn!(
                component = %self.component,
                field = self.field,
                error = %err,
                "Failed to bind configuration, keeping previous value"
            ),
        }
    }
}

/// Bind every configuration field of `component` from `source`.
///
/// Fields without a recognized binding annotation keep their default value
/// and produce a diagnostic. Returns one subscriber per keyed field.
pub(crate) fn bind_config(
    name: &str,
    component: &dyn Component,
    source: &dyn ConfigSource,
) -> Vec<ConfigSubscriber> {
    component
        .config_fields()
        .into_iter()
        .filter_map(|field| subscriber(name, field))
        .inspect(|subscriber| subscriber.bind_logged(source))
        .collect()
}

fn subscriber(name: &str, field: ConfigField) -> Option<ConfigSubscriber> {
    let Some(key) = field.key() else {
        tracing::debug!(
            component = name,
            field = field.name(),
            tags = ?field.tags(),
            "No binding annotation on configuration field, keeping defaults"
        );
        return None;
    };
    Some(ConfigSubscriber {
        component: name.to_string(),
        field: field.name(),
        key,
        target: Arc::clone(field.target()),
    })
}

/// Source of resolved components for reference wiring
#[async_trait]
pub(crate) trait Resolve: Send {
    /// Build or fetch the component registered for `interface`, cast to it.
    async fn resolve_interface(&mut self, interface: &TypeKey) -> Result<AnyHandle>;
}

/// Resolve and install every declared reference of `component`.
pub(crate) async fn bind_references(
    name: &str,
    component: &dyn Component,
    resolver: &mut dyn Resolve,
) -> Result<()> {
    for reference in component.references() {
        let target = reference.target();
        let handle = resolver.resolve_interface(&target).await.map_err(|err| match err {
            WeaverError::Resolution { type_name } => {
                WeaverError::resolution(format!("{type_name} (referenced by {name})"))
            }
            other => other,
        })?;
        reference.wire(handle)?;
        tracing::trace!(component = name, reference = %target, "Reference wired");
    }
    Ok(())
}
