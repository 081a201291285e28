//! Configuration fields of components

use serde::de::DeserializeOwned;
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};
use strum::IntoEnumIterator;

/// Annotations that name a field's binding key, in lookup order
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::EnumIter, strum_macros::AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum BindingTag {
    Weaver,
    Config,
    Conf,
}

/// `(annotation, key)` pairs attached to a configuration field
pub type Tags = &'static [(&'static str, &'static str)];

/// Pick the binding key: the first recognized annotation, in [`BindingTag`]
/// order, that carries a non-empty value.
pub fn binding_key(tags: Tags) -> Option<&'static str> {
    BindingTag::iter().find_map(|tag| {
        tags.iter()
            .find(|(name, key)| *name == tag.as_ref() && !key.is_empty())
            .map(|(_, key)| *key)
    })
}

/// Destination of a decoded configuration subtree
pub trait ConfigTarget: Send + Sync {
    /// Decode `value` and store it. On error the stored value is unchanged.
    fn apply(&self, value: serde_json::Value) -> Result<(), serde_json::Error>;

    /// Name of the decoded type, for diagnostics
    fn type_name(&self) -> &'static str;
}

/// Embeddable configuration holder.
///
/// Starts at `C::default()` and is overwritten by the container when the
/// field's binding key is present in the configuration source. Re-bound in
/// place on hot reload, so readers always see a complete value.
pub struct WithConfig<C> {
    cell: Arc<RwLock<C>>,
}

impl<C> WithConfig<C> {
    pub fn new(config: C) -> Self {
        Self {
            cell: Arc::new(RwLock::new(config)),
        }
    }

    /// Read access to the current configuration
    pub fn config(&self) -> RwLockReadGuard<'_, C> {
        self.cell.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the current configuration
    pub fn get(&self) -> C
    where
        C: Clone,
    {
        self.config().clone()
    }
}

impl<C> WithConfig<C>
where
    C: DeserializeOwned + Send + Sync + 'static,
{
    /// The configuration-target accessor used by the injector
    pub fn target(&self) -> Arc<dyn ConfigTarget> {
        Arc::new(Cell(Arc::clone(&self.cell)))
    }
}

impl<C: Default> Default for WithConfig<C> {
    fn default() -> Self {
        Self::new(C::default())
    }
}

impl<C: fmt::Debug> fmt::Debug for WithConfig<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WithConfig").field(&*self.config()).finish()
    }
}

struct Cell<C>(Arc<RwLock<C>>);

impl<C> ConfigTarget for Cell<C>
where
    C: DeserializeOwned + Send + Sync + 'static,
{
    fn apply(&self, value: serde_json::Value) -> Result<(), serde_json::Error> {
        let decoded: C = serde_json::from_value(value)?;
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = decoded;
        Ok(())
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<C>()
    }
}

/// Privileged setter for a configuration field the component keeps private.
///
/// The component decides how the decoded value is stored; the container only
/// calls the setter.
///
/// ```rust,ignore
/// let limits = Arc::clone(&self.limits);
/// ConfigField::setter("limits", &[("conf", "limits")], ConfigSetter::new(move |value: Limits| {
///     *limits.write().unwrap() = value;
/// }))
/// ```
pub struct ConfigSetter<C, F> {
    set: F,
    _config: PhantomData<fn(C)>,
}

impl<C, F> ConfigSetter<C, F>
where
    C: DeserializeOwned + 'static,
    F: Fn(C) + Send + Sync + 'static,
{
    pub fn new(set: F) -> Self {
        Self {
            set,
            _config: PhantomData,
        }
    }
}

impl<C, F> ConfigTarget for ConfigSetter<C, F>
where
    C: DeserializeOwned + 'static,
    F: Fn(C) + Send + Sync + 'static,
{
    fn apply(&self, value: serde_json::Value) -> Result<(), serde_json::Error> {
        let decoded: C = serde_json::from_value(value)?;
        (self.set)(decoded);
        Ok(())
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<C>()
    }
}

/// How a configuration field is reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum FieldShape {
    /// An embedded [`WithConfig`], bound through its own accessor
    Embedded,
    /// A private field, bound through a [`ConfigSetter`]
    Private,
}

/// A configuration field declared by a component
#[derive(Clone)]
pub struct ConfigField {
    name: &'static str,
    tags: Tags,
    shape: FieldShape,
    target: Arc<dyn ConfigTarget>,
}

impl ConfigField {
    pub fn embedded<C>(name: &'static str, tags: Tags, config: &WithConfig<C>) -> Self
    where
        C: DeserializeOwned + Send + Sync + 'static,
    {
        Self {
            name,
            tags,
            shape: FieldShape::Embedded,
            target: config.target(),
        }
    }

    pub fn setter<C, F>(name: &'static str, tags: Tags, setter: ConfigSetter<C, F>) -> Self
    where
        C: DeserializeOwned + 'static,
        F: Fn(C) + Send + Sync + 'static,
    {
        Self {
            name,
            tags,
            shape: FieldShape::Private,
            target: Arc::new(setter),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn tags(&self) -> Tags {
        self.tags
    }

    pub fn shape(&self) -> FieldShape {
        self.shape
    }

    pub fn key(&self) -> Option<&'static str> {
        binding_key(self.tags)
    }

    pub(crate) fn target(&self) -> &Arc<dyn ConfigTarget> {
        &self.target
    }
}

impl fmt::Debug for ConfigField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigField")
            .field("name", &self.name)
            .field("tags", &self.tags)
            .field("shape", &self.shape)
            .field("target", &self.target.type_name())
            .finish()
    }
}
