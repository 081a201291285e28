//! Component registry
//!
//! An immutable table of [`ComponentDescriptor`]s indexed by component name,
//! interface type and implementation type. The registry is built once at
//! startup, either from an explicit descriptor list or from the static table
//! filled by [`register!`](crate::register).

mod descriptor;
mod graph;
mod key;

pub use descriptor::{AnyHandle, ComponentDescriptor};
pub use key::{TypeKey, TypeShape};

use crate::error::{Result, WeaverError};
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Entry of the static registration table.
///
/// Submitted by [`register!`](crate::register); collected by
/// [`Registry::registered`].
pub struct Registration {
    pub name: &'static str,
    pub build: fn() -> ComponentDescriptor,
}

inventory::collect!(Registration);

#[derive(Default)]
pub struct Registry {
    descriptors: Vec<Arc<ComponentDescriptor>>,
    by_name: HashMap<String, Arc<ComponentDescriptor>>,
    by_interface: HashMap<TypeId, Arc<ComponentDescriptor>>,
    by_implementation: HashMap<TypeId, Arc<ComponentDescriptor>>,
}

impl Registry {
    /// Build a registry from `descriptors` and reject dependency cycles.
    pub fn new(descriptors: impl IntoIterator<Item = ComponentDescriptor>) -> Result<Self> {
        let mut registry = Self::default();
        for descriptor in descriptors {
            registry.register(descriptor)?;
        }
        registry.validate()?;
        Ok(registry)
    }

    /// Build a registry from every descriptor submitted with [`register!`](crate::register).
    pub fn registered() -> Result<Self> {
        Self::new(inventory::iter::<Registration>.into_iter().map(|entry| {
            tracing::debug!(component = entry.name, "Collecting registered component");
            (entry.build)()
        }))
    }

    /// Add a descriptor.
    ///
    /// A descriptor whose name is already taken replaces the previous entry.
    pub fn register(&mut self, descriptor: ComponentDescriptor) -> Result<()> {
        descriptor.verify()?;

        let descriptor = Arc::new(descriptor);
        if let Some(previous) = self
            .by_name
            .insert(descriptor.name().to_string(), Arc::clone(&descriptor))
        {
            tracing::warn!(component = descriptor.name(), "Replacing registered component");
            self.descriptors.retain(|d| !Arc::ptr_eq(d, &previous));
            self.descriptors.push(descriptor);
            self.reindex();
            return Ok(());
        }
        self.index(&descriptor);
        self.descriptors.push(descriptor);
        Ok(())
    }

    fn index(&mut self, descriptor: &Arc<ComponentDescriptor>) {
        self.by_interface
            .insert(descriptor.interface().id(), Arc::clone(descriptor));
        self.by_implementation
            .insert(descriptor.implementation().id(), Arc::clone(descriptor));
    }

    // Later registrations win a shared interface or implementation slot.
    fn reindex(&mut self) {
        self.by_interface.clear();
        self.by_implementation.clear();
        for descriptor in self.descriptors.clone() {
            self.index(&descriptor);
        }
    }

    /// Reject registrations whose declared references form a cycle.
    pub fn validate(&self) -> Result<()> {
        match graph::find_cycle(&self.descriptors) {
            None => Ok(()),
            Some(members) => Err(WeaverError::registration(
                members.join(", "),
                "dependency cycle between components",
            )),
        }
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Arc<ComponentDescriptor>> {
        self.by_name.get(name)
    }

    pub fn find_by_interface(&self, key: &TypeKey) -> Option<&Arc<ComponentDescriptor>> {
        self.by_interface.get(&key.id())
    }

    pub fn find_by_implementation(&self, key: &TypeKey) -> Option<&Arc<ComponentDescriptor>> {
        self.by_implementation.get(&key.id())
    }

    /// Every registered descriptor, in registration order
    pub fn list(&self) -> &[Arc<ComponentDescriptor>] {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field(
                "components",
                &self.descriptors.iter().map(|d| d.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Add a component to the static registration table.
///
/// ```rust,ignore
/// weaver::register!(dyn Chat => ChatImpl, "hello/chat.Chat");
/// weaver::register!(main App, "hello.App");
/// ```
#[macro_export]
macro_rules! register {
    (main $impl:ty, $name:expr) => {
        $crate::register!(dyn $crate::Main => $impl, $name);
    };
    ($iface:ty => $impl:ty, $name:expr) => {
        $crate::inventory::submit! {
            $crate::registry::Registration {
                name: $name,
                build: || $crate::descriptor!($iface => $impl, $name),
            }
        }
    };
}
