use super::TypeKey;
use crate::di::Component;
use crate::error::{Result, WeaverError};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Handle to a built component, erased for storage in the container
pub type AnyHandle = Arc<dyn Any + Send + Sync>;

/// Turns an implementation handle into an `Arc<Interface>`, wrapped in an [`AnyHandle`].
type CasterFn = Arc<dyn Fn(AnyHandle) -> Option<AnyHandle> + Send + Sync>;

/// Static registration metadata for a component.
///
/// Use [`descriptor!`](crate::descriptor) to build one without spelling out
/// the caster:
///
/// ```rust,ignore
/// let chat = weaver::descriptor!(dyn Chat => ChatImpl, "hello/chat.Chat");
/// ```
pub struct ComponentDescriptor {
    name: String,
    interface: TypeKey,
    implementation: TypeKey,
    routed: bool,
    listeners: Vec<String>,
    dependencies: Vec<TypeKey>,
    allocate: fn() -> Box<dyn Component>,
    caster: CasterFn,
}

impl ComponentDescriptor {
    /// Describe implementation `C` exposed through interface `I`.
    ///
    /// The declared references of `C` are read from a default-allocated probe
    /// instance, so `Default` must stay free of side effects.
    pub fn new<I, C, F>(name: impl Into<String>, caster: F) -> Self
    where
        I: ?Sized + Send + Sync + 'static,
        C: Component + Default,
        F: Fn(Arc<C>) -> Arc<I> + Send + Sync + 'static,
    {
        let dependencies = C::default()
            .references()
            .iter()
            .map(|reference| reference.target())
            .collect();

        let caster: CasterFn = Arc::new(move |instance: AnyHandle| {
            let concrete = instance.downcast::<C>().ok()?;
            let interface: Arc<I> = caster(concrete);
            Some(Arc::new(interface) as AnyHandle)
        });

        Self {
            name: name.into(),
            interface: TypeKey::of::<I>(),
            implementation: TypeKey::of::<C>(),
            routed: false,
            listeners: Vec::new(),
            dependencies,
            allocate: || Box::new(C::default()) as Box<dyn Component>,
            caster,
        }
    }

    pub fn routed(mut self, routed: bool) -> Self {
        self.routed = routed;
        self
    }

    pub fn listeners<S: Into<String>>(mut self, listeners: impl IntoIterator<Item = S>) -> Self {
        self.listeners = listeners.into_iter().map(Into::into).collect();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn interface(&self) -> TypeKey {
        self.interface
    }

    pub fn implementation(&self) -> TypeKey {
        self.implementation
    }

    pub fn is_routed(&self) -> bool {
        self.routed
    }

    pub fn listener_names(&self) -> &[String] {
        &self.listeners
    }

    /// Interfaces this component holds references to
    pub fn dependencies(&self) -> &[TypeKey] {
        &self.dependencies
    }

    pub(crate) fn allocate(&self) -> Box<dyn Component> {
        (self.allocate)()
    }

    /// Cast a built instance to its interface, still erased: the handle holds an `Arc<I>`.
    pub(crate) fn cast(&self, instance: AnyHandle) -> Result<AnyHandle> {
        (self.caster)(instance).ok_or_else(|| {
            WeaverError::wiring(
                &self.name,
                format!("instance is not a {}", self.implementation),
            )
        })
    }

    /// Cast a built instance to `Arc<I>`
    pub(crate) fn cast_to<I: ?Sized + Send + Sync + 'static>(
        &self,
        instance: AnyHandle,
    ) -> Result<Arc<I>> {
        let wrapper = self
            .cast(instance)?
            .downcast::<Arc<I>>()
            .map_err(|_| {
                WeaverError::wiring(
                    &self.name,
                    format!("interface is {}, not {}", self.interface, std::any::type_name::<I>()),
                )
            })?;
        Ok(wrapper.as_ref().clone())
    }

    pub(crate) fn verify(&self) -> Result<()> {
        use super::TypeShape;

        if self.interface.shape() != TypeShape::Interface {
            return Err(WeaverError::registration(
                &self.name,
                format!("component type {} is not an interface", self.interface),
            ));
        }
        if self.implementation.shape() != TypeShape::Struct {
            return Err(WeaverError::registration(
                &self.name,
                format!("implementation type {} is not a struct", self.implementation),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for ComponentDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDescriptor")
            .field("name", &self.name)
            .field("interface", &self.interface.name())
            .field("implementation", &self.implementation.name())
            .field("routed", &self.routed)
            .field("listeners", &self.listeners)
            .field("dependencies", &self.dependencies)
            .finish()
    }
}

/// Build a [`ComponentDescriptor`] for `Impl` exposed as `dyn Interface`.
///
/// ```rust,ignore
/// weaver::descriptor!(dyn Chat => ChatImpl, "hello/chat.Chat");
/// weaver::descriptor!(main App, "hello.App");
/// ```
#[macro_export]
macro_rules! descriptor {
    (main $impl:ty, $name:expr) => {
        $crate::descriptor!(dyn $crate::Main => $impl, $name)
    };
    ($iface:ty => $impl:ty, $name:expr) => {
        $crate::registry::ComponentDescriptor::new::<$iface, $impl, _>(
            $name,
            |instance: ::std::sync::Arc<$impl>| instance as ::std::sync::Arc<$iface>,
        )
    };
}
