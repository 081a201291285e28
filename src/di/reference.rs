use crate::error::{Result, WeaverError};
use crate::registry::{AnyHandle, TypeKey};
use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, OnceLock};

/// A declared dependency on the component registered for interface `T`.
///
/// The container fills the reference while wiring the owning component, so
/// by the time `Init` runs the target is available. The target is held by
/// shared handle: every holder sees the same singleton.
///
/// # Panics
///
/// Dereferencing a `Ref` that was never wired panics. Use [`Ref::try_get`]
/// in code that may run outside the container.
pub struct Ref<T: ?Sized + Send + Sync + 'static> {
    target: OnceLock<Arc<T>>,
}

impl<T: ?Sized + Send + Sync + 'static> Ref<T> {
    pub fn new() -> Self {
        Self {
            target: OnceLock::new(),
        }
    }

    /// A reference already pointing at `target`, for tests and manual wiring
    pub fn with(target: Arc<T>) -> Self {
        let reference = Self::new();
        let _ = reference.target.set(target);
        reference
    }

    pub fn try_get(&self) -> Option<&Arc<T>> {
        self.target.get()
    }

    /// Clone of the shared handle to the target
    pub fn get(&self) -> Arc<T> {
        Arc::clone(self.expect_wired())
    }

    fn expect_wired(&self) -> &Arc<T> {
        self.target.get().unwrap_or_else(|| {
            panic!(
                "reference to '{}' used before it was wired",
                std::any::type_name::<T>()
            )
        })
    }
}

impl<T: ?Sized + Send + Sync + 'static> Default for Ref<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized + Send + Sync + 'static> Deref for Ref<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.expect_wired()
    }
}

impl<T: ?Sized + Send + Sync + 'static> fmt::Debug for Ref<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ref")
            .field("target", &std::any::type_name::<T>())
            .field("wired", &self.target.get().is_some())
            .finish()
    }
}

/// Setter capability of a reference field, used by the injector
pub trait Reference: Send + Sync {
    /// Interface the reference points at
    fn target(&self) -> TypeKey;

    fn is_wired(&self) -> bool;

    /// Install the resolved target. `handle` must hold an `Arc<T>`.
    fn wire(&self, handle: AnyHandle) -> Result<()>;
}

impl<T: ?Sized + Send + Sync + 'static> Reference for Ref<T> {
    fn target(&self) -> TypeKey {
        TypeKey::of::<T>()
    }

    fn is_wired(&self) -> bool {
        self.target.get().is_some()
    }

    fn wire(&self, handle: AnyHandle) -> Result<()> {
        let wrapper = handle.downcast::<Arc<T>>().map_err(|_| {
            WeaverError::wiring(
                std::any::type_name::<T>(),
                "resolved component does not implement the referenced interface",
            )
        })?;
        // A reference is wired once; later calls keep the first target.
        let _ = self.target.set(Arc::clone(&wrapper));
        Ok(())
    }
}
