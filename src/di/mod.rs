//! Dependency injection
//!
//! Components declare what they need as fields: a [`Base`] for the logger and
//! run token, [`WithConfig`] cells bound from the configuration source, and
//! [`Ref`] handles to other components. The [`Container`] fills them in and
//! caches one instance per component.

mod builder;
mod component;
mod config;
mod container;
mod injector;
mod instance;
mod reference;

pub use builder::ContainerBuilder;
pub use component::{Base, Component, IntoAny, Main};
pub use config::{
    binding_key, BindingTag, ConfigField, ConfigSetter, ConfigTarget, FieldShape, Tags, WithConfig,
};
pub use container::Container;
pub use instance::Instance;
pub use reference::{Ref, Reference};
