//! # Weaver
//!
//! Component wiring and lifecycle orchestration for modular Rust applications.
//!
//! An application is a set of components, each exposed through a trait
//! object. Weaver builds every component once, binds its configuration from
//! a hierarchical source, wires its references to other components, and then
//! drives all of them through Init, Start and Shutdown.
//!
//! ## Features
//!
//! - **Declarative wiring**: `Ref<dyn Trait>` fields are resolved and injected
//! - **Configuration binding**: `WithConfig<T>` fields are filled from TOML,
//!   JSON or environment variables, and rebound on hot-reload
//! - **Lifecycle**: async `OnInit`, `OnStart` and `OnShutdown` hooks with
//!   fault isolation and cancellation
//! - **Static registration**: `register!` collects components at link time
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use weaver::prelude::*;
//!
//! // 1. Define an interface and its implementation
//! pub trait Chat: Send + Sync {
//!     fn greeting(&self) -> String;
//! }
//!
//! #[derive(Deserialize, Default, Clone)]
//! pub struct ChatConfig {
//!     greeting: String,
//! }
//!
//! #[derive(Component, Default)]
//! pub struct ChatImpl {
//!     base: Base,
//!     #[weaver = "chat"]
//!     config: WithConfig<ChatConfig>,
//! }
//!
//! impl Chat for ChatImpl {
//!     fn greeting(&self) -> String {
//!         self.config.config().greeting.clone()
//!     }
//! }
//!
//! // 2. Define the root
//! #[derive(Component, Default)]
//! #[component(main)]
//! pub struct App {
//!     base: Base,
//!     chat: Ref<dyn Chat>,
//! }
//!
//! // 3. Register both
//! weaver::register!(dyn Chat => ChatImpl, "chat");
//! weaver::register!(main App, "app");
//!
//! // 4. Run
//! #[tokio::main]
//! async fn main() -> weaver::Result<()> {
//!     Application::builder()
//!         .config_from_env()
//!         .build()?
//!         .run::<App, _, _>(|_ctx, app| async move {
//!             println!("{}", app.chat.greeting());
//!             Ok(())
//!         })
//!         .await
//! }
//! ```

// Lets `#[derive(Component)]` output name `::weaver` from inside this crate.
extern crate self as weaver;

pub mod config;
pub mod di;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod registry;

// Re-export core types
pub use config::{ConfigSource, ConfigWatcher, FileSource, FrameworkOptions, ValueSource};
pub use di::{
    Base, Component, ConfigField, ConfigSetter, Container, ContainerBuilder, Instance, Main, Ref,
    Reference, WithConfig,
};
pub use error::{ConfigBindError, Result, WeaverError};
pub use lifecycle::{Application, ApplicationBuilder, Hooks, OnInit, OnShutdown, OnStart};
pub use logging::{Logger, MakeLogger};
pub use registry::{ComponentDescriptor, Registry};

// Re-export macros
pub use weaver_macro::Component;

// Re-export commonly used types from dependencies
pub use async_trait::async_trait;
pub use inventory;
pub use tokio_util::sync::CancellationToken;

/// Prelude module for convenient imports
///
/// ```
/// use weaver::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{ConfigSource, FileSource, ValueSource};
    pub use crate::Component;
    pub use crate::di::{
        Base, ConfigField, ConfigSetter, Container, ContainerBuilder, Main, Ref, Reference,
        WithConfig,
    };
    pub use crate::error::{Result, WeaverError};
    pub use crate::lifecycle::{
        Application, ApplicationBuilder, Hooks, LifecycleError, OnInit, OnShutdown, OnStart,
        shutdown_signal,
    };
    pub use crate::logging::Logger;
    pub use crate::registry::{ComponentDescriptor, Registry};
    pub use crate::{descriptor, register};
    pub use async_trait::async_trait;
    pub use serde::Deserialize;
    pub use std::sync::Arc;
    pub use tokio_util::sync::CancellationToken;
}
