//! Lifecycle Hooks Module
//!
//! This module drives components through their lifecycle phases.
//!
//! # Lifecycle Phases
//!
//! ```text
//! 1. Configuration Loading
//!    ↓
//! 2. Resolution of the root component
//!    ├─ Allocate (Default)
//!    ├─ Bind configuration fields
//!    ├─ Resolve references (recursively)
//!    └─ OnInit                          ← Lifecycle Hook, once per component
//!    ↓
//! 3. OnStart (all components, concurrently) ← Lifecycle Hook
//!    ↓
//! [Running... until the callback returns, a signal arrives,
//!             or a Start task fails]
//!    ↓
//! 4. Cancellation of the run token
//!    ↓
//! 5. OnShutdown (reverse creation order) ← Lifecycle Hook
//! ```
//!
//! A configuration reload re-runs step 1, rebinds every configuration field,
//! then runs 5 followed by 3.
//!
//! # Example
//!
//! ```rust,ignore
//! use weaver::lifecycle::{Hooks, OnInit, OnShutdown};
//! use async_trait::async_trait;
//!
//! impl Component for DatabaseImpl {
//!     // ...
//!     fn hooks(self: Arc<Self>) -> Hooks {
//!         Hooks::new().with_init(Arc::clone(&self)).with_shutdown(self)
//!     }
//! }
//!
//! #[async_trait]
//! impl OnInit for DatabaseImpl {
//!     async fn init(&self, _ctx: &CancellationToken) -> anyhow::Result<()> {
//!         tracing::info!("Initializing database connection");
//!         Ok(())
//!     }
//! }
//!
//! #[async_trait]
//! impl OnShutdown for DatabaseImpl {
//!     async fn shutdown(&self, _ctx: &CancellationToken) -> anyhow::Result<()> {
//!         tracing::info!("Closing database connections");
//!         Ok(())
//!     }
//! }
//! ```

mod application;
mod error;
mod orchestrator;
mod shutdown;
mod state;
mod traits;

pub use application::{Application, ApplicationBuilder, CONFIG_ENV};
pub use error::{LifecycleError, Result, ShutdownFailure, ShutdownReport, StartFault};
pub use orchestrator::Orchestrator;
pub use shutdown::{cancel_on_signal, shutdown_signal};
pub use state::InstanceState;
pub use traits::{Hooks, OnInit, OnShutdown, OnStart};
