//! Lifecycle Orchestrator
//!
//! Drives the Start and Shutdown phases over a set of built instances.

use super::{InstanceState, LifecycleError, Result, ShutdownFailure, ShutdownReport, StartFault};
use crate::di::Instance;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Runs Start as a fan-out/fan-in and Shutdown as an independent sweep.
///
/// Every Start task shares the cycle token it is given; the first task that
/// fails or panics cancels the root run token, which also cancels the cycle.
///
/// # Example
///
/// ```rust,ignore
/// let orchestrator = Orchestrator::new(root.clone());
/// let cycle = root.child_token();
///
/// let started = orchestrator.start(&instances, &cycle).await;
/// let report = orchestrator.shutdown(&instances).await;
/// ```
#[derive(Clone, Debug)]
pub struct Orchestrator {
    root: CancellationToken,
    shutdown_timeout: Option<Duration>,
}

impl Orchestrator {
    pub fn new(root: CancellationToken) -> Self {
        Self {
            root,
            shutdown_timeout: None,
        }
    }

    /// Bound each Shutdown call; a call that overruns is recorded as a failure
    pub fn with_shutdown_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    pub fn root(&self) -> &CancellationToken {
        &self.root
    }

    /// Start every instance exposing `OnStart` and wait for all of them.
    ///
    /// Returns once every Start task has returned. Faults are collected, not
    /// short-circuited.
    pub async fn start(&self, instances: &[Arc<Instance>], cycle: &CancellationToken) -> Result<()> {
        let mut tasks = JoinSet::new();
        let mut names = HashMap::new();

        for instance in instances {
            let Some(hook) = instance.hooks().start() else {
                continue;
            };
            instance.transition(InstanceState::Started);
            let hook = Arc::clone(hook);
            let ctx = cycle.clone();
            let handle = tasks.spawn(async move { hook.start(&ctx).await });
            names.insert(handle.id(), instance.name().to_string());
            instance.transition(InstanceState::Running);
            tracing::debug!(component = instance.name(), "Start task spawned");
        }

        tracing::info!("Started {} component task(s)", names.len());

        let mut faults = Vec::new();
        while let Some(joined) = tasks.join_next_with_id().await {
            let fault = match joined {
                Ok((id, Ok(()))) => {
                    tracing::debug!(component = %name_of(&names, id), "Start task returned");
                    continue;
                }
                Ok((id, Err(err))) => StartFault::Failed {
                    component: name_of(&names, id),
                    message: format!("{err:#}"),
                },
                Err(err) if err.is_panic() => {
                    let component = name_of(&names, err.id());
                    StartFault::Panicked {
                        component,
                        message: panic_message(err.into_panic()),
                    }
                }
                Err(err) => StartFault::Aborted {
                    component: name_of(&names, err.id()),
                },
            };

            tracing::error!(component = fault.component(), error = %fault, "Start task faulted, cancelling run");
            self.root.cancel();
            faults.push(fault);
        }

        if faults.is_empty() {
            Ok(())
        } else {
            Err(LifecycleError::start(faults))
        }
    }

    /// Call `OnShutdown` on every instance, dependents before dependencies.
    ///
    /// Each failure, panic or timeout is logged and recorded; the sweep
    /// always reaches every instance.
    pub async fn shutdown(&self, instances: &[Arc<Instance>]) -> ShutdownReport {
        tracing::info!("Shutting down {} component(s)...", instances.len());

        let mut report = ShutdownReport::default();
        for instance in instances.iter().rev() {
            instance.transition(InstanceState::ShuttingDown);

            if let Some(hook) = instance.hooks().shutdown() {
                report.invoked.push(instance.name().to_string());
                if let Err(message) = self.shutdown_one(instance.name(), Arc::clone(hook)).await {
                    tracing::error!(component = instance.name(), error = %message, "Shutdown failed");
                    report.failures.push(ShutdownFailure {
                        component: instance.name().to_string(),
                        message,
                    });
                } else {
                    tracing::debug!(component = instance.name(), "Shut down");
                }
            }

            instance.transition(InstanceState::Shutdown);
        }

        tracing::info!(
            "Shutdown complete ({} hooks executed, {} failed)",
            report.invoked.len(),
            report.failures.len()
        );
        report
    }

    async fn shutdown_one(
        &self,
        name: &str,
        hook: Arc<dyn super::OnShutdown>,
    ) -> std::result::Result<(), String> {
        let ctx = CancellationToken::new();
        let task_ctx = ctx.clone();
        let mut handle = tokio::spawn(async move { hook.shutdown(&task_ctx).await });

        let joined = match self.shutdown_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, &mut handle).await {
                Ok(joined) => joined,
                Err(_) => {
                    ctx.cancel();
                    handle.abort();
                    let err = LifecycleError::timeout(format!("shutdown of {name}"), timeout);
                    return Err(err.to_string());
                }
            },
            None => handle.await,
        };

        match joined {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(format!("{err:#}")),
            Err(err) if err.is_panic() => Err(format!("panicked: {}", panic_message(err.into_panic()))),
            Err(err) => Err(err.to_string()),
        }
    }
}

fn name_of(names: &HashMap<tokio::task::Id, String>, id: tokio::task::Id) -> String {
    names
        .get(&id)
        .cloned()
        .unwrap_or_else(|| format!("task {id}"))
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
