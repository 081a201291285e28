use crate::config::ConfigSource;
use crate::di::injector::{bind_config, bind_references, ConfigSubscriber, Resolve};
use crate::di::{Component, ContainerBuilder, Instance};
use crate::error::{Result, WeaverError};
use crate::lifecycle::{self, InstanceState, LifecycleError, Orchestrator, ShutdownReport, StartFault};
use crate::logging::MakeLogger;
use crate::registry::{AnyHandle, ComponentDescriptor, Registry, TypeKey};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Thread-safe dependency injection container.
///
/// Builds each registered component at most once, on first request, and
/// drives the Start and Shutdown phases over everything it has built.
/// Cloning is cheap; every clone shares the same instances.
///
/// # Example
///
/// ```rust,ignore
/// let container = Container::builder()
///     .register(descriptor!(dyn Chat => ChatImpl, "chat"))
///     .register(descriptor!(dyn User => UserImpl, "user"))
///     .source(ValueSource::new(json!({"chat": {"greeting": "hello"}})))
///     .build()?;
///
/// let user = container.resolve::<dyn User>().await?;
/// container.start().await?;
/// // ...
/// container.stop().await?;
/// ```
#[derive(Clone)]
pub struct Container {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Registry,
    source: Option<Arc<dyn ConfigSource>>,
    loggers: Arc<dyn MakeLogger>,
    token: CancellationToken,
    orchestrator: Orchestrator,
    stop_grace: Option<Duration>,
    // Lock order: `lifecycle` before `state`.
    lifecycle: Mutex<Option<StartCycle>>,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    instances: HashMap<String, Arc<Instance>>,
    order: Vec<Arc<Instance>>,
    subscribers: Vec<ConfigSubscriber>,
}

/// A running Start fan-out
struct StartCycle {
    token: CancellationToken,
    task: JoinHandle<lifecycle::Result<()>>,
}

impl Container {
    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::new()
    }

    pub(crate) fn from_parts(
        registry: Registry,
        source: Option<Arc<dyn ConfigSource>>,
        loggers: Arc<dyn MakeLogger>,
        token: CancellationToken,
        shutdown_timeout: Option<Duration>,
        stop_grace: Option<Duration>,
    ) -> Self {
        let orchestrator = Orchestrator::new(token.clone()).with_shutdown_timeout(shutdown_timeout);
        Self {
            inner: Arc::new(Inner {
                registry,
                source,
                loggers,
                token,
                orchestrator,
                stop_grace,
                lifecycle: Mutex::new(None),
                state: Mutex::new(State::default()),
            }),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    /// The root run token. Cancelling it ends every Start task.
    pub fn token(&self) -> CancellationToken {
        self.inner.token.clone()
    }

    /// Resolve the component registered for interface `I`, building it and
    /// its dependencies on first use.
    pub async fn resolve<I: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<I>> {
        let key = TypeKey::of::<I>();
        let descriptor = self
            .inner
            .registry
            .find_by_interface(&key)
            .ok_or_else(|| WeaverError::resolution(key.name()))?;
        let instance = self.build(descriptor).await?;
        descriptor.cast_to::<I>(instance.handle())
    }

    /// Resolve a component by its implementation type
    pub async fn resolve_impl<C: Component>(&self) -> Result<Arc<C>> {
        let key = TypeKey::of::<C>();
        let descriptor = self
            .inner
            .registry
            .find_by_implementation(&key)
            .ok_or_else(|| WeaverError::resolution(key.name()))?;
        let instance = self.build(descriptor).await?;
        instance.handle().downcast::<C>().map_err(|_| {
            WeaverError::wiring(descriptor.name(), format!("instance is not a {}", key.name()))
        })
    }

    /// Resolve a component by its registered name
    pub async fn resolve_name(&self, name: &str) -> Result<Arc<Instance>> {
        let descriptor = self
            .inner
            .registry
            .find_by_name(name)
            .ok_or_else(|| WeaverError::resolution(name))?;
        self.build(descriptor).await
    }

    /// Every built instance, in creation order
    pub async fn instances(&self) -> Vec<Arc<Instance>> {
        self.inner.state.lock().await.order.clone()
    }

    async fn build(&self, descriptor: &Arc<ComponentDescriptor>) -> Result<Arc<Instance>> {
        let mut state = self.inner.state.lock().await;
        let mut session = Session {
            inner: &self.inner,
            state: &mut state,
        };
        session.build(descriptor).await
    }

    /// Launch `OnStart` for every built instance and return immediately.
    ///
    /// The tasks run until they return or the run is cancelled; their
    /// faults are reported by [`stop`](Self::stop).
    pub async fn start(&self) -> Result<()> {
        let mut lifecycle = self.inner.lifecycle.lock().await;
        if lifecycle.is_some() {
            tracing::warn!("Container already started");
            return Ok(());
        }
        *lifecycle = Some(self.spawn_cycle().await);
        Ok(())
    }

    /// End the current Start cycle and run `OnShutdown` on every instance.
    ///
    /// Start faults take precedence in the result and carry the shutdown
    /// report with them; otherwise the report is returned.
    pub async fn stop(&self) -> Result<ShutdownReport> {
        let mut lifecycle = self.inner.lifecycle.lock().await;
        let cycle = lifecycle.take();
        self.finish_cycle(cycle).await
    }

    /// Re-read the configuration source, bind every configuration field
    /// again, then restart the running components.
    ///
    /// Nothing is restarted when no Start cycle is running or when the run
    /// has been cancelled.
    pub async fn reload(&self) -> Result<()> {
        let Some(source) = self.inner.source.as_ref() else {
            tracing::warn!("Reload requested but the container has no configuration source");
            return Ok(());
        };

        let mut lifecycle = self.inner.lifecycle.lock().await;
        source.reload()?;
        {
            let state = self.inner.state.lock().await;
            for subscriber in &state.subscribers {
                subscriber.bind_logged(source.as_ref());
            }
            tracing::info!("Rebound {} configuration field(s)", state.subscribers.len());
        }

        let Some(cycle) = lifecycle.take() else {
            return Ok(());
        };
        if let Err(err) = self.finish_cycle(Some(cycle)).await {
            tracing::error!(error = %err, "Components faulted before reload");
        }

        if self.inner.token.is_cancelled() {
            tracing::info!("Run cancelled, not restarting components");
            return Ok(());
        }
        *lifecycle = Some(self.spawn_cycle().await);
        tracing::info!("Components restarted after reload");
        Ok(())
    }

    async fn spawn_cycle(&self) -> StartCycle {
        let instances = self.instances().await;
        let token = self.inner.token.child_token();
        let cycle = token.clone();
        let orchestrator = self.inner.orchestrator.clone();
        let task = tokio::spawn(async move { orchestrator.start(&instances, &cycle).await });
        StartCycle { token, task }
    }

    async fn finish_cycle(&self, cycle: Option<StartCycle>) -> Result<ShutdownReport> {
        let started = match cycle {
            Some(cycle) => {
                cycle.token.cancel();
                self.join_cycle(cycle.task).await
            }
            None => Ok(()),
        };
        let report = self.inner.orchestrator.shutdown(&self.instances().await).await;
        match started {
            Ok(()) => Ok(report),
            Err(WeaverError::Lifecycle(LifecycleError::Start { faults, .. })) => {
                Err(LifecycleError::Start {
                    faults,
                    shutdown: report,
                }
                .into())
            }
            Err(err) => {
                if !report.is_clean() {
                    tracing::warn!(%report, "Shutdown after a failed start fan-in was not clean");
                }
                Err(err)
            }
        }
    }

    async fn join_cycle(&self, mut task: JoinHandle<lifecycle::Result<()>>) -> Result<()> {
        let joined = match self.inner.stop_grace {
            Some(grace) => match tokio::time::timeout(grace, &mut task).await {
                Ok(joined) => joined,
                Err(_) => {
                    task.abort();
                    tracing::warn!(?grace, "Start tasks did not return in time, aborting them");
                    return Err(LifecycleError::timeout("start fan-in", grace).into());
                }
            },
            None => task.await,
        };

        match joined {
            Ok(started) => started.map_err(WeaverError::from),
            Err(err) => Err(LifecycleError::start(vec![StartFault::Aborted {
                component: format!("start fan-in ({err})"),
            }])
            .into()),
        }
    }
}

/// One exclusive pass over the instance cache, building recursively
struct Session<'a> {
    inner: &'a Inner,
    state: &'a mut State,
}

impl Session<'_> {
    async fn build(&mut self, descriptor: &Arc<ComponentDescriptor>) -> Result<Arc<Instance>> {
        let name = descriptor.name();
        if let Some(instance) = self.state.instances.get(name) {
            return Ok(Arc::clone(instance));
        }

        let mut component = descriptor.allocate();
        component.set_logger(self.inner.loggers.make_logger(name));
        component.set_cancel(self.inner.token.clone());
        tracing::trace!(component = name, state = %InstanceState::Allocated, "Building component");

        let subscribers = match &self.inner.source {
            Some(source) => {
                let subscribers = bind_config(name, &*component, source.as_ref());
                tracing::trace!(component = name, state = %InstanceState::ConfigBound, "Building component");
                subscribers
            }
            None => Vec::new(),
        };

        bind_references(name, &*component, self).await?;
        tracing::trace!(component = name, state = %InstanceState::ReferencesBound, "Building component");

        let instance = Arc::new(Instance::new(name, Arc::from(component)));
        if let Some(hook) = instance.hooks().init() {
            hook.init(&self.inner.token).await.map_err(|source| {
                tracing::error!(component = name, error = %source, "Init failed");
                WeaverError::Init {
                    component: name.to_string(),
                    source,
                }
            })?;
        }

        instance.transition(InstanceState::Initialized);

        self.state.subscribers.extend(subscribers);
        self.state
            .instances
            .insert(name.to_string(), Arc::clone(&instance));
        self.state.order.push(Arc::clone(&instance));
        tracing::info!(component = name, "Component initialized");
        Ok(instance)
    }
}

#[async_trait]
impl<'a> Resolve for Session<'a> {
    async fn resolve_interface(&mut self, interface: &TypeKey) -> Result<AnyHandle> {
        let descriptor = self
            .inner
            .registry
            .find_by_interface(interface)
            .cloned()
            .ok_or_else(|| WeaverError::resolution(interface.name()))?;
        let instance = self.build(&descriptor).await?;
        descriptor.cast(instance.handle())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValueSource;
    use crate::di::{Base, ConfigField, Ref, Reference, WithConfig};
    use crate::lifecycle::{Hooks, OnInit, OnShutdown, OnStart};
    use crate::logging::Logger;
    use crate::{descriptor, Main};
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    trait Chat: Send + Sync {
        fn greeting(&self) -> String;
    }

    trait User: Send + Sync {
        fn say_hello(&self, name: &str) -> String;
    }

    #[derive(Debug, Clone, Default, Deserialize, PartialEq)]
    struct ChatConfig {
        greeting: String,
    }

    #[derive(Default)]
    struct ChatImpl {
        base: Base,
        config: WithConfig<ChatConfig>,
        starts: AtomicUsize,
        shutdowns: AtomicUsize,
    }

    impl Component for ChatImpl {
        fn set_logger(&mut self, logger: Logger) {
            self.base.set_logger(logger);
        }

        fn set_cancel(&mut self, token: CancellationToken) {
            self.base.set_cancel(token);
        }

        fn config_fields(&self) -> Vec<ConfigField> {
            vec![ConfigField::embedded("config", &[("weaver", "chat")], &self.config)]
        }

        fn hooks(self: Arc<Self>) -> Hooks {
            Hooks::new().with_start(Arc::clone(&self)).with_shutdown(self)
        }
    }

    impl Chat for ChatImpl {
        fn greeting(&self) -> String {
            self.config.config().greeting.clone()
        }
    }

    #[async_trait]
    impl OnStart for ChatImpl {
        async fn start(&self, ctx: &CancellationToken) -> anyhow::Result<()> {
            self.starts.fetch_add(1, Ordering::SeqCst);
            ctx.cancelled().await;
            Ok(())
        }
    }

    #[async_trait]
    impl OnShutdown for ChatImpl {
        async fn shutdown(&self, _ctx: &CancellationToken) -> anyhow::Result<()> {
            self.shutdowns.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Default)]
    struct UserImpl {
        base: Base,
        chat: Ref<dyn Chat>,
    }

    impl Component for UserImpl {
        fn set_logger(&mut self, logger: Logger) {
            self.base.set_logger(logger);
        }

        fn references(&self) -> Vec<&dyn Reference> {
            vec![&self.chat as &dyn Reference]
        }
    }

    impl User for UserImpl {
        fn say_hello(&self, name: &str) -> String {
            format!("{}:{name}", self.chat.greeting())
        }
    }

    #[derive(Debug, Default)]
    struct Broken;

    impl Component for Broken {
        fn set_logger(&mut self, _logger: Logger) {}

        fn hooks(self: Arc<Self>) -> Hooks {
            Hooks::new().with_init(self)
        }
    }

    impl Main for Broken {}

    #[async_trait]
    impl OnInit for Broken {
        async fn init(&self, _ctx: &CancellationToken) -> anyhow::Result<()> {
            anyhow::bail!("no database")
        }
    }

    static COUNTED_INITS: AtomicUsize = AtomicUsize::new(0);

    #[derive(Debug, Default)]
    struct Counted;

    impl Component for Counted {
        fn set_logger(&mut self, _logger: Logger) {}

        fn hooks(self: Arc<Self>) -> Hooks {
            Hooks::new().with_init(self)
        }
    }

    impl Main for Counted {}

    #[async_trait]
    impl OnInit for Counted {
        async fn init(&self, _ctx: &CancellationToken) -> anyhow::Result<()> {
            COUNTED_INITS.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok(())
        }
    }

    fn container(source: ValueSource) -> Container {
        Container::builder()
            .register(descriptor!(dyn Chat => ChatImpl, "chat"))
            .register(descriptor!(dyn User => UserImpl, "user"))
            .source(source)
            .build()
            .unwrap()
    }

    fn hello() -> ValueSource {
        ValueSource::new(json!({"chat": {"greeting": "hello"}}))
    }

    #[tokio::test]
    async fn test_resolve_wires_references_and_config() {
        let container = container(hello());

        let user = container.resolve::<dyn User>().await.unwrap();
        assert_eq!(user.say_hello("alice"), "hello:alice");

        let order: Vec<_> = container
            .instances()
            .await
            .iter()
            .map(|instance| instance.name().to_string())
            .collect();
        assert_eq!(order, vec!["chat", "user"]);
    }

    #[tokio::test]
    async fn test_resolution_is_a_singleton() {
        let container = container(hello());

        let first = container.resolve_impl::<ChatImpl>().await.unwrap();
        let second = container.resolve_impl::<ChatImpl>().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let by_name = container.resolve_name("chat").await.unwrap();
        assert_eq!(by_name.state(), InstanceState::Initialized);
        assert_eq!(container.instances().await.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_resolution_inits_once() {
        let container = Container::builder()
            .register(descriptor!(main Counted, "counted"))
            .build()
            .unwrap();

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..16 {
            let container = container.clone();
            tasks.spawn(async move { container.resolve_impl::<Counted>().await.unwrap() });
        }
        let resolved: Vec<_> = tasks.join_all().await;

        assert!(resolved.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
        assert_eq!(COUNTED_INITS.load(Ordering::SeqCst), 1);
        assert_eq!(container.instances().await.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_interface() {
        let container = container(hello());
        let err = match container.resolve::<dyn std::fmt::Debug + Send + Sync>().await {
            Err(err) => err,
            Ok(_) => panic!("resolved an unregistered interface"),
        };
        assert!(matches!(err, WeaverError::Resolution { .. }));
    }

    #[tokio::test]
    async fn test_missing_dependency_fails_the_chain() {
        let container = Container::builder()
            .register(descriptor!(dyn User => UserImpl, "user"))
            .build()
            .unwrap();

        let err = match container.resolve::<dyn User>().await {
            Err(err) => err,
            Ok(_) => panic!("resolved without a chat component"),
        };
        assert!(err.to_string().contains("referenced by user"));
        assert!(container.instances().await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_init_caches_nothing() {
        let container = Container::builder()
            .register(descriptor!(main Broken, "broken"))
            .build()
            .unwrap();

        for _ in 0..2 {
            let err = container.resolve_impl::<Broken>().await.unwrap_err();
            assert!(matches!(err, WeaverError::Init { ref component, .. } if component == "broken"));
        }
        assert!(container.instances().await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_config_keeps_default() {
        let container = container(ValueSource::default());
        let chat = container.resolve_impl::<ChatImpl>().await.unwrap();
        assert_eq!(*chat.config.config(), ChatConfig::default());
    }

    #[tokio::test]
    async fn test_start_and_stop() {
        let container = container(hello());
        let chat = container.resolve_impl::<ChatImpl>().await.unwrap();

        container.start().await.unwrap();
        tokio::task::yield_now().await;
        let report = container.stop().await.unwrap();

        assert!(report.is_clean());
        assert_eq!(report.invoked, vec!["chat"]);
        assert_eq!(chat.shutdowns.load(Ordering::SeqCst), 1);
        assert!(!container.token().is_cancelled());
    }

    #[tokio::test]
    async fn test_reload_rebinds_and_restarts() {
        let source = Arc::new(hello());
        let container = Container::builder()
            .register(descriptor!(dyn Chat => ChatImpl, "chat"))
            .register(descriptor!(dyn User => UserImpl, "user"))
            .shared_source(Arc::clone(&source) as Arc<dyn ConfigSource>)
            .build()
            .unwrap();

        let user = container.resolve::<dyn User>().await.unwrap();
        let chat = container.resolve_impl::<ChatImpl>().await.unwrap();
        container.start().await.unwrap();

        source.set("chat.greeting", "hi");
        container.reload().await.unwrap();
        assert_eq!(user.say_hello("bob"), "hi:bob");
        assert_eq!(chat.shutdowns.load(Ordering::SeqCst), 1);

        container.stop().await.unwrap();
        assert_eq!(chat.starts.load(Ordering::SeqCst), 2);
        assert_eq!(chat.shutdowns.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_reload_without_start_only_rebinds() {
        let source = Arc::new(hello());
        let container = Container::builder()
            .register(descriptor!(dyn Chat => ChatImpl, "chat"))
            .shared_source(Arc::clone(&source) as Arc<dyn ConfigSource>)
            .build()
            .unwrap();
        let chat = container.resolve_impl::<ChatImpl>().await.unwrap();

        source.set("chat.greeting", "hey");
        container.reload().await.unwrap();

        assert_eq!(chat.greeting(), "hey");
        assert_eq!(chat.shutdowns.load(Ordering::SeqCst), 0);
    }
}
