use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use weaver::di::FieldShape;
use weaver::prelude::*;
use weaver::{ConfigWatcher, Registry};

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
struct Greeting {
    prefix: String,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
struct Limits {
    max: u32,
}

trait Chat: Send + Sync {
    fn greet(&self, name: &str) -> String;
}

trait User: Send + Sync {
    fn say_hello(&self, name: &str) -> String;
}

#[derive(Component, Default)]
#[component(start, shutdown)]
struct ChatImpl {
    base: Base,
    #[conf = "legacy"]
    #[weaver = "chat"]
    greeting: WithConfig<Greeting>,
    #[config = "limits"]
    #[component(setter = limits_setter)]
    limits: Arc<RwLock<Limits>>,
    #[weaver = ""]
    unkeyed: WithConfig<Greeting>,
    starts: AtomicUsize,
}

impl ChatImpl {
    fn limits_setter(&self) -> ConfigSetter<Limits, impl Fn(Limits) + Send + Sync + 'static + use<>> {
        let limits = Arc::clone(&self.limits);
        ConfigSetter::new(move |value: Limits| {
            *limits.write().unwrap_or_else(PoisonError::into_inner) = value;
        })
    }

    fn max(&self) -> u32 {
        self.limits.read().unwrap_or_else(PoisonError::into_inner).max
    }
}

impl Chat for ChatImpl {
    fn greet(&self, name: &str) -> String {
        format!("{}:{name}", self.greeting.config().prefix)
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
        Ok(())
    }
}

#[derive(Component, Default)]
struct UserImpl {
    base: Base,
    chat: Ref<dyn Chat>,
}

impl User for UserImpl {
    fn say_hello(&self, name: &str) -> String {
        self.chat.greet(name)
    }
}

#[derive(Component, Default)]
#[component(main)]
struct App {
    base: Base,
    #[config = "app"]
    options: WithConfig<serde_json::Value>,
    user: Ref<dyn User>,
}

#[derive(Component, Default)]
#[component(main)]
struct Bare;

fn registry() -> Registry {
    Registry::new([
        descriptor!(dyn Chat => ChatImpl, "chat"),
        descriptor!(dyn User => UserImpl, "user"),
        descriptor!(main App, "app"),
    ])
    .unwrap()
}

#[test]
fn test_derive_declares_fields() {
    let chat = ChatImpl::default();
    let fields = chat.config_fields();

    let summary: Vec<_> = fields
        .iter()
        .map(|field| (field.name(), field.shape(), field.key()))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("greeting", FieldShape::Embedded, Some("chat")),
            ("limits", FieldShape::Private, Some("limits")),
            ("unkeyed", FieldShape::Embedded, None),
        ]
    );

    let user = UserImpl::default();
    assert_eq!(user.references().len(), 1);
    assert!(!user.references()[0].is_wired());
    assert!(Bare.references().is_empty());
}

#[test]
fn test_registry_reads_declared_references() {
    let registry = registry();
    let app = registry.find_by_name("app").unwrap();
    assert_eq!(app.dependencies().len(), 1);
    assert!(app.dependencies()[0].name().contains("User"));
}

#[tokio::test]
async fn test_resolves_and_binds_through_derive() {
    let container = Container::builder()
        .registry(registry())
        .source(ValueSource::new(json!({
            "app": {"name": "demo"},
            "chat": {"prefix": "hello"},
            "legacy": {"prefix": "ignored"},
            "limits": {"max": 8}
        })))
        .build()
        .unwrap();

    let app = container.resolve_impl::<App>().await.unwrap();
    assert_eq!(*app.options.config(), json!({"name": "demo"}));
    assert_eq!(app.user.say_hello("alice"), "hello:alice");

    let chat = container.resolve_impl::<ChatImpl>().await.unwrap();
    assert_eq!(chat.max(), 8);
    assert_eq!(*chat.unkeyed.config(), Greeting::default());
    assert_eq!(chat.base.logger().component(), "chat");
    assert!(chat.base.run_token().is_some());
}

#[tokio::test]
async fn test_bad_config_is_not_fatal() {
    let container = Container::builder()
        .registry(registry())
        .source(ValueSource::new(json!({
            "chat": {"prefix": 42},
            "limits": {"max": "lots"}
        })))
        .build()
        .unwrap();

    let chat = container.resolve_impl::<ChatImpl>().await.unwrap();
    assert_eq!(chat.greet("bob"), ":bob");
    assert_eq!(chat.max(), 0);
}

#[tokio::test]
async fn test_unit_component_runs() {
    Application::builder()
        .register(descriptor!(main Bare, "bare"))
        .handle_signals(false)
        .init_logging(false)
        .build()
        .unwrap()
        .run::<Bare, _, _>(|ctx, _| async move {
            assert!(!ctx.is_cancelled());
            Ok(())
        })
        .await
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_watcher_reloads_changed_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("weaver.toml");
    std::fs::write(&path, "[chat]\nprefix = \"hello\"\n").unwrap();

    let container = Container::builder()
        .registry(registry())
        .source(FileSource::with_env_prefix(&path, None).unwrap())
        .build()
        .unwrap();
    let user = container.resolve::<dyn User>().await.unwrap();
    let chat = container.resolve_impl::<ChatImpl>().await.unwrap();
    container.start().await.unwrap();

    let watcher = ConfigWatcher::spawn(container.clone(), &path).unwrap();
    assert_eq!(watcher.path(), path.as_path());
    tokio::time::sleep(Duration::from_millis(100)).await;
    std::fs::write(&path, "[chat]\nprefix = \"hi\"\n").unwrap();

    let rebound = tokio::time::timeout(Duration::from_secs(10), async {
        while user.say_hello("eve") != "hi:eve" {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
    assert!(rebound.is_ok(), "configuration was not reloaded");

    let restarted = tokio::time::timeout(Duration::from_secs(10), async {
        while chat.starts.load(Ordering::SeqCst) < 2 {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
    assert!(restarted.is_ok(), "components were not restarted");

    drop(watcher);
    container.stop().await.unwrap();
}
