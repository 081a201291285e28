//! Three wired components: the `App` root references `User`, which
//! references `Chat`. Configuration comes from the file named by
//! `SERVICE_CONFIG`, or `weaver.toml` next to this crate.

mod chat;
mod user;

use std::time::Duration;
use user::User;
use weaver::lifecycle::CONFIG_ENV;
use weaver::prelude::*;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct AppOptions {
    app_name: String,
    version: String,
    /// Stop on our own after this long; run until a signal when unset
    run_for_ms: Option<u64>,
}

#[derive(Component, Default)]
#[component(init, shutdown, main)]
struct App {
    base: Base,
    #[weaver = "app"]
    options: WithConfig<AppOptions>,
    user: Ref<dyn User>,
}

#[async_trait]
impl OnInit for App {
    async fn init(&self, _ctx: &CancellationToken) -> anyhow::Result<()> {
        tracing::info!(parent: self.base.logger().span(), "App init");
        Ok(())
    }
}

#[async_trait]
impl OnShutdown for App {
    async fn shutdown(&self, _ctx: &CancellationToken) -> anyhow::Result<()> {
        tracing::info!(parent: self.base.logger().span(), "App shutdown");
        Ok(())
    }
}

weaver::register!(main App, "hello.App");

#[tokio::main]
async fn main() -> weaver::Result<()> {
    let builder = match std::env::var_os(CONFIG_ENV) {
        Some(_) => Application::builder().config_from_env(),
        None => Application::builder().config_file(concat!(env!("CARGO_MANIFEST_DIR"), "/weaver.toml")),
    };

    builder.watch_config(true).build()?.run::<App, _, _>(serve).await
}

async fn serve(ctx: CancellationToken, app: Arc<App>) -> anyhow::Result<()> {
    let options = app.options.get();
    tracing::info!(app = %options.app_name, version = %options.version, "hello");
    tracing::info!("{}", app.user.say_hello("jun3372"));

    match options.run_for_ms {
        Some(ms) => {
            tokio::select! {
                _ = ctx.cancelled() => {}
                _ = tokio::time::sleep(Duration::from_millis(ms)) => {
                    tracing::info!("Run time elapsed");
                }
            }
        }
        None => ctx.cancelled().await,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn application(config: serde_json::Value) -> Application {
        Application::builder()
            .source(ValueSource::new(config))
            .handle_signals(false)
            .init_logging(false)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_registered_graph_says_hello() {
        let app = application(json!({
            "app": {"app_name": "demo", "run_for_ms": 1},
            "chat": {"app_name": "demo-chat"}
        }));
        assert_eq!(app.container().registry().len(), 3);

        app.run::<App, _, _>(|ctx, app| async move {
            assert_eq!(app.options.config().app_name, "demo");
            assert_eq!(app.user.say_hello("alice"), "hello:alice");
            serve(ctx, app).await
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_dependencies_are_built_first() {
        let app = application(json!({}));
        let container = app.container().clone();

        container.resolve_impl::<App>().await.unwrap();

        let order: Vec<_> = container
            .instances()
            .await
            .iter()
            .map(|instance| instance.name().to_string())
            .collect();
        assert_eq!(order, vec!["hello/chat.Chat", "hello/user.User", "hello.App"]);
    }
}
