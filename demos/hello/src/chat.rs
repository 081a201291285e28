use weaver::prelude::*;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChatOptions {
    pub app_name: String,
    pub version: String,
}

pub trait Chat: Send + Sync {
    fn options(&self) -> ChatOptions;
}

#[derive(Component, Default)]
#[component(init, shutdown)]
pub struct ChatImpl {
    base: Base,
    #[weaver = "chat"]
    options: WithConfig<ChatOptions>,
}

impl Chat for ChatImpl {
    fn options(&self) -> ChatOptions {
        self.options.get()
    }
}

#[async_trait]
impl OnInit for ChatImpl {
    async fn init(&self, _ctx: &CancellationToken) -> anyhow::Result<()> {
        tracing::info!(parent: self.base.logger().span(), options = ?self.options.get(), "Chat init");
        Ok(())
    }
}

#[async_trait]
impl OnShutdown for ChatImpl {
    async fn shutdown(&self, _ctx: &CancellationToken) -> anyhow::Result<()> {
        tracing::info!(parent: self.base.logger().span(), "Chat shutdown");
        Ok(())
    }
}

weaver::register!(dyn Chat => ChatImpl, "hello/chat.Chat");
