use crate::chat::Chat;
use weaver::prelude::*;

pub trait User: Send + Sync {
    fn say_hello(&self, name: &str) -> String;
}

#[derive(Component, Default)]
#[component(init, shutdown)]
pub struct UserImpl {
    base: Base,
    chat: Ref<dyn Chat>,
}

impl User for UserImpl {
    fn say_hello(&self, name: &str) -> String {
        tracing::debug!(parent: self.base.logger().span(), chat = %self.chat.options().app_name, "Saying hello");
        format!("hello:{name}")
    }
}

#[async_trait]
impl OnInit for UserImpl {
    async fn init(&self, _ctx: &CancellationToken) -> anyhow::Result<()> {
        tracing::info!(parent: self.base.logger().span(), "User init");
        Ok(())
    }
}

#[async_trait]
impl OnShutdown for UserImpl {
    async fn shutdown(&self, _ctx: &CancellationToken) -> anyhow::Result<()> {
        tracing::info!(parent: self.base.logger().span(), "User shutdown");
        Ok(())
    }
}

weaver::register!(dyn User => UserImpl, "hello/user.User");
