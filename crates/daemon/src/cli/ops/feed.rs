use clap::{Args, Subcommand};

use blade_daemon::http_server::api::client::ApiError;
use blade_daemon::http_server::api::v0::feed::list::ListRequest;
use blade_daemon::http_server::api::v0::feed::publish::PublishRequest;
use blade_daemon::http_server::api::v0::feed::remove::RemoveRequest;

use crate::cli::op::{Op, OpContext};

crate::command_enum! {
    (Publish, PublishRequest),
    (List, ListRequest),
    (Remove, RemoveRequest),
}

/// Manage this node's own feed
#[derive(Args, Debug, Clone)]
pub struct Feed {
    #[command(subcommand)]
    pub command: Command,
}

#[async_trait::async_trait]
impl Op for Feed {
    type Error = OpError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        self.command.execute(ctx).await
    }
}

#[async_trait::async_trait]
impl Op for PublishRequest {
    type Error = ApiError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let item = ctx.client.call(self.clone()).await?.item;
        let audience = if item.is_public() {
            "public".to_string()
        } else {
            item.categories.iter().cloned().collect::<Vec<_>>().join(", ")
        };
        Ok(format!("Published {} ({})", item.id, audience))
    }
}

#[async_trait::async_trait]
impl Op for ListRequest {
    type Error = ApiError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let items = ctx.client.call(self.clone()).await?.items;
        if items.is_empty() {
            return Ok("Feed is empty".to_string());
        }
        Ok(items
            .iter()
            .map(|item| {
                let categories = item.categories.iter().cloned().collect::<Vec<_>>();
                format!(
                    "{}  {}  [{}] {}: {}",
                    item.id,
                    item.publish_time.to_rfc3339(),
                    categories.join(","),
                    item.kind,
                    item.content
                )
            })
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

#[async_trait::async_trait]
impl Op for RemoveRequest {
    type Error = ApiError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let response = ctx.client.call(self.clone()).await?;
        Ok(format!("Removed feed item {}", response.id))
    }
}
