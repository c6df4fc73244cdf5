use clap::{Args, Subcommand};

use blade_daemon::http_server::api::client::ApiError;
use blade_daemon::http_server::api::v0::node::list::ListRequest;
use blade_daemon::http_server::api::v0::node::refresh::RefreshRequest;
use blade_daemon::http_server::api::v0::node::resolve::ResolveRequest;
use common::models::KnownNode;

use crate::cli::op::{Op, OpContext};

crate::command_enum! {
    (Resolve, ResolveRequest),
    (Refresh, RefreshRequest),
    (List, ListRequest),
}

/// Nodes this node has identified
#[derive(Args, Debug, Clone)]
pub struct NodeCmd {
    #[command(subcommand)]
    pub command: Command,
}

#[async_trait::async_trait]
impl Op for NodeCmd {
    type Error = OpError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        self.command.execute(ctx).await
    }
}

fn render(node: &KnownNode) -> String {
    format!(
        "{}  {}  {}",
        node.public_key,
        node.address,
        node.display_name.as_deref().unwrap_or("-")
    )
}

#[async_trait::async_trait]
impl Op for ResolveRequest {
    type Error = ApiError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        Ok(render(&ctx.client.call(self.clone()).await?.node))
    }
}

#[async_trait::async_trait]
impl Op for RefreshRequest {
    type Error = ApiError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        Ok(render(&ctx.client.call(self.clone()).await?.node))
    }
}

#[async_trait::async_trait]
impl Op for ListRequest {
    type Error = ApiError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let nodes = ctx.client.call(self.clone()).await?.nodes;
        if nodes.is_empty() {
            return Ok("No known nodes".to_string());
        }
        Ok(nodes.iter().map(render).collect::<Vec<_>>().join("\n"))
    }
}
