use clap::{Args, Subcommand};

use blade_daemon::http_server::api::client::ApiError;
use blade_daemon::http_server::api::v0::timeline::get::GetRequest;
use blade_daemon::http_server::api::v0::timeline::list::ListRequest;
use common::models::TimelineEntry;

use crate::cli::op::{Op, OpContext};

crate::command_enum! {
    (List, ListRequest),
    (Get, GetRequest),
}

/// Read what followed nodes published
#[derive(Args, Debug, Clone)]
pub struct Timeline {
    #[command(subcommand)]
    pub command: Command,
}

#[async_trait::async_trait]
impl Op for Timeline {
    type Error = OpError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        self.command.execute(ctx).await
    }
}

fn render(entry: &TimelineEntry) -> String {
    format!(
        "{}  {}  {} {}: {}",
        entry.local_id,
        entry.publish_time.to_rfc3339(),
        entry.source_address,
        entry.kind,
        entry.content
    )
}

#[async_trait::async_trait]
impl Op for ListRequest {
    type Error = ApiError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let entries = ctx.client.call(self.clone()).await?.entries;
        if entries.is_empty() {
            return Ok("Timeline is empty".to_string());
        }
        Ok(entries.iter().map(render).collect::<Vec<_>>().join("\n"))
    }
}

#[async_trait::async_trait]
impl Op for GetRequest {
    type Error = ApiError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let entry = ctx.client.call(self.clone()).await?.entry;
        Ok(render(&entry))
    }
}
