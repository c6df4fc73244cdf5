use clap::{Args, Subcommand};

use blade_daemon::http_server::api::client::ApiError;
use blade_daemon::http_server::api::v0::sub::add::AddRequest;
use blade_daemon::http_server::api::v0::sub::list::ListRequest;
use blade_daemon::http_server::api::v0::sub::remove::RemoveRequest;
use blade_daemon::http_server::api::v0::sub::subscribers::SubscribersRequest;
use blade_daemon::http_server::api::v0::sub::sync::SyncRequest;

use crate::cli::op::{Op, OpContext};

crate::command_enum! {
    (Add, AddRequest),
    (List, ListRequest),
    (Remove, RemoveRequest),
    (Sync, SyncRequest),
    (Subscribers, SubscribersRequest),
}

/// Follow other nodes' feeds
#[derive(Args, Debug, Clone)]
pub struct Sub {
    #[command(subcommand)]
    pub command: Command,
}

#[async_trait::async_trait]
impl Op for Sub {
    type Error = OpError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        self.command.execute(ctx).await
    }
}

#[async_trait::async_trait]
impl Op for AddRequest {
    type Error = ApiError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let subscription = ctx.client.call(self.clone()).await?.subscription;
        Ok(format!(
            "Subscribed to {} ({})",
            subscription.target_address, subscription.id
        ))
    }
}

#[async_trait::async_trait]
impl Op for ListRequest {
    type Error = ApiError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let subscriptions = ctx.client.call(self.clone()).await?.subscriptions;
        if subscriptions.is_empty() {
            return Ok("No subscriptions".to_string());
        }
        Ok(subscriptions
            .iter()
            .map(|s| {
                let cursor = s
                    .cursor
                    .as_ref()
                    .map(|c| c.publish_time.to_rfc3339())
                    .unwrap_or_else(|| "never synced".to_string());
                format!("{}  {}  {}", s.id, s.target_address, cursor)
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
        Ok(format!("Unsubscribed {}", response.id))
    }
}

#[async_trait::async_trait]
impl Op for SyncRequest {
    type Error = ApiError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let report = ctx.client.call(self.clone()).await?.report;
        let mut out = format!(
            "Synced {} subscription(s), {} new entr{}",
            report.synced,
            report.new_entries,
            if report.new_entries == 1 { "y" } else { "ies" }
        );
        if !report.failed.is_empty() {
            out.push_str(&format!("\nSkipped: {}", report.failed.join(", ")));
        }
        Ok(out)
    }
}

#[async_trait::async_trait]
impl Op for SubscribersRequest {
    type Error = ApiError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let subscribers = ctx.client.call(self.clone()).await?.subscribers;
        if subscribers.is_empty() {
            return Ok("No subscribers".to_string());
        }
        Ok(subscribers
            .iter()
            .map(|s| format!("{}  {}", s.public_key, s.address))
            .collect::<Vec<_>>()
            .join("\n"))
    }
}
