use clap::{Args, Subcommand};

use blade_daemon::http_server::api::client::ApiError;
use blade_daemon::http_server::api::v0::msg::inbox::InboxRequest;
use blade_daemon::http_server::api::v0::msg::outbox::OutboxRequest;
use blade_daemon::http_server::api::v0::msg::remove::RemoveRequest;
use blade_daemon::http_server::api::v0::msg::send::SendRequest;

use crate::cli::op::{Op, OpContext};

crate::command_enum! {
    (Send, SendRequest),
    (Inbox, InboxRequest),
    (Outbox, OutboxRequest),
    (Remove, RemoveRequest),
}

/// Private messages between known nodes
#[derive(Args, Debug, Clone)]
pub struct Msg {
    #[command(subcommand)]
    pub command: Command,
}

#[async_trait::async_trait]
impl Op for Msg {
    type Error = OpError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        self.command.execute(ctx).await
    }
}

#[async_trait::async_trait]
impl Op for SendRequest {
    type Error = ApiError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let message = ctx.client.call(self.clone()).await?.message;
        Ok(format!(
            "Queued {} for {}",
            message.id, message.recipient_address
        ))
    }
}

#[async_trait::async_trait]
impl Op for InboxRequest {
    type Error = ApiError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let messages = ctx.client.call(self.clone()).await?.messages;
        if messages.is_empty() {
            return Ok("Inbox is empty".to_string());
        }
        Ok(messages
            .iter()
            .map(|m| {
                format!(
                    "{}  {}  from {}: {}",
                    m.local_id,
                    m.sent_at.to_rfc3339(),
                    m.sender_public_key,
                    m.content
                )
            })
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

#[async_trait::async_trait]
impl Op for OutboxRequest {
    type Error = ApiError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let messages = ctx.client.call(self.clone()).await?.messages;
        if messages.is_empty() {
            return Ok("Outbox is empty".to_string());
        }
        Ok(messages
            .iter()
            .map(|m| {
                format!(
                    "{}  {}  to {}: {}",
                    m.id,
                    m.sent_at.to_rfc3339(),
                    m.recipient_address,
                    m.content
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
        Ok(format!("Removed message {}", response.id))
    }
}
