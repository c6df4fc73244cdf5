use clap::{Args, Subcommand};

use blade_daemon::http_server::api::client::ApiError;
use blade_daemon::http_server::api::v0::perm::grant::GrantRequest;
use blade_daemon::http_server::api::v0::perm::group_create::GroupCreateRequest;
use blade_daemon::http_server::api::v0::perm::group_remove::GroupRemoveRequest;
use blade_daemon::http_server::api::v0::perm::list::ListRequest;
use blade_daemon::http_server::api::v0::perm::revoke::RevokeRequest;
use common::models::Rule;

use crate::cli::op::{Op, OpContext};

crate::command_enum! {
    (Grant, GrantRequest),
    (Revoke, RevokeRequest),
    (List, ListRequest),
    (GroupCreate, GroupCreateRequest),
    (GroupRemove, GroupRemoveRequest),
}

/// Decide who sees which categories of the feed
#[derive(Args, Debug, Clone)]
pub struct Perm {
    #[command(subcommand)]
    pub command: Command,
}

#[async_trait::async_trait]
impl Op for Perm {
    type Error = OpError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        self.command.execute(ctx).await
    }
}

fn describe(rule: &Rule) -> String {
    match rule {
        Rule::All => "all categories".to_string(),
        Rule::Categories(categories) => categories.iter().cloned().collect::<Vec<_>>().join(", "),
    }
}

#[async_trait::async_trait]
impl Op for GrantRequest {
    type Error = ApiError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        Ok(match ctx.client.call(self.clone()).await?.grant {
            Some(grant) => format!("{} may see {}", grant.subject, describe(&grant.rule)),
            None => format!("{} now sees public items only", self.subject),
        })
    }
}

#[async_trait::async_trait]
impl Op for RevokeRequest {
    type Error = ApiError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let response = ctx.client.call(self.clone()).await?;
        Ok(format!("Revoked direct grant for {}", response.subject))
    }
}

#[async_trait::async_trait]
impl Op for ListRequest {
    type Error = ApiError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let response = ctx.client.call(self.clone()).await?;
        let mut lines = vec!["Grants:".to_string()];
        for grant in &response.grants {
            lines.push(format!("  {}  {}", grant.subject, describe(&grant.rule)));
        }
        lines.push("Groups:".to_string());
        for group in &response.groups {
            lines.push(format!(
                "  {}  {} ({} member(s))  {}",
                group.id,
                group.name,
                group.members.len(),
                describe(&group.rule)
            ));
        }
        Ok(lines.join("\n"))
    }
}

#[async_trait::async_trait]
impl Op for GroupCreateRequest {
    type Error = ApiError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let group = ctx.client.call(self.clone()).await?.group;
        Ok(format!("Created group {} ({})", group.name, group.id))
    }
}

#[async_trait::async_trait]
impl Op for GroupRemoveRequest {
    type Error = ApiError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let response = ctx.client.call(self.clone()).await?;
        Ok(format!("Removed group {}", response.id))
    }
}
