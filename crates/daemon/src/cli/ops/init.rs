use std::path::PathBuf;

use clap::Args;

use blade_daemon::state::{AppConfig, AppState, StateError};

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// Address other nodes reach this node at (defaults to localhost:<federation-port>)
    #[arg(long)]
    pub address: Option<String>,

    #[arg(long, default_value_t = 5000)]
    pub federation_port: u16,

    #[arg(long, default_value_t = 5001)]
    pub api_port: u16,

    #[arg(long, default_value = "")]
    pub display_name: String,

    #[arg(long, default_value = "")]
    pub bio: String,

    /// Image served as the node's avatar
    #[arg(long)]
    pub avatar: Option<PathBuf>,

    /// Sync subscriptions every N seconds while the daemon runs
    #[arg(long)]
    pub sync_interval: Option<u64>,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Init {
    type Error = StateError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let config = AppConfig {
            federation_port: self.federation_port,
            api_port: self.api_port,
            address: self.address.clone(),
            display_name: self.display_name.clone(),
            bio: self.bio.clone(),
            avatar_path: self.avatar.clone(),
            sync_interval_secs: self.sync_interval,
            ..Default::default()
        };

        let state = AppState::init(ctx.config_path.clone(), Some(config))?;
        let key = state.load_key()?;

        Ok(format!(
            "Initialized blade node in {}\n  address:    {}\n  public key: {}",
            state.blade_dir.display(),
            state.config.address(),
            key.public()
        ))
    }
}
