use std::path::PathBuf;
use std::time::Duration;

use clap::Args;

use blade_daemon::state::{AppConfig, AppState, StateError};
use blade_daemon::{spawn_service, ServiceConfig};
use common::address::{Address, AddressError};
use common::identity::{Profile, ProfileImage};

#[derive(Args, Debug, Clone)]
pub struct Daemon {
    /// Override the federation port (default from config)
    #[arg(long)]
    pub federation_port: Option<u16>,

    /// Override the owner API port (default from config)
    #[arg(long)]
    pub api_port: Option<u16>,

    /// Override the sync interval in seconds (default from config)
    #[arg(long)]
    pub sync_interval: Option<u64>,

    /// Directory for log files (default from config, stdout only if unset)
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Keep records in memory only
    #[arg(long)]
    pub ephemeral: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("state error: {0}")]
    State(#[from] StateError),

    #[error("invalid address: {0}")]
    Address(#[from] AddressError),

    #[error("failed to read avatar {0}: {1}")]
    Avatar(PathBuf, std::io::Error),
}

/// Read the avatar from disk, typed by its extension
fn load_avatar(path: &PathBuf) -> Result<ProfileImage, DaemonError> {
    let bytes = std::fs::read(path).map_err(|e| DaemonError::Avatar(path.clone(), e))?;
    let content_type = mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string();
    Ok(ProfileImage {
        content_type,
        bytes,
    })
}

fn profile(config: &AppConfig) -> Result<Profile, DaemonError> {
    let avatar = config.avatar_path.as_ref().map(load_avatar).transpose()?;
    Ok(Profile {
        display_name: config.display_name.clone(),
        bio: config.bio.clone(),
        avatar,
    })
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Daemon {
    type Error = DaemonError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let state = AppState::load(ctx.config_path.clone())?;
        let secret_key = state.load_key()?;

        let federation_port = self.federation_port.unwrap_or(state.config.federation_port);
        let address = match &state.config.address {
            Some(address) => Address::parse(address)?,
            None => Address::parse(&format!("localhost:{}", federation_port))?,
        };

        let config = ServiceConfig {
            node_secret: Some(secret_key),
            address,
            profile: profile(&state.config)?,
            sqlite_path: (!self.ephemeral).then_some(state.db_path),
            federation_port,
            api_port: self.api_port.unwrap_or(state.config.api_port),
            request_timeout: Duration::from_secs(state.config.request_timeout_secs),
            sync_interval: self
                .sync_interval
                .or(state.config.sync_interval_secs)
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            log_level: tracing::Level::DEBUG,
            log_dir: self.log_dir.clone().or(state.config.log_dir),
        };

        spawn_service(&config).await;
        Ok("daemon ended".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_reads_avatar_type_from_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("me.png");
        std::fs::write(&path, [0x89, b'P', b'N', b'G']).unwrap();

        let config = AppConfig {
            display_name: "alice".into(),
            avatar_path: Some(path),
            ..Default::default()
        };
        let profile = profile(&config).unwrap();
        let avatar = profile.avatar.unwrap();
        assert_eq!(avatar.content_type, "image/png");
        assert_eq!(avatar.bytes.len(), 4);
    }

    #[test]
    fn test_missing_avatar_is_an_error() {
        let config = AppConfig {
            avatar_path: Some(PathBuf::from("/nonexistent/me.png")),
            ..Default::default()
        };
        assert!(matches!(profile(&config), Err(DaemonError::Avatar(_, _))));
    }
}
