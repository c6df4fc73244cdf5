use std::sync::Arc;

use tokio::sync::Semaphore;
use url::Url;

use common::node::{Node, NodeBuilderError};

use crate::database::{Database, DatabaseSetupError, IN_MEMORY_URL};
use crate::service_config::Config;
use crate::transport::HttpTransport;

pub type BladeNode = Node<Database, HttpTransport>;

/// Inbox notifications pulled concurrently before new ones are refused
pub const MAX_INFLIGHT_NOTIFICATIONS: usize = 64;

/// Main service state - the node every server shares
#[derive(Debug, Clone)]
pub struct State {
    node: BladeNode,
    notification_permits: Arc<Semaphore>,
}

impl State {
    pub async fn from_config(config: &Config) -> Result<Self, StateSetupError> {
        // 1. Setup database
        let sqlite_database_url = match config.sqlite_path {
            Some(ref path) => {
                // check that the path exists
                if !path.exists() {
                    return Err(StateSetupError::DatabasePathDoesNotExist);
                }
                Url::parse(&format!("sqlite://{}", path.display()))
                    .map_err(|_| StateSetupError::InvalidDatabaseUrl)
            }
            // otherwise just keep everything in memory
            None => Url::parse(IN_MEMORY_URL).map_err(|_| StateSetupError::InvalidDatabaseUrl),
        }?;
        tracing::info!(url = %sqlite_database_url, "opening database");
        let database = Database::connect(&sqlite_database_url).await?;

        // 2. Setup transport
        let transport = HttpTransport::new(config.request_timeout)?;

        // 3. Build the node
        let mut builder = Node::builder()
            .address(config.address.clone())
            .profile(config.profile.clone())
            .store(database)
            .transport(transport);
        if let Some(secret) = config.node_secret.clone() {
            builder = builder.secret_key(secret);
        }
        let node = builder.build()?;

        tracing::info!(
            key = %node.public_key(),
            address = %node.address(),
            "node ready"
        );

        Ok(Self::new(node))
    }

    /// Wrap an already built node
    pub fn new(node: BladeNode) -> Self {
        Self::with_notification_limit(node, MAX_INFLIGHT_NOTIFICATIONS)
    }

    pub fn with_notification_limit(node: BladeNode, limit: usize) -> Self {
        Self {
            node,
            notification_permits: Arc::new(Semaphore::new(limit)),
        }
    }

    pub fn node(&self) -> &BladeNode {
        &self.node
    }

    /// Permits for background inbox pulls, one per accepted notification
    pub fn notification_permits(&self) -> &Arc<Semaphore> {
        &self.notification_permits
    }
}

impl AsRef<BladeNode> for State {
    fn as_ref(&self) -> &BladeNode {
        &self.node
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateSetupError {
    #[error("Database path does not exist")]
    DatabasePathDoesNotExist,
    #[error("Invalid database url")]
    InvalidDatabaseUrl,
    #[error("Database setup error: {0}")]
    Database(#[from] DatabaseSetupError),
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),
    #[error("Node setup error: {0}")]
    Node(#[from] NodeBuilderError),
}
