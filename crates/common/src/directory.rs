//! Trust-on-first-use cache of remote node identities
//!
//! The first time a node is seen its public key is fetched and, if the key is
//! new, its profile is fetched and frozen. Later resolutions of any address
//! serving the same key return the cached profile without touching the
//! network again beyond the key lookup; only the address follows the node
//! when it moves. Only [`Directory::refresh`] replaces a cached profile.

use crate::address::Address;
use crate::client::{self, PullError};
use crate::crypto::PublicKey;
use crate::models::{Avatar, KnownNode, MediaKind};
use crate::protocol::{AVATAR_PATH, BIO_PATH, DISPLAY_NAME_PATH, PUBLIC_KEY_PATH};
use crate::store::{KnownNodeStore, StoreError};
use crate::transport::Transport;

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone)]
pub struct Directory<S, T> {
    store: S,
    transport: T,
}

impl<S, T> Directory<S, T>
where
    S: KnownNodeStore,
    T: Transport,
{
    pub fn new(store: S, transport: T) -> Self {
        Self { store, transport }
    }

    /// Identify the node at `address`.
    ///
    /// Returns `None` if the node does not answer with a valid public key.
    pub async fn resolve(&self, address: &Address) -> Result<Option<KnownNode>, DirectoryError> {
        let Some(public_key) = self.fetch_public_key(address).await else {
            return Ok(None);
        };

        if let Some(known) = self.store.known_node(&public_key).await? {
            if &known.address == address {
                return Ok(Some(known));
            }
            let moved = self
                .store
                .set_known_node_address(&public_key, address)
                .await?;
            tracing::info!(
                key = %moved.public_key,
                from = %known.address,
                to = %moved.address,
                "known node moved"
            );
            return Ok(Some(moved));
        }

        let node = self.fetch_profile(address, public_key).await;
        let stored = self.store.insert_known_node(node).await?;
        tracing::info!(
            key = %stored.public_key,
            address = %stored.address,
            name = ?stored.display_name,
            "cached new known node"
        );
        Ok(Some(stored))
    }

    /// Re-fetch the profile at `address` and replace the cached record
    pub async fn refresh(&self, address: &Address) -> Result<Option<KnownNode>, DirectoryError> {
        let Some(public_key) = self.fetch_public_key(address).await else {
            return Ok(None);
        };
        let node = self.fetch_profile(address, public_key).await;
        self.store.replace_known_node(node.clone()).await?;
        tracing::info!(key = %node.public_key, address = %node.address, "refreshed known node");
        Ok(Some(node))
    }

    pub async fn cached(&self, public_key: &PublicKey) -> Result<Option<KnownNode>, DirectoryError> {
        Ok(self.store.known_node(public_key).await?)
    }

    pub async fn all(&self) -> Result<Vec<KnownNode>, DirectoryError> {
        Ok(self.store.known_nodes().await?)
    }

    pub async fn avatar(&self, file_name: &str) -> Result<Option<Vec<u8>>, DirectoryError> {
        Ok(self.store.avatar(file_name).await?)
    }

    async fn fetch_public_key(&self, address: &Address) -> Option<PublicKey> {
        let text = match self.fetch_text(address, PUBLIC_KEY_PATH).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(%address, "failed to fetch public key: {}", e);
                return None;
            }
        };
        match PublicKey::from_base64(&text) {
            Ok(key) => Some(key),
            Err(e) => {
                tracing::warn!(%address, "node served an invalid public key: {}", e);
                None
            }
        }
    }

    /// Profile fields are best effort; a missing field stays `None`
    async fn fetch_profile(&self, address: &Address, public_key: PublicKey) -> KnownNode {
        let display_name = self.fetch_optional_text(address, DISPLAY_NAME_PATH).await;
        let bio = self.fetch_optional_text(address, BIO_PATH).await;
        let avatar = self.fetch_avatar(address, &public_key).await;

        KnownNode {
            public_key,
            address: address.clone(),
            display_name,
            bio,
            avatar,
        }
    }

    async fn fetch_text(&self, address: &Address, path: &str) -> Result<String, PullError> {
        let (_, body) = client::get(&self.transport, &address.endpoint(path)).await?;
        Ok(String::from_utf8_lossy(&body).trim().to_string())
    }

    async fn fetch_optional_text(&self, address: &Address, path: &str) -> Option<String> {
        match self.fetch_text(address, path).await {
            Ok(text) if !text.is_empty() => Some(text),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!(%address, path, "profile field unavailable: {}", e);
                None
            }
        }
    }

    async fn fetch_avatar(&self, address: &Address, public_key: &PublicKey) -> Option<Avatar> {
        let url = address.endpoint(AVATAR_PATH);
        let (content_type, bytes) = match client::get(&self.transport, &url).await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(%address, "avatar unavailable: {}", e);
                return None;
            }
        };
        let content_type = content_type?;
        let Some(kind) = MediaKind::classify(&content_type) else {
            tracing::debug!(%address, %content_type, "discarding avatar of unknown type");
            return None;
        };
        if bytes.is_empty() {
            return None;
        }

        let essence = content_type.split(';').next().unwrap_or_default().trim();
        let extension = mime_guess::get_mime_extensions_str(essence)
            .and_then(|exts| exts.first())
            .copied()
            .unwrap_or("bin");
        let file_name = format!("{}.{}", public_key.to_id(), extension);

        if let Err(e) = self.store.put_avatar(&file_name, bytes).await {
            tracing::warn!(%address, "failed to store avatar: {}", e);
            return None;
        }
        Some(Avatar {
            kind,
            content_type,
            file_name,
        })
    }
}
