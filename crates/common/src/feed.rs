use std::collections::BTreeSet;
use std::sync::Arc;

use crate::clock::Clock;
use crate::crypto::{seal_response, HandshakeError, PublicKey, VerifiedCredential};
use crate::identity::Identity;
use crate::ids::IdGenerator;
use crate::models::{FeedItem, FeedMessage};
use crate::permissions::{PermissionError, Permissions};
use crate::protocol::{FeedPage, FeedResponse};
use crate::store::{FeedStore, PermissionStore, StoreError};

/// Kind given to items published without one
pub const DEFAULT_ITEM_KIND: &str = "post";

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("invalid feed item: {0}")]
    InvalidItem(String),
    #[error(transparent)]
    Permission(#[from] PermissionError),
    #[error(transparent)]
    Handshake(#[from] HandshakeError),
    #[error("failed to encode feed page: {0}")]
    Encode(#[from] serde_json::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The local node's own feed
#[derive(Debug, Clone)]
pub struct Feed<S> {
    identity: Arc<Identity>,
    store: S,
    permissions: Permissions<S>,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
}

impl<S> Feed<S>
where
    S: FeedStore + PermissionStore,
{
    pub fn new(
        identity: Arc<Identity>,
        store: S,
        permissions: Permissions<S>,
        ids: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            identity,
            store,
            permissions,
            ids,
            clock,
        }
    }

    pub async fn publish(
        &self,
        kind: Option<String>,
        content: String,
        categories: BTreeSet<String>,
    ) -> Result<FeedItem, FeedError> {
        if content.trim().is_empty() {
            return Err(FeedError::InvalidItem("content cannot be empty".into()));
        }
        let categories = categories
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();

        let item = FeedItem {
            id: self.ids.next_id(),
            publish_time: self.clock.now(),
            categories,
            kind: kind
                .filter(|k| !k.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_ITEM_KIND.to_string()),
            content,
        };
        self.store.insert_feed_item(item.clone()).await?;

        tracing::info!(
            id = %item.id,
            categories = ?item.categories,
            "published feed item"
        );
        Ok(item)
    }

    pub async fn remove(&self, id: &str) -> Result<bool, FeedError> {
        let removed = self.store.remove_feed_item(id).await?;
        if removed {
            tracing::info!(id, "removed feed item");
        }
        Ok(removed)
    }

    pub async fn item(&self, id: &str) -> Result<Option<FeedItem>, FeedError> {
        Ok(self.store.feed_item(id).await?)
    }

    /// Every item, newest first, categories included
    pub async fn items(&self) -> Result<Vec<FeedItem>, FeedError> {
        let mut items = self.store.feed_items().await?;
        items.reverse();
        Ok(items)
    }

    /// A single item, if `requester` may see it
    pub async fn visible_item(
        &self,
        id: &str,
        requester: Option<&PublicKey>,
    ) -> Result<Option<FeedMessage>, FeedError> {
        let Some(item) = self.store.feed_item(id).await? else {
            return Ok(None);
        };
        if !self.permissions.visible(requester, &item.categories).await? {
            return Ok(None);
        }
        Ok(Some(item.strip()))
    }

    /// Items after the one identified by `last_seen`, oldest first.
    ///
    /// Items published at the same instant as the cursor item are included,
    /// the cursor item itself is not. An unknown id yields every item.
    pub async fn items_after(&self, last_seen: Option<&str>) -> Result<Vec<FeedItem>, FeedError> {
        let items = self.store.feed_items().await?;
        let Some(last_seen) = last_seen else {
            return Ok(items);
        };
        let Some(cursor) = items.iter().find(|i| i.id == last_seen).cloned() else {
            return Ok(items);
        };
        Ok(items
            .into_iter()
            .filter(|i| i.publish_time >= cursor.publish_time && i.id != cursor.id)
            .collect())
    }

    /// Answer `GET /api/feed`.
    ///
    /// Without a valid credential the requester is anonymous and gets public
    /// items in the clear. With one, the page is filtered for them and
    /// encrypted to their ephemeral key.
    pub async fn serve(
        &self,
        authorization: Option<&str>,
        last_seen: Option<&str>,
    ) -> Result<FeedResponse, FeedError> {
        let credential = authorization.and_then(|value| {
            VerifiedCredential::from_authorization(value)
                .map_err(|e| tracing::debug!("treating feed request as anonymous: {}", e))
                .ok()
        });
        let requester = credential.as_ref().map(|c| *c.signer());

        let items = self.items_after(last_seen).await?;
        let page = FeedPage {
            messages: self.permissions.filter(requester.as_ref(), items).await?,
        };

        match credential {
            None => Ok(FeedResponse::Plain(page)),
            Some(credential) => {
                tracing::debug!(
                    requester = %credential.signer(),
                    count = page.messages.len(),
                    "serving encrypted feed page"
                );
                let body = serde_json::to_vec(&page)?;
                let envelope = seal_response(self.identity.secret_key(), &credential, &body)?;
                Ok(FeedResponse::Encrypted(envelope))
            }
        }
    }
}
