//! Cursor-driven pulls of subscribed feeds into the local timeline
//!
//! A sync pass visits every subscription once. Each visit is one
//! authenticated `GET /api/feed?last_seen=<cursor>` verified against the
//! subscribed node's key. Items are inserted under the dedup key
//! `(origin_id, source_public_key)`, and the cursor moves to the item with
//! the latest publish time in the batch. A failed visit is logged and leaves
//! that subscription untouched; it never aborts the pass.
//!
//! Nothing here runs on its own. Passes happen when the timeline is read or
//! when an external driver calls [`Synchronizer::sync`].

use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::client::{self, PullError};
use crate::clock::Clock;
use crate::directory::{Directory, DirectoryError};
use crate::identity::Identity;
use crate::ids::IdGenerator;
use crate::locks::RecordLocks;
use crate::models::{
    Cursor, FeedMessage, InboxNotification, NotificationKind, Subscription, TimelineEntry,
};
use crate::protocol::{FeedPage, FEED_PATH, LAST_SEEN_PARAM};
use crate::store::{KnownNodeStore, StoreError, SubscriptionStore, TimelineStore};
use crate::transport::Transport;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("no node answered at {0}")]
    UnknownPeer(Address),
    #[error("cannot subscribe to our own feed")]
    SelfSubscription,
    #[error(transparent)]
    Pull(#[from] PullError),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome of one sync pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Subscriptions pulled successfully
    pub synced: usize,
    /// Ids of subscriptions skipped this pass
    pub failed: Vec<String>,
    /// Timeline entries added
    pub new_entries: usize,
}

#[derive(Debug, Clone)]
pub struct Synchronizer<S, T> {
    identity: Arc<Identity>,
    store: S,
    transport: T,
    directory: Directory<S, T>,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
    locks: RecordLocks,
}

impl<S, T> Synchronizer<S, T>
where
    S: SubscriptionStore + TimelineStore + KnownNodeStore,
    T: Transport,
{
    pub fn new(
        identity: Arc<Identity>,
        store: S,
        transport: T,
        directory: Directory<S, T>,
        ids: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            identity,
            store,
            transport,
            directory,
            ids,
            clock,
            locks: RecordLocks::new(),
        }
    }

    /// Subscribe to the feed of the node at `address`.
    ///
    /// Subscribing twice to the same node returns the existing subscription.
    pub async fn subscribe(&self, address: &Address) -> Result<Subscription, SyncError> {
        let node = self
            .directory
            .resolve(address)
            .await?
            .ok_or_else(|| SyncError::UnknownPeer(address.clone()))?;
        if &node.public_key == self.identity.public_key() {
            return Err(SyncError::SelfSubscription);
        }

        let subscription = Subscription {
            id: node.public_key.to_id(),
            target_address: address.clone(),
            public_key: node.public_key,
            subscribed_at: self.clock.now(),
            cursor: None,
        };
        if !self.store.insert_subscription(subscription.clone()).await? {
            tracing::debug!(key = %node.public_key, "already subscribed");
            if let Some(existing) = self.store.subscription(&subscription.id).await? {
                return Ok(existing);
            }
        }
        tracing::info!(key = %node.public_key, %address, "subscribed");

        let notification = InboxNotification {
            url: self.identity.address().to_string(),
            public_signing_key: self.identity.public_key().to_base64(),
            kind: NotificationKind::NewSubscriber,
        };
        if let Err(e) = client::notify(&self.transport, address, &notification).await {
            tracing::warn!(%address, "failed to notify new subscription: {}", e);
        }

        Ok(subscription)
    }

    pub async fn unsubscribe(&self, id: &str) -> Result<bool, SyncError> {
        let _guard = self.locks.lock(id).await;
        let removed = self.store.remove_subscription(id).await?;
        if removed {
            tracing::info!(id, "unsubscribed");
        }
        Ok(removed)
    }

    pub async fn subscriptions(&self) -> Result<Vec<Subscription>, SyncError> {
        Ok(self.store.subscriptions().await?)
    }

    /// Pull every subscription once, concurrently
    pub async fn sync(&self) -> Result<SyncReport, SyncError> {
        let subscriptions = self.store.subscriptions().await?;
        let results = join_all(
            subscriptions
                .iter()
                .map(|subscription| self.sync_subscription(&subscription.id)),
        )
        .await;

        let mut report = SyncReport::default();
        for (subscription, result) in subscriptions.iter().zip(results) {
            match result {
                Ok(added) => {
                    report.synced += 1;
                    report.new_entries += added;
                }
                Err(e) => {
                    tracing::warn!(
                        address = %subscription.target_address,
                        "skipping subscription this pass: {}",
                        e
                    );
                    report.failed.push(subscription.id.clone());
                }
            }
        }

        tracing::debug!(?report, "sync pass complete");
        Ok(report)
    }

    /// Pull one subscription. Returns the number of new timeline entries.
    pub async fn sync_subscription(&self, id: &str) -> Result<usize, SyncError> {
        let _guard = self.locks.lock(id).await;

        // re-read under the lock so the cursor is current
        let Some(subscription) = self.store.subscription(id).await? else {
            return Ok(0);
        };

        let mut url = subscription.target_address.endpoint(FEED_PATH);
        if let Some(cursor) = &subscription.cursor {
            url.query_pairs_mut()
                .append_pair(LAST_SEEN_PARAM, &cursor.item_id);
        }

        let page: FeedPage = client::authenticated_get(
            &self.transport,
            self.identity.secret_key(),
            &url,
            &subscription.public_key,
        )
        .await?;

        let mut newest: Option<&FeedMessage> = None;
        let mut added = 0;
        for message in &page.messages {
            if newest.map_or(true, |n| message.publish_time > n.publish_time) {
                newest = Some(message);
            }
            let entry = TimelineEntry {
                local_id: self.ids.next_id(),
                origin_id: message.id.clone(),
                source_public_key: subscription.public_key,
                source_address: subscription.target_address.clone(),
                retrieved_at: self.clock.now(),
                publish_time: message.publish_time,
                categories: Default::default(),
                kind: message.kind.clone(),
                content: message.content.clone(),
            };
            if self.store.insert_timeline_entry(entry).await? {
                added += 1;
            }
        }

        if let Some(newest) = newest {
            let behind = subscription
                .cursor
                .as_ref()
                .is_some_and(|c| newest.publish_time < c.publish_time);
            if !behind {
                self.store
                    .set_cursor(
                        id,
                        Cursor {
                            item_id: newest.id.clone(),
                            publish_time: newest.publish_time,
                        },
                    )
                    .await?;
            }
        }

        if added > 0 {
            tracing::info!(
                address = %subscription.target_address,
                added,
                "pulled new feed items"
            );
        }
        Ok(added)
    }

    /// Run a sync pass, then return the timeline newest first
    pub async fn timeline(&self) -> Result<Vec<TimelineEntry>, SyncError> {
        self.sync().await?;
        let mut entries = self.store.timeline_entries().await?;
        entries.sort_by(|a, b| b.publish_time.cmp(&a.publish_time));
        Ok(entries)
    }

    /// Run a sync pass, then look up one timeline entry
    pub async fn timeline_entry(&self, local_id: &str) -> Result<Option<TimelineEntry>, SyncError> {
        self.sync().await?;
        Ok(self.store.timeline_entry(local_id).await?)
    }
}
