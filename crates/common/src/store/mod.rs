//! Keyed record store
//!
//! One async repository trait per record family. Components take the
//! narrowest trait they need; a node is wired with a single type that
//! implements all of them, see [`Store`].
//!
//! Writes that enforce uniqueness (timeline and inbox dedup, first-write-wins
//! known nodes, one subscription per remote key) are atomic inside the
//! implementation, so callers never race a check against an insert.

use async_trait::async_trait;

use crate::address::Address;
use crate::crypto::PublicKey;
use crate::models::{
    Cursor, FeedItem, InboxMessage, KnownNode, OutboxMessage, PermissionGrant, PermissionGroup,
    Subscriber, Subscription, TimelineEntry,
};

mod memory;

pub use memory::MemoryStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store error: {0}")]
    Default(#[from] anyhow::Error),
    #[error("record not found: {0}")]
    NotFound(String),
}

#[async_trait]
pub trait FeedStore: Send + Sync + std::fmt::Debug + Clone + 'static {
    async fn insert_feed_item(&self, item: FeedItem) -> Result<(), StoreError>;

    async fn feed_item(&self, id: &str) -> Result<Option<FeedItem>, StoreError>;

    /// All items, oldest first
    async fn feed_items(&self) -> Result<Vec<FeedItem>, StoreError>;

    /// Returns false if no item had that id
    async fn remove_feed_item(&self, id: &str) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait PermissionStore: Send + Sync + std::fmt::Debug + Clone + 'static {
    async fn grant(&self, subject: &PublicKey) -> Result<Option<PermissionGrant>, StoreError>;

    async fn grants(&self) -> Result<Vec<PermissionGrant>, StoreError>;

    /// Insert or replace the grant for `grant.subject`
    async fn put_grant(&self, grant: PermissionGrant) -> Result<(), StoreError>;

    async fn remove_grant(&self, subject: &PublicKey) -> Result<bool, StoreError>;

    async fn group(&self, id: &str) -> Result<Option<PermissionGroup>, StoreError>;

    async fn groups(&self) -> Result<Vec<PermissionGroup>, StoreError>;

    /// Groups listing `member` among their members
    async fn groups_with_member(
        &self,
        member: &PublicKey,
    ) -> Result<Vec<PermissionGroup>, StoreError>;

    /// Insert or replace the group with `group.id`
    async fn put_group(&self, group: PermissionGroup) -> Result<(), StoreError>;

    async fn remove_group(&self, id: &str) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait KnownNodeStore: Send + Sync + std::fmt::Debug + Clone + 'static {
    async fn known_node(&self, key: &PublicKey) -> Result<Option<KnownNode>, StoreError>;

    async fn known_nodes(&self) -> Result<Vec<KnownNode>, StoreError>;

    /// First write wins: if a record for the key exists it is returned
    /// unchanged and `node` is discarded.
    async fn insert_known_node(&self, node: KnownNode) -> Result<KnownNode, StoreError>;

    /// Unconditional replace, used only by an explicit refresh
    async fn replace_known_node(&self, node: KnownNode) -> Result<(), StoreError>;

    /// Move a known node to a new address, leaving its profile alone.
    /// Fails with `NotFound` if the key is unknown.
    async fn set_known_node_address(
        &self,
        key: &PublicKey,
        address: &Address,
    ) -> Result<KnownNode, StoreError>;

    async fn put_avatar(&self, file_name: &str, bytes: Vec<u8>) -> Result<(), StoreError>;

    async fn avatar(&self, file_name: &str) -> Result<Option<Vec<u8>>, StoreError>;
}

#[async_trait]
pub trait SubscriptionStore: Send + Sync + std::fmt::Debug + Clone + 'static {
    async fn subscription(&self, id: &str) -> Result<Option<Subscription>, StoreError>;

    async fn subscriptions(&self) -> Result<Vec<Subscription>, StoreError>;

    /// Returns false, leaving the existing record alone, if the id is taken
    async fn insert_subscription(&self, subscription: Subscription) -> Result<bool, StoreError>;

    async fn remove_subscription(&self, id: &str) -> Result<bool, StoreError>;

    /// Replace the cursor. Fails with `NotFound` if the subscription is gone.
    async fn set_cursor(&self, id: &str, cursor: Cursor) -> Result<(), StoreError>;

    async fn subscribers(&self) -> Result<Vec<Subscriber>, StoreError>;

    /// Returns false if a subscriber with the same key exists
    async fn insert_subscriber(&self, subscriber: Subscriber) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait TimelineStore: Send + Sync + std::fmt::Debug + Clone + 'static {
    /// Returns false, inserting nothing, if an entry with the same
    /// `(origin_id, source_public_key)` exists
    async fn insert_timeline_entry(&self, entry: TimelineEntry) -> Result<bool, StoreError>;

    async fn timeline_entry(&self, local_id: &str) -> Result<Option<TimelineEntry>, StoreError>;

    async fn timeline_entries(&self) -> Result<Vec<TimelineEntry>, StoreError>;
}

#[async_trait]
pub trait MessageStore: Send + Sync + std::fmt::Debug + Clone + 'static {
    async fn insert_outbox_message(&self, message: OutboxMessage) -> Result<(), StoreError>;

    async fn outbox_messages(&self) -> Result<Vec<OutboxMessage>, StoreError>;

    async fn outbox_messages_for(
        &self,
        recipient: &PublicKey,
    ) -> Result<Vec<OutboxMessage>, StoreError>;

    async fn remove_outbox_message(&self, id: &str) -> Result<bool, StoreError>;

    /// Returns false if `(origin_id, sender_public_key)` was ever stored,
    /// including messages since removed
    async fn insert_inbox_message(&self, message: InboxMessage) -> Result<bool, StoreError>;

    async fn inbox_messages(&self) -> Result<Vec<InboxMessage>, StoreError>;

    async fn remove_inbox_message(&self, local_id: &str) -> Result<bool, StoreError>;
}

/// Everything a node persists
pub trait Store:
    FeedStore + PermissionStore + KnownNodeStore + SubscriptionStore + TimelineStore + MessageStore
{
}

impl<T> Store for T where
    T: FeedStore
        + PermissionStore
        + KnownNodeStore
        + SubscriptionStore
        + TimelineStore
        + MessageStore
{
}
