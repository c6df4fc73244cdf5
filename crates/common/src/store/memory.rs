use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use super::{
    FeedStore, KnownNodeStore, MessageStore, PermissionStore, StoreError, SubscriptionStore,
    TimelineStore,
};
use crate::address::Address;
use crate::crypto::PublicKey;
use crate::models::{
    Cursor, FeedItem, InboxMessage, KnownNode, OutboxMessage, PermissionGrant, PermissionGroup,
    Subscriber, Subscription, TimelineEntry,
};

/// Lock-guarded in-memory store
///
/// Records vanish with the process. Used by the in-process test network and
/// anywhere a throwaway node is enough.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    inner: Arc<RwLock<MemoryStoreInner>>,
}

#[derive(Debug, Default)]
struct MemoryStoreInner {
    feed: BTreeMap<String, FeedItem>,
    /// keyed by canonical subject key
    grants: BTreeMap<String, PermissionGrant>,
    groups: BTreeMap<String, PermissionGroup>,
    /// keyed by canonical key
    known_nodes: BTreeMap<String, KnownNode>,
    avatars: HashMap<String, Vec<u8>>,
    subscriptions: BTreeMap<String, Subscription>,
    /// keyed by canonical key
    subscribers: BTreeMap<String, Subscriber>,
    timeline: Vec<TimelineEntry>,
    outbox: Vec<OutboxMessage>,
    inbox: Vec<InboxMessage>,

    /// (origin_id, canonical source key)
    timeline_index: HashSet<(String, String)>,
    /// (origin_id, canonical sender key), kept after the message is removed
    inbox_index: HashSet<(String, String)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(MemoryStoreInner::default())),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>, StoreError> {
        self.inner
            .read()
            .map_err(|e| anyhow::anyhow!("failed to acquire read lock: {}", e).into())
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>, StoreError> {
        self.inner
            .write()
            .map_err(|e| anyhow::anyhow!("failed to acquire write lock: {}", e).into())
    }

    fn mutate<T>(&self, f: impl FnOnce(&mut MemoryStoreInner) -> T) -> Result<T, StoreError> {
        let mut inner = self.write()?;
        Ok(f(&mut inner))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FeedStore for MemoryStore {
    async fn insert_feed_item(&self, item: FeedItem) -> Result<(), StoreError> {
        self.mutate(|inner| {
            inner.feed.insert(item.id.clone(), item);
        })
    }

    async fn feed_item(&self, id: &str) -> Result<Option<FeedItem>, StoreError> {
        Ok(self.read()?.feed.get(id).cloned())
    }

    async fn feed_items(&self) -> Result<Vec<FeedItem>, StoreError> {
        let mut items: Vec<FeedItem> = self.read()?.feed.values().cloned().collect();
        items.sort_by(|a, b| a.publish_time.cmp(&b.publish_time));
        Ok(items)
    }

    async fn remove_feed_item(&self, id: &str) -> Result<bool, StoreError> {
        self.mutate(|inner| inner.feed.remove(id).is_some())
    }
}

#[async_trait]
impl PermissionStore for MemoryStore {
    async fn grant(&self, subject: &PublicKey) -> Result<Option<PermissionGrant>, StoreError> {
        Ok(self.read()?.grants.get(&subject.to_base64()).cloned())
    }

    async fn grants(&self) -> Result<Vec<PermissionGrant>, StoreError> {
        Ok(self.read()?.grants.values().cloned().collect())
    }

    async fn put_grant(&self, grant: PermissionGrant) -> Result<(), StoreError> {
        self.mutate(|inner| {
            inner.grants.insert(grant.subject.to_base64(), grant);
        })
    }

    async fn remove_grant(&self, subject: &PublicKey) -> Result<bool, StoreError> {
        self.mutate(|inner| inner.grants.remove(&subject.to_base64()).is_some())
    }

    async fn group(&self, id: &str) -> Result<Option<PermissionGroup>, StoreError> {
        Ok(self.read()?.groups.get(id).cloned())
    }

    async fn groups(&self) -> Result<Vec<PermissionGroup>, StoreError> {
        Ok(self.read()?.groups.values().cloned().collect())
    }

    async fn groups_with_member(
        &self,
        member: &PublicKey,
    ) -> Result<Vec<PermissionGroup>, StoreError> {
        Ok(self
            .read()?
            .groups
            .values()
            .filter(|g| g.members.contains(member))
            .cloned()
            .collect())
    }

    async fn put_group(&self, group: PermissionGroup) -> Result<(), StoreError> {
        self.mutate(|inner| {
            inner.groups.insert(group.id.clone(), group);
        })
    }

    async fn remove_group(&self, id: &str) -> Result<bool, StoreError> {
        self.mutate(|inner| inner.groups.remove(id).is_some())
    }
}

#[async_trait]
impl KnownNodeStore for MemoryStore {
    async fn known_node(&self, key: &PublicKey) -> Result<Option<KnownNode>, StoreError> {
        Ok(self.read()?.known_nodes.get(&key.to_base64()).cloned())
    }

    async fn known_nodes(&self) -> Result<Vec<KnownNode>, StoreError> {
        Ok(self.read()?.known_nodes.values().cloned().collect())
    }

    async fn insert_known_node(&self, node: KnownNode) -> Result<KnownNode, StoreError> {
        self.mutate(|inner| {
            inner
                .known_nodes
                .entry(node.public_key.to_base64())
                .or_insert(node)
                .clone()
        })
    }

    async fn replace_known_node(&self, node: KnownNode) -> Result<(), StoreError> {
        self.mutate(|inner| {
            inner.known_nodes.insert(node.public_key.to_base64(), node);
        })
    }

    async fn set_known_node_address(
        &self,
        key: &PublicKey,
        address: &Address,
    ) -> Result<KnownNode, StoreError> {
        self.mutate(|inner| match inner.known_nodes.get_mut(&key.to_base64()) {
            Some(node) => {
                node.address = address.clone();
                Ok(node.clone())
            }
            None => Err(StoreError::NotFound(format!("known node {}", key))),
        })?
    }

    async fn put_avatar(&self, file_name: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        self.mutate(|inner| {
            inner.avatars.insert(file_name.to_string(), bytes);
        })
    }

    async fn avatar(&self, file_name: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.read()?.avatars.get(file_name).cloned())
    }
}

#[async_trait]
impl SubscriptionStore for MemoryStore {
    async fn subscription(&self, id: &str) -> Result<Option<Subscription>, StoreError> {
        Ok(self.read()?.subscriptions.get(id).cloned())
    }

    async fn subscriptions(&self) -> Result<Vec<Subscription>, StoreError> {
        Ok(self.read()?.subscriptions.values().cloned().collect())
    }

    async fn insert_subscription(&self, subscription: Subscription) -> Result<bool, StoreError> {
        self.mutate(|inner| {
            if inner.subscriptions.contains_key(&subscription.id) {
                return false;
            }
            inner
                .subscriptions
                .insert(subscription.id.clone(), subscription);
            true
        })
    }

    async fn remove_subscription(&self, id: &str) -> Result<bool, StoreError> {
        self.mutate(|inner| inner.subscriptions.remove(id).is_some())
    }

    async fn set_cursor(&self, id: &str, cursor: Cursor) -> Result<(), StoreError> {
        self.mutate(|inner| match inner.subscriptions.get_mut(id) {
            Some(subscription) => {
                subscription.cursor = Some(cursor);
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("subscription {}", id))),
        })?
    }

    async fn subscribers(&self) -> Result<Vec<Subscriber>, StoreError> {
        Ok(self.read()?.subscribers.values().cloned().collect())
    }

    async fn insert_subscriber(&self, subscriber: Subscriber) -> Result<bool, StoreError> {
        self.mutate(|inner| {
            let key = subscriber.public_key.to_base64();
            if inner.subscribers.contains_key(&key) {
                return false;
            }
            inner.subscribers.insert(key, subscriber);
            true
        })
    }
}

#[async_trait]
impl TimelineStore for MemoryStore {
    async fn insert_timeline_entry(&self, entry: TimelineEntry) -> Result<bool, StoreError> {
        self.mutate(|inner| {
            let key = (entry.origin_id.clone(), entry.source_public_key.to_base64());
            if !inner.timeline_index.insert(key) {
                return false;
            }
            inner.timeline.push(entry);
            true
        })
    }

    async fn timeline_entry(&self, local_id: &str) -> Result<Option<TimelineEntry>, StoreError> {
        Ok(self
            .read()?
            .timeline
            .iter()
            .find(|e| e.local_id == local_id)
            .cloned())
    }

    async fn timeline_entries(&self) -> Result<Vec<TimelineEntry>, StoreError> {
        Ok(self.read()?.timeline.clone())
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn insert_outbox_message(&self, message: OutboxMessage) -> Result<(), StoreError> {
        self.mutate(|inner| inner.outbox.push(message))
    }

    async fn outbox_messages(&self) -> Result<Vec<OutboxMessage>, StoreError> {
        Ok(self.read()?.outbox.clone())
    }

    async fn outbox_messages_for(
        &self,
        recipient: &PublicKey,
    ) -> Result<Vec<OutboxMessage>, StoreError> {
        Ok(self
            .read()?
            .outbox
            .iter()
            .filter(|m| &m.recipient_public_key == recipient)
            .cloned()
            .collect())
    }

    async fn remove_outbox_message(&self, id: &str) -> Result<bool, StoreError> {
        self.mutate(|inner| {
            let before = inner.outbox.len();
            inner.outbox.retain(|m| m.id != id);
            inner.outbox.len() != before
        })
    }

    async fn insert_inbox_message(&self, message: InboxMessage) -> Result<bool, StoreError> {
        self.mutate(|inner| {
            let key = (
                message.origin_id.clone(),
                message.sender_public_key.to_base64(),
            );
            if !inner.inbox_index.insert(key) {
                return false;
            }
            inner.inbox.push(message);
            true
        })
    }

    async fn inbox_messages(&self) -> Result<Vec<InboxMessage>, StoreError> {
        Ok(self.read()?.inbox.clone())
    }

    async fn remove_inbox_message(&self, local_id: &str) -> Result<bool, StoreError> {
        self.mutate(|inner| {
            let before = inner.inbox.len();
            inner.inbox.retain(|m| m.local_id != local_id);
            inner.inbox.len() != before
        })
    }
}

#[cfg(test)]
mod test {
    use chrono::Utc;

    use super::*;
    use crate::crypto::SecretKey;

    fn entry(origin_id: &str, source: PublicKey, local_id: &str) -> TimelineEntry {
        TimelineEntry {
            local_id: local_id.into(),
            origin_id: origin_id.into(),
            source_public_key: source,
            source_address: Address::parse("remote.test").unwrap(),
            retrieved_at: Utc::now(),
            publish_time: Utc::now(),
            categories: Default::default(),
            kind: "post".into(),
            content: "hello".into(),
        }
    }

    fn known(key: PublicKey, name: &str) -> KnownNode {
        KnownNode {
            public_key: key,
            address: Address::parse("remote.test").unwrap(),
            display_name: Some(name.into()),
            bio: None,
            avatar: None,
        }
    }

    #[tokio::test]
    async fn test_timeline_dedup_is_per_source() {
        let store = MemoryStore::new();
        let a = SecretKey::generate().public();
        let b = SecretKey::generate().public();

        assert!(store.insert_timeline_entry(entry("1", a, "l1")).await.unwrap());
        assert!(!store.insert_timeline_entry(entry("1", a, "l2")).await.unwrap());
        // same origin id from a different node is a different item
        assert!(store.insert_timeline_entry(entry("1", b, "l3")).await.unwrap());

        assert_eq!(store.timeline_entries().await.unwrap().len(), 2);
        assert!(store.timeline_entry("l2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_known_node_first_write_wins() {
        let store = MemoryStore::new();
        let key = SecretKey::generate().public();

        let first = store.insert_known_node(known(key, "first")).await.unwrap();
        let second = store.insert_known_node(known(key, "second")).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(second.display_name.as_deref(), Some("first"));

        store.replace_known_node(known(key, "refreshed")).await.unwrap();
        let current = store.known_node(&key).await.unwrap().unwrap();
        assert_eq!(current.display_name.as_deref(), Some("refreshed"));
    }

    #[tokio::test]
    async fn test_set_cursor_on_missing_subscription() {
        let store = MemoryStore::new();
        let cursor = Cursor {
            item_id: "x".into(),
            publish_time: Utc::now(),
        };
        assert!(matches!(
            store.set_cursor("nope", cursor).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_removed_inbox_message_stays_deduplicated() {
        let store = MemoryStore::new();
        let sender = SecretKey::generate().public();
        let message = |local: &str| InboxMessage {
            local_id: local.into(),
            origin_id: "remote-1".into(),
            sender_public_key: sender,
            sent_at: Utc::now(),
            kind: "message".into(),
            content: "hi".into(),
        };

        assert!(store.insert_inbox_message(message("a")).await.unwrap());
        assert!(!store.insert_inbox_message(message("b")).await.unwrap());
        assert!(store.remove_inbox_message("a").await.unwrap());
        assert!(store.inbox_messages().await.unwrap().is_empty());

        // a later pull of the same remote message does not bring it back
        assert!(!store.insert_inbox_message(message("c")).await.unwrap());
        assert!(store.inbox_messages().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_known_node_address_moves_alone() {
        let store = MemoryStore::new();
        let key = SecretKey::generate().public();
        let elsewhere = Address::parse("elsewhere.test").unwrap();

        assert!(matches!(
            store.set_known_node_address(&key, &elsewhere).await,
            Err(StoreError::NotFound(_))
        ));

        store.insert_known_node(known(key, "first")).await.unwrap();
        let moved = store.set_known_node_address(&key, &elsewhere).await.unwrap();
        assert_eq!(moved.address, elsewhere);
        assert_eq!(moved.display_name.as_deref(), Some("first"));
        assert_eq!(store.known_node(&key).await.unwrap(), Some(moved));
    }
}
