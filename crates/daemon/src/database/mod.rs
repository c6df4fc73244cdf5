//! SQLite-backed record store for a running daemon.
//!
//! Each file in here implements one of the record store traits from
//! `common::store` on [`Database`].

mod feed_store;
mod known_node_store;
mod message_store;
mod permission_store;
mod sqlite;
mod subscription_store;
mod timeline_store;
mod types;

use std::ops::Deref;

use sqlx::SqlitePool;

use common::store::StoreError;

/// Connection string for a private in-memory database
pub const IN_MEMORY_URL: &str = "sqlite::memory:";

#[derive(Clone, Debug)]
pub struct Database(SqlitePool);

impl Database {
    pub async fn connect(database_url: &url::Url) -> Result<Self, DatabaseSetupError> {
        if database_url.scheme() == "sqlite" {
            let db = sqlite::connect_sqlite(database_url).await?;
            sqlite::migrate_sqlite(&db).await?;
            return Ok(Database::new(db));
        }

        Err(DatabaseSetupError::UnknownDbType(
            database_url.scheme().to_string(),
        ))
    }

    /// A fresh database that lives as long as this handle and its clones
    pub async fn in_memory() -> Result<Self, DatabaseSetupError> {
        Self::connect(&url::Url::parse(IN_MEMORY_URL)?).await
    }

    pub fn new(pool: SqlitePool) -> Self {
        Self(pool)
    }
}

impl Deref for Database {
    type Target = SqlitePool;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

fn store_error(e: sqlx::Error) -> StoreError {
    StoreError::Default(e.into())
}

#[derive(Debug, thiserror::Error)]
pub enum DatabaseSetupError {
    #[error("error occurred while attempting database migration: {0}")]
    MigrationFailed(sqlx::migrate::MigrateError),

    #[error("unable to perform initial connection and check of the database: {0}")]
    Unavailable(sqlx::Error),

    #[error("requested database type was not recognized: {0}")]
    UnknownDbType(String),

    #[error("invalid database url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::{Duration, Utc};

    use common::address::Address;
    use common::crypto::{PublicKey, SecretKey};
    use common::models::{
        Cursor, FeedItem, InboxMessage, KnownNode, PermissionGroup, Rule, Subscription,
        TimelineEntry,
    };
    use common::store::{
        FeedStore, KnownNodeStore, MessageStore, PermissionStore, SubscriptionStore,
        TimelineStore,
    };

    use super::*;

    fn entry(origin_id: &str, source: PublicKey, local_id: &str) -> TimelineEntry {
        TimelineEntry {
            local_id: local_id.into(),
            origin_id: origin_id.into(),
            source_public_key: source,
            source_address: Address::parse("remote.test").unwrap(),
            retrieved_at: Utc::now(),
            publish_time: Utc::now(),
            categories: ["friends".to_string()].into(),
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
        let db = Database::in_memory().await.unwrap();
        let a = SecretKey::generate().public();
        let b = SecretKey::generate().public();

        assert!(db.insert_timeline_entry(entry("1", a, "l1")).await.unwrap());
        assert!(!db.insert_timeline_entry(entry("1", a, "l2")).await.unwrap());
        assert!(db.insert_timeline_entry(entry("1", b, "l3")).await.unwrap());

        let entries = db.timeline_entries().await.unwrap();
        assert_eq!(
            entries.iter().map(|e| e.local_id.as_str()).collect::<Vec<_>>(),
            vec!["l1", "l3"]
        );
        assert!(db.timeline_entry("l2").await.unwrap().is_none());
        assert_eq!(db.timeline_entry("l1").await.unwrap().as_ref(), entries.first());
    }

    #[tokio::test]
    async fn test_known_node_first_write_wins_then_moves() {
        let db = Database::in_memory().await.unwrap();
        let key = SecretKey::generate().public();
        let elsewhere = Address::parse("elsewhere.test").unwrap();

        assert!(matches!(
            db.set_known_node_address(&key, &elsewhere).await,
            Err(StoreError::NotFound(_))
        ));

        let first = db.insert_known_node(known(key, "first")).await.unwrap();
        let second = db.insert_known_node(known(key, "second")).await.unwrap();
        assert_eq!(first, second);

        let moved = db.set_known_node_address(&key, &elsewhere).await.unwrap();
        assert_eq!(moved.address, elsewhere);
        assert_eq!(moved.display_name.as_deref(), Some("first"));

        db.replace_known_node(known(key, "refreshed")).await.unwrap();
        let current = db.known_node(&key).await.unwrap().unwrap();
        assert_eq!(current.display_name.as_deref(), Some("refreshed"));
        assert_eq!(db.known_nodes().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_removed_inbox_message_stays_deduplicated() {
        let db = Database::in_memory().await.unwrap();
        let sender = SecretKey::generate().public();
        let message = |local: &str| InboxMessage {
            local_id: local.into(),
            origin_id: "remote-1".into(),
            sender_public_key: sender,
            sent_at: Utc::now(),
            kind: "message".into(),
            content: "hi".into(),
        };

        assert!(db.insert_inbox_message(message("a")).await.unwrap());
        assert!(!db.insert_inbox_message(message("b")).await.unwrap());
        assert!(db.remove_inbox_message("a").await.unwrap());
        assert!(!db.remove_inbox_message("a").await.unwrap());

        assert!(!db.insert_inbox_message(message("c")).await.unwrap());
        assert!(db.inbox_messages().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cursor_updates_and_missing_subscription() {
        let db = Database::in_memory().await.unwrap();
        let cursor = Cursor {
            item_id: "x".into(),
            publish_time: Utc::now(),
        };
        assert!(matches!(
            db.set_cursor("nope", cursor.clone()).await,
            Err(StoreError::NotFound(_))
        ));

        let subscription = Subscription {
            id: "sub-1".into(),
            target_address: Address::parse("remote.test").unwrap(),
            public_key: SecretKey::generate().public(),
            subscribed_at: Utc::now(),
            cursor: None,
        };
        assert!(db.insert_subscription(subscription.clone()).await.unwrap());
        assert!(!db.insert_subscription(subscription).await.unwrap());

        db.set_cursor("sub-1", cursor.clone()).await.unwrap();
        let stored = db.subscription("sub-1").await.unwrap().unwrap();
        assert_eq!(stored.cursor, Some(cursor));
    }

    #[tokio::test]
    async fn test_group_members_follow_the_group() {
        let db = Database::in_memory().await.unwrap();
        let alice = SecretKey::generate().public();
        let bob = SecretKey::generate().public();

        let mut group = PermissionGroup {
            id: "g1".into(),
            name: "close friends".into(),
            description: String::new(),
            members: [alice, bob].into(),
            rule: Rule::categories(["friends"]),
        };
        db.put_group(group.clone()).await.unwrap();
        assert_eq!(db.group("g1").await.unwrap(), Some(group.clone()));

        group.members = BTreeSet::from([bob]);
        db.put_group(group.clone()).await.unwrap();
        assert!(db.groups_with_member(&alice).await.unwrap().is_empty());
        assert_eq!(db.groups_with_member(&bob).await.unwrap(), vec![group]);

        assert!(db.remove_group("g1").await.unwrap());
        assert!(db.groups_with_member(&bob).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_records_survive_reconnect() {
        let dir = tempfile::tempdir().unwrap();
        let url = url::Url::parse(&format!(
            "sqlite://{}",
            dir.path().join("db.sqlite").display()
        ))
        .unwrap();
        let older = Utc::now() - Duration::minutes(5);

        let db = Database::connect(&url).await.unwrap();
        for (id, publish_time) in [("newer", Utc::now()), ("older", older)] {
            db.insert_feed_item(FeedItem {
                id: id.into(),
                publish_time,
                categories: BTreeSet::new(),
                kind: "post".into(),
                content: id.into(),
            })
            .await
            .unwrap();
        }
        db.put_avatar("avatar.png", vec![1, 2, 3]).await.unwrap();
        db.close().await;

        let db = Database::connect(&url).await.unwrap();
        let ids: Vec<_> = db
            .feed_items()
            .await
            .unwrap()
            .into_iter()
            .map(|item| item.id)
            .collect();
        assert_eq!(ids, vec!["older", "newer"]);
        assert_eq!(db.avatar("avatar.png").await.unwrap(), Some(vec![1, 2, 3]));
    }
}
