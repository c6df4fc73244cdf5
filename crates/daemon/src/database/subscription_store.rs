use async_trait::async_trait;
use chrono::{DateTime, Utc};

use common::models::{Cursor, Subscriber, Subscription};
use common::store::{StoreError, SubscriptionStore};

use super::types::{DAddress, DPublicKey};
use super::{store_error, Database};

#[derive(sqlx::FromRow)]
struct SubscriptionRow {
    id: String,
    target_address: DAddress,
    public_key: DPublicKey,
    subscribed_at: DateTime<Utc>,
    cursor_item_id: Option<String>,
    cursor_publish_time: Option<DateTime<Utc>>,
}

impl From<SubscriptionRow> for Subscription {
    fn from(row: SubscriptionRow) -> Self {
        let cursor = match (row.cursor_item_id, row.cursor_publish_time) {
            (Some(item_id), Some(publish_time)) => Some(Cursor {
                item_id,
                publish_time,
            }),
            _ => None,
        };
        Subscription {
            id: row.id,
            target_address: row.target_address.into(),
            public_key: row.public_key.into(),
            subscribed_at: row.subscribed_at,
            cursor,
        }
    }
}

#[derive(sqlx::FromRow)]
struct SubscriberRow {
    id: String,
    public_key: DPublicKey,
    address: DAddress,
    subscribed_at: DateTime<Utc>,
}

impl From<SubscriberRow> for Subscriber {
    fn from(row: SubscriberRow) -> Self {
        Subscriber {
            id: row.id,
            public_key: row.public_key.into(),
            address: row.address.into(),
            subscribed_at: row.subscribed_at,
        }
    }
}

#[async_trait]
impl SubscriptionStore for Database {
    async fn subscription(&self, id: &str) -> Result<Option<Subscription>, StoreError> {
        let row = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            SELECT id, target_address, public_key, subscribed_at,
                   cursor_item_id, cursor_publish_time
            FROM subscriptions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&**self)
        .await
        .map_err(store_error)?;
        Ok(row.map(Into::into))
    }

    async fn subscriptions(&self) -> Result<Vec<Subscription>, StoreError> {
        let rows = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            SELECT id, target_address, public_key, subscribed_at,
                   cursor_item_id, cursor_publish_time
            FROM subscriptions
            ORDER BY id
            "#,
        )
        .fetch_all(&**self)
        .await
        .map_err(store_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn insert_subscription(&self, subscription: Subscription) -> Result<bool, StoreError> {
        let (cursor_item_id, cursor_publish_time) = match subscription.cursor {
            Some(cursor) => (Some(cursor.item_id), Some(cursor.publish_time)),
            None => (None, None),
        };
        let result = sqlx::query(
            r#"
            INSERT INTO subscriptions
                (id, target_address, public_key, subscribed_at, cursor_item_id, cursor_publish_time)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(subscription.id)
        .bind(DAddress::from(subscription.target_address))
        .bind(DPublicKey::from(subscription.public_key))
        .bind(subscription.subscribed_at)
        .bind(cursor_item_id)
        .bind(cursor_publish_time)
        .execute(&**self)
        .await
        .map_err(store_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_subscription(&self, id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM subscriptions WHERE id = $1")
            .bind(id)
            .execute(&**self)
            .await
            .map_err(store_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_cursor(&self, id: &str, cursor: Cursor) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions
            SET cursor_item_id = $1, cursor_publish_time = $2
            WHERE id = $3
            "#,
        )
        .bind(cursor.item_id)
        .bind(cursor.publish_time)
        .bind(id)
        .execute(&**self)
        .await
        .map_err(store_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("subscription {}", id)));
        }
        Ok(())
    }

    async fn subscribers(&self) -> Result<Vec<Subscriber>, StoreError> {
        let rows = sqlx::query_as::<_, SubscriberRow>(
            "SELECT id, public_key, address, subscribed_at FROM subscribers ORDER BY subscribed_at",
        )
        .fetch_all(&**self)
        .await
        .map_err(store_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn insert_subscriber(&self, subscriber: Subscriber) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO subscribers (public_key, id, address, subscribed_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (public_key) DO NOTHING
            "#,
        )
        .bind(DPublicKey::from(subscriber.public_key))
        .bind(subscriber.id)
        .bind(DAddress::from(subscriber.address))
        .bind(subscriber.subscribed_at)
        .execute(&**self)
        .await
        .map_err(store_error)?;
        Ok(result.rows_affected() > 0)
    }
}
