use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;

use common::models::FeedItem;
use common::store::{FeedStore, StoreError};

use super::{store_error, Database};

#[derive(sqlx::FromRow)]
struct FeedItemRow {
    id: String,
    publish_time: DateTime<Utc>,
    categories: Json<BTreeSet<String>>,
    kind: String,
    content: String,
}

impl From<FeedItemRow> for FeedItem {
    fn from(row: FeedItemRow) -> Self {
        FeedItem {
            id: row.id,
            publish_time: row.publish_time,
            categories: row.categories.0,
            kind: row.kind,
            content: row.content,
        }
    }
}

#[async_trait]
impl FeedStore for Database {
    async fn insert_feed_item(&self, item: FeedItem) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO feed_items (id, publish_time, categories, kind, content)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE SET
                publish_time = excluded.publish_time,
                categories = excluded.categories,
                kind = excluded.kind,
                content = excluded.content
            "#,
        )
        .bind(item.id)
        .bind(item.publish_time)
        .bind(Json(item.categories))
        .bind(item.kind)
        .bind(item.content)
        .execute(&**self)
        .await
        .map_err(store_error)?;
        Ok(())
    }

    async fn feed_item(&self, id: &str) -> Result<Option<FeedItem>, StoreError> {
        let row = sqlx::query_as::<_, FeedItemRow>(
            r#"
            SELECT id, publish_time, categories, kind, content
            FROM feed_items
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&**self)
        .await
        .map_err(store_error)?;
        Ok(row.map(Into::into))
    }

    async fn feed_items(&self) -> Result<Vec<FeedItem>, StoreError> {
        let rows = sqlx::query_as::<_, FeedItemRow>(
            r#"
            SELECT id, publish_time, categories, kind, content
            FROM feed_items
            "#,
        )
        .fetch_all(&**self)
        .await
        .map_err(store_error)?;

        // timestamps are stored as text, so order on the parsed value
        let mut items: Vec<FeedItem> = rows.into_iter().map(Into::into).collect();
        items.sort_by(|a, b| a.publish_time.cmp(&b.publish_time));
        Ok(items)
    }

    async fn remove_feed_item(&self, id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM feed_items WHERE id = $1")
            .bind(id)
            .execute(&**self)
            .await
            .map_err(store_error)?;
        Ok(result.rows_affected() > 0)
    }
}
