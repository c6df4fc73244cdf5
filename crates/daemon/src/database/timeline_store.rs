use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;

use common::models::TimelineEntry;
use common::store::{StoreError, TimelineStore};

use super::types::{DAddress, DPublicKey};
use super::{store_error, Database};

#[derive(sqlx::FromRow)]
struct TimelineRow {
    local_id: String,
    origin_id: String,
    source_public_key: DPublicKey,
    source_address: DAddress,
    retrieved_at: DateTime<Utc>,
    publish_time: DateTime<Utc>,
    categories: Json<BTreeSet<String>>,
    kind: String,
    content: String,
}

impl From<TimelineRow> for TimelineEntry {
    fn from(row: TimelineRow) -> Self {
        TimelineEntry {
            local_id: row.local_id,
            origin_id: row.origin_id,
            source_public_key: row.source_public_key.into(),
            source_address: row.source_address.into(),
            retrieved_at: row.retrieved_at,
            publish_time: row.publish_time,
            categories: row.categories.0,
            kind: row.kind,
            content: row.content,
        }
    }
}

#[async_trait]
impl TimelineStore for Database {
    async fn insert_timeline_entry(&self, entry: TimelineEntry) -> Result<bool, StoreError> {
        // the (origin_id, source_public_key) constraint is the dedup
        let result = sqlx::query(
            r#"
            INSERT INTO timeline_entries (
                local_id, origin_id, source_public_key, source_address,
                retrieved_at, publish_time, categories, kind, content
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (origin_id, source_public_key) DO NOTHING
            "#,
        )
        .bind(entry.local_id)
        .bind(entry.origin_id)
        .bind(DPublicKey::from(entry.source_public_key))
        .bind(DAddress::from(entry.source_address))
        .bind(entry.retrieved_at)
        .bind(entry.publish_time)
        .bind(Json(entry.categories))
        .bind(entry.kind)
        .bind(entry.content)
        .execute(&**self)
        .await
        .map_err(store_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn timeline_entry(&self, local_id: &str) -> Result<Option<TimelineEntry>, StoreError> {
        let row = sqlx::query_as::<_, TimelineRow>(
            r#"
            SELECT local_id, origin_id, source_public_key, source_address,
                   retrieved_at, publish_time, categories, kind, content
            FROM timeline_entries
            WHERE local_id = $1
            "#,
        )
        .bind(local_id)
        .fetch_optional(&**self)
        .await
        .map_err(store_error)?;
        Ok(row.map(Into::into))
    }

    async fn timeline_entries(&self) -> Result<Vec<TimelineEntry>, StoreError> {
        let rows = sqlx::query_as::<_, TimelineRow>(
            r#"
            SELECT local_id, origin_id, source_public_key, source_address,
                   retrieved_at, publish_time, categories, kind, content
            FROM timeline_entries
            ORDER BY seq ASC
            "#,
        )
        .fetch_all(&**self)
        .await
        .map_err(store_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}
