use async_trait::async_trait;
use chrono::{DateTime, Utc};

use common::crypto::PublicKey;
use common::models::{InboxMessage, OutboxMessage};
use common::store::{MessageStore, StoreError};

use super::types::{DAddress, DPublicKey};
use super::{store_error, Database};

#[derive(sqlx::FromRow)]
struct OutboxRow {
    id: String,
    recipient_public_key: DPublicKey,
    recipient_address: DAddress,
    sent_at: DateTime<Utc>,
    kind: String,
    content: String,
}

impl From<OutboxRow> for OutboxMessage {
    fn from(row: OutboxRow) -> Self {
        OutboxMessage {
            id: row.id,
            recipient_public_key: row.recipient_public_key.into(),
            recipient_address: row.recipient_address.into(),
            sent_at: row.sent_at,
            kind: row.kind,
            content: row.content,
        }
    }
}

#[derive(sqlx::FromRow)]
struct InboxRow {
    local_id: String,
    origin_id: String,
    sender_public_key: DPublicKey,
    sent_at: DateTime<Utc>,
    kind: String,
    content: String,
}

impl From<InboxRow> for InboxMessage {
    fn from(row: InboxRow) -> Self {
        InboxMessage {
            local_id: row.local_id,
            origin_id: row.origin_id,
            sender_public_key: row.sender_public_key.into(),
            sent_at: row.sent_at,
            kind: row.kind,
            content: row.content,
        }
    }
}

#[async_trait]
impl MessageStore for Database {
    async fn insert_outbox_message(&self, message: OutboxMessage) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO outbox_messages
                (id, recipient_public_key, recipient_address, sent_at, kind, content)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(message.id)
        .bind(DPublicKey::from(message.recipient_public_key))
        .bind(DAddress::from(message.recipient_address))
        .bind(message.sent_at)
        .bind(message.kind)
        .bind(message.content)
        .execute(&**self)
        .await
        .map_err(store_error)?;
        Ok(())
    }

    async fn outbox_messages(&self) -> Result<Vec<OutboxMessage>, StoreError> {
        let rows = sqlx::query_as::<_, OutboxRow>(
            r#"
            SELECT id, recipient_public_key, recipient_address, sent_at, kind, content
            FROM outbox_messages
            ORDER BY seq ASC
            "#,
        )
        .fetch_all(&**self)
        .await
        .map_err(store_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn outbox_messages_for(
        &self,
        recipient: &PublicKey,
    ) -> Result<Vec<OutboxMessage>, StoreError> {
        let rows = sqlx::query_as::<_, OutboxRow>(
            r#"
            SELECT id, recipient_public_key, recipient_address, sent_at, kind, content
            FROM outbox_messages
            WHERE recipient_public_key = $1
            ORDER BY seq ASC
            "#,
        )
        .bind(DPublicKey::from(recipient))
        .fetch_all(&**self)
        .await
        .map_err(store_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn remove_outbox_message(&self, id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM outbox_messages WHERE id = $1")
            .bind(id)
            .execute(&**self)
            .await
            .map_err(store_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_inbox_message(&self, message: InboxMessage) -> Result<bool, StoreError> {
        let mut tx = self.begin().await.map_err(store_error)?;
        let sender = DPublicKey::from(message.sender_public_key);

        let seen = sqlx::query(
            r#"
            INSERT INTO inbox_seen (origin_id, sender_public_key)
            VALUES ($1, $2)
            ON CONFLICT (origin_id, sender_public_key) DO NOTHING
            "#,
        )
        .bind(&message.origin_id)
        .bind(sender)
        .execute(&mut *tx)
        .await
        .map_err(store_error)?;
        if seen.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO inbox_messages
                (local_id, origin_id, sender_public_key, sent_at, kind, content)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(message.local_id)
        .bind(message.origin_id)
        .bind(sender)
        .bind(message.sent_at)
        .bind(message.kind)
        .bind(message.content)
        .execute(&mut *tx)
        .await
        .map_err(store_error)?;

        tx.commit().await.map_err(store_error)?;
        Ok(true)
    }

    async fn inbox_messages(&self) -> Result<Vec<InboxMessage>, StoreError> {
        let rows = sqlx::query_as::<_, InboxRow>(
            r#"
            SELECT local_id, origin_id, sender_public_key, sent_at, kind, content
            FROM inbox_messages
            ORDER BY seq ASC
            "#,
        )
        .fetch_all(&**self)
        .await
        .map_err(store_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn remove_inbox_message(&self, local_id: &str) -> Result<bool, StoreError> {
        // inbox_seen keeps the message from being pulled again
        let result = sqlx::query("DELETE FROM inbox_messages WHERE local_id = $1")
            .bind(local_id)
            .execute(&**self)
            .await
            .map_err(store_error)?;
        Ok(result.rows_affected() > 0)
    }
}
