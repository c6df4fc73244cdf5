use async_trait::async_trait;
use sqlx::types::Json;

use common::address::Address;
use common::crypto::PublicKey;
use common::models::{Avatar, KnownNode};
use common::store::{KnownNodeStore, StoreError};

use super::types::{DAddress, DPublicKey};
use super::{store_error, Database};

#[derive(sqlx::FromRow)]
struct KnownNodeRow {
    public_key: DPublicKey,
    address: DAddress,
    display_name: Option<String>,
    bio: Option<String>,
    avatar: Option<Json<Avatar>>,
}

impl From<KnownNodeRow> for KnownNode {
    fn from(row: KnownNodeRow) -> Self {
        KnownNode {
            public_key: row.public_key.into(),
            address: row.address.into(),
            display_name: row.display_name,
            bio: row.bio,
            avatar: row.avatar.map(|a| a.0),
        }
    }
}

const SELECT_KNOWN_NODE: &str = r#"
    SELECT public_key, address, display_name, bio, avatar
    FROM known_nodes
    WHERE public_key = $1
"#;

#[async_trait]
impl KnownNodeStore for Database {
    async fn known_node(&self, key: &PublicKey) -> Result<Option<KnownNode>, StoreError> {
        let row = sqlx::query_as::<_, KnownNodeRow>(SELECT_KNOWN_NODE)
            .bind(DPublicKey::from(key))
            .fetch_optional(&**self)
            .await
            .map_err(store_error)?;
        Ok(row.map(Into::into))
    }

    async fn known_nodes(&self) -> Result<Vec<KnownNode>, StoreError> {
        let rows = sqlx::query_as::<_, KnownNodeRow>(
            "SELECT public_key, address, display_name, bio, avatar FROM known_nodes",
        )
        .fetch_all(&**self)
        .await
        .map_err(store_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn insert_known_node(&self, node: KnownNode) -> Result<KnownNode, StoreError> {
        let mut tx = self.begin().await.map_err(store_error)?;
        let key = DPublicKey::from(node.public_key);

        sqlx::query(
            r#"
            INSERT INTO known_nodes (public_key, address, display_name, bio, avatar)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (public_key) DO NOTHING
            "#,
        )
        .bind(key)
        .bind(DAddress::from(node.address))
        .bind(node.display_name)
        .bind(node.bio)
        .bind(node.avatar.map(Json))
        .execute(&mut *tx)
        .await
        .map_err(store_error)?;

        let stored = sqlx::query_as::<_, KnownNodeRow>(SELECT_KNOWN_NODE)
            .bind(key)
            .fetch_one(&mut *tx)
            .await
            .map_err(store_error)?;

        tx.commit().await.map_err(store_error)?;
        Ok(stored.into())
    }

    async fn replace_known_node(&self, node: KnownNode) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO known_nodes (public_key, address, display_name, bio, avatar)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (public_key) DO UPDATE SET
                address = excluded.address,
                display_name = excluded.display_name,
                bio = excluded.bio,
                avatar = excluded.avatar
            "#,
        )
        .bind(DPublicKey::from(node.public_key))
        .bind(DAddress::from(node.address))
        .bind(node.display_name)
        .bind(node.bio)
        .bind(node.avatar.map(Json))
        .execute(&**self)
        .await
        .map_err(store_error)?;
        Ok(())
    }

    async fn set_known_node_address(
        &self,
        key: &PublicKey,
        address: &Address,
    ) -> Result<KnownNode, StoreError> {
        let mut tx = self.begin().await.map_err(store_error)?;

        let result = sqlx::query("UPDATE known_nodes SET address = $1 WHERE public_key = $2")
            .bind(DAddress::from(address))
            .bind(DPublicKey::from(key))
            .execute(&mut *tx)
            .await
            .map_err(store_error)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("known node {}", key)));
        }

        let moved = sqlx::query_as::<_, KnownNodeRow>(SELECT_KNOWN_NODE)
            .bind(DPublicKey::from(key))
            .fetch_one(&mut *tx)
            .await
            .map_err(store_error)?;

        tx.commit().await.map_err(store_error)?;
        Ok(moved.into())
    }

    async fn put_avatar(&self, file_name: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO avatars (file_name, bytes)
            VALUES ($1, $2)
            ON CONFLICT (file_name) DO UPDATE SET bytes = excluded.bytes
            "#,
        )
        .bind(file_name)
        .bind(bytes)
        .execute(&**self)
        .await
        .map_err(store_error)?;
        Ok(())
    }

    async fn avatar(&self, file_name: &str) -> Result<Option<Vec<u8>>, StoreError> {
        sqlx::query_scalar::<_, Vec<u8>>("SELECT bytes FROM avatars WHERE file_name = $1")
            .bind(file_name)
            .fetch_optional(&**self)
            .await
            .map_err(store_error)
    }
}
