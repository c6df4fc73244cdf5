use async_trait::async_trait;
use sqlx::types::Json;

use common::crypto::PublicKey;
use common::models::{PermissionGrant, PermissionGroup, Rule};
use common::store::{PermissionStore, StoreError};

use super::types::DPublicKey;
use super::{store_error, Database};

#[derive(sqlx::FromRow)]
struct GrantRow {
    subject: DPublicKey,
    rule: Json<Rule>,
}

#[derive(sqlx::FromRow)]
struct GroupRow {
    id: String,
    name: String,
    description: String,
    rule: Json<Rule>,
}

impl Database {
    async fn group_members(&self, group_id: &str) -> Result<Vec<DPublicKey>, StoreError> {
        sqlx::query_scalar::<_, DPublicKey>(
            "SELECT member FROM permission_group_members WHERE group_id = $1",
        )
        .bind(group_id)
        .fetch_all(&**self)
        .await
        .map_err(store_error)
    }

    async fn with_members(&self, rows: Vec<GroupRow>) -> Result<Vec<PermissionGroup>, StoreError> {
        let mut groups = Vec::with_capacity(rows.len());
        for row in rows {
            let members = self.group_members(&row.id).await?;
            groups.push(PermissionGroup {
                id: row.id,
                name: row.name,
                description: row.description,
                members: members.into_iter().map(PublicKey::from).collect(),
                rule: row.rule.0,
            });
        }
        Ok(groups)
    }
}

#[async_trait]
impl PermissionStore for Database {
    async fn grant(&self, subject: &PublicKey) -> Result<Option<PermissionGrant>, StoreError> {
        let row = sqlx::query_as::<_, GrantRow>(
            "SELECT subject, rule FROM permission_grants WHERE subject = $1",
        )
        .bind(DPublicKey::from(subject))
        .fetch_optional(&**self)
        .await
        .map_err(store_error)?;

        Ok(row.map(|r| PermissionGrant {
            subject: r.subject.into(),
            rule: r.rule.0,
        }))
    }

    async fn grants(&self) -> Result<Vec<PermissionGrant>, StoreError> {
        let rows = sqlx::query_as::<_, GrantRow>("SELECT subject, rule FROM permission_grants")
            .fetch_all(&**self)
            .await
            .map_err(store_error)?;

        Ok(rows
            .into_iter()
            .map(|r| PermissionGrant {
                subject: r.subject.into(),
                rule: r.rule.0,
            })
            .collect())
    }

    async fn put_grant(&self, grant: PermissionGrant) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO permission_grants (subject, rule)
            VALUES ($1, $2)
            ON CONFLICT (subject) DO UPDATE SET rule = excluded.rule
            "#,
        )
        .bind(DPublicKey::from(grant.subject))
        .bind(Json(grant.rule))
        .execute(&**self)
        .await
        .map_err(store_error)?;
        Ok(())
    }

    async fn remove_grant(&self, subject: &PublicKey) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM permission_grants WHERE subject = $1")
            .bind(DPublicKey::from(subject))
            .execute(&**self)
            .await
            .map_err(store_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn group(&self, id: &str) -> Result<Option<PermissionGroup>, StoreError> {
        let rows = sqlx::query_as::<_, GroupRow>(
            "SELECT id, name, description, rule FROM permission_groups WHERE id = $1",
        )
        .bind(id)
        .fetch_all(&**self)
        .await
        .map_err(store_error)?;
        Ok(self.with_members(rows).await?.pop())
    }

    async fn groups(&self) -> Result<Vec<PermissionGroup>, StoreError> {
        let rows = sqlx::query_as::<_, GroupRow>(
            "SELECT id, name, description, rule FROM permission_groups ORDER BY id",
        )
        .fetch_all(&**self)
        .await
        .map_err(store_error)?;
        self.with_members(rows).await
    }

    async fn groups_with_member(
        &self,
        member: &PublicKey,
    ) -> Result<Vec<PermissionGroup>, StoreError> {
        let rows = sqlx::query_as::<_, GroupRow>(
            r#"
            SELECT g.id, g.name, g.description, g.rule
            FROM permission_groups g
            INNER JOIN permission_group_members m ON m.group_id = g.id
            WHERE m.member = $1
            ORDER BY g.id
            "#,
        )
        .bind(DPublicKey::from(member))
        .fetch_all(&**self)
        .await
        .map_err(store_error)?;
        self.with_members(rows).await
    }

    async fn put_group(&self, group: PermissionGroup) -> Result<(), StoreError> {
        let mut tx = self.begin().await.map_err(store_error)?;

        sqlx::query(
            r#"
            INSERT INTO permission_groups (id, name, description, rule)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                rule = excluded.rule
            "#,
        )
        .bind(&group.id)
        .bind(group.name)
        .bind(group.description)
        .bind(Json(group.rule))
        .execute(&mut *tx)
        .await
        .map_err(store_error)?;

        sqlx::query("DELETE FROM permission_group_members WHERE group_id = $1")
            .bind(&group.id)
            .execute(&mut *tx)
            .await
            .map_err(store_error)?;

        for member in &group.members {
            sqlx::query("INSERT INTO permission_group_members (group_id, member) VALUES ($1, $2)")
                .bind(&group.id)
                .bind(DPublicKey::from(member))
                .execute(&mut *tx)
                .await
                .map_err(store_error)?;
        }

        tx.commit().await.map_err(store_error)
    }

    async fn remove_group(&self, id: &str) -> Result<bool, StoreError> {
        // members go with the group
        let result = sqlx::query("DELETE FROM permission_groups WHERE id = $1")
            .bind(id)
            .execute(&**self)
            .await
            .map_err(store_error)?;
        Ok(result.rows_affected() > 0)
    }
}
