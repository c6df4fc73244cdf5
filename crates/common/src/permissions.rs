//! Category and group based visibility of feed items
//!
//! An item with no categories is public. Otherwise a requester sees it when
//! their direct grant, or any group that lists them, carries `All` or shares
//! at least one category with the item. Anonymous requesters only see public
//! items. Anything not explicitly allowed is denied.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::crypto::PublicKey;
use crate::ids::IdGenerator;
use crate::models::{FeedItem, FeedMessage, PermissionGrant, PermissionGroup, Rule};
use crate::store::{PermissionStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum PermissionError {
    #[error("group not found: {0}")]
    GroupNotFound(String),
    #[error("invalid group: {0}")]
    InvalidGroup(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Everything needed to decide visibility for one requester
#[derive(Debug, Clone, Default)]
pub struct Viewer {
    requester: Option<PublicKey>,
    grant: Option<PermissionGrant>,
    groups: Vec<PermissionGroup>,
}

impl Viewer {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn new(
        requester: PublicKey,
        grant: Option<PermissionGrant>,
        groups: Vec<PermissionGroup>,
    ) -> Self {
        Self {
            requester: Some(requester),
            grant,
            groups,
        }
    }

    pub fn requester(&self) -> Option<&PublicKey> {
        self.requester.as_ref()
    }

    pub fn can_see(&self, categories: &BTreeSet<String>) -> bool {
        if categories.is_empty() {
            return true;
        }
        let Some(requester) = &self.requester else {
            return false;
        };

        if let Some(grant) = &self.grant {
            if &grant.subject == requester && grant.rule.admits(categories) {
                return true;
            }
        }

        self.groups
            .iter()
            .filter(|g| g.members.contains(requester))
            .any(|g| g.rule.admits(categories))
    }
}

/// Permission engine over a node's grant and group records
#[derive(Debug, Clone)]
pub struct Permissions<S> {
    store: S,
    ids: Arc<dyn IdGenerator>,
}

impl<S: PermissionStore> Permissions<S> {
    pub fn new(store: S, ids: Arc<dyn IdGenerator>) -> Self {
        Self { store, ids }
    }

    /// Load the grant and group memberships of `requester`
    pub async fn viewer(&self, requester: Option<&PublicKey>) -> Result<Viewer, PermissionError> {
        let Some(requester) = requester else {
            return Ok(Viewer::anonymous());
        };
        let grant = self.store.grant(requester).await?;
        let groups = self.store.groups_with_member(requester).await?;
        Ok(Viewer::new(*requester, grant, groups))
    }

    pub async fn visible(
        &self,
        requester: Option<&PublicKey>,
        categories: &BTreeSet<String>,
    ) -> Result<bool, PermissionError> {
        if categories.is_empty() {
            return Ok(true);
        }
        Ok(self.viewer(requester).await?.can_see(categories))
    }

    /// Keep the items `requester` may see, with categories stripped
    pub async fn filter(
        &self,
        requester: Option<&PublicKey>,
        items: Vec<FeedItem>,
    ) -> Result<Vec<FeedMessage>, PermissionError> {
        let viewer = self.viewer(requester).await?;
        Ok(items
            .into_iter()
            .filter(|item| viewer.can_see(&item.categories))
            .map(FeedItem::strip)
            .collect())
    }

    /// Set the direct grant for `subject`. A rule that grants nothing removes it.
    pub async fn set_grant(
        &self,
        subject: PublicKey,
        rule: Rule,
    ) -> Result<Option<PermissionGrant>, PermissionError> {
        if rule.grants_nothing() {
            self.store.remove_grant(&subject).await?;
            tracing::info!(subject = %subject, "removed permission grant");
            return Ok(None);
        }
        let grant = PermissionGrant { subject, rule };
        self.store.put_grant(grant.clone()).await?;
        tracing::info!(subject = %subject, rule = ?grant.rule, "set permission grant");
        Ok(Some(grant))
    }

    pub async fn remove_grant(&self, subject: &PublicKey) -> Result<bool, PermissionError> {
        Ok(self.store.remove_grant(subject).await?)
    }

    pub async fn grants(&self) -> Result<Vec<PermissionGrant>, PermissionError> {
        Ok(self.store.grants().await?)
    }

    pub async fn create_group(
        &self,
        name: String,
        description: String,
        members: BTreeSet<PublicKey>,
        rule: Rule,
    ) -> Result<PermissionGroup, PermissionError> {
        if name.trim().is_empty() {
            return Err(PermissionError::InvalidGroup("name cannot be empty".into()));
        }
        let group = PermissionGroup {
            id: self.ids.next_id(),
            name,
            description,
            members,
            rule,
        };
        self.store.put_group(group.clone()).await?;
        tracing::info!(group = %group.id, name = %group.name, "created permission group");
        Ok(group)
    }

    pub async fn update_group(&self, group: PermissionGroup) -> Result<(), PermissionError> {
        if self.store.group(&group.id).await?.is_none() {
            return Err(PermissionError::GroupNotFound(group.id));
        }
        self.store.put_group(group).await?;
        Ok(())
    }

    pub async fn remove_group(&self, id: &str) -> Result<bool, PermissionError> {
        Ok(self.store.remove_group(id).await?)
    }

    pub async fn group(&self, id: &str) -> Result<Option<PermissionGroup>, PermissionError> {
        Ok(self.store.group(id).await?)
    }

    pub async fn groups(&self) -> Result<Vec<PermissionGroup>, PermissionError> {
        Ok(self.store.groups().await?)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::crypto::SecretKey;
    use crate::ids::SequentialIds;
    use crate::store::MemoryStore;

    fn cats(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn group(members: &[PublicKey], rule: Rule) -> PermissionGroup {
        PermissionGroup {
            id: "g".into(),
            name: "g".into(),
            description: String::new(),
            members: members.iter().copied().collect(),
            rule,
        }
    }

    #[test]
    fn test_public_items_visible_to_everyone() {
        let key = SecretKey::generate().public();
        assert!(Viewer::anonymous().can_see(&cats(&[])));
        assert!(Viewer::new(key, None, vec![]).can_see(&cats(&[])));
    }

    #[test]
    fn test_anonymous_never_sees_categorized_items() {
        assert!(!Viewer::anonymous().can_see(&cats(&["friends"])));
    }

    #[test]
    fn test_default_deny() {
        let key = SecretKey::generate().public();
        assert!(!Viewer::new(key, None, vec![]).can_see(&cats(&["friends"])));
    }

    #[test]
    fn test_direct_grant() {
        let key = SecretKey::generate().public();
        let grant = |rule| {
            Some(PermissionGrant {
                subject: key,
                rule,
            })
        };

        assert!(Viewer::new(key, grant(Rule::All), vec![]).can_see(&cats(&["x"])));
        let friends = Viewer::new(key, grant(Rule::categories(["friends"])), vec![]);
        assert!(friends.can_see(&cats(&["friends", "work"])));
        assert!(!friends.can_see(&cats(&["work"])));
    }

    #[test]
    fn test_group_membership() {
        let member = SecretKey::generate().public();
        let outsider = SecretKey::generate().public();
        let groups = vec![group(&[member], Rule::categories(["family"]))];

        assert!(Viewer::new(member, None, groups.clone()).can_see(&cats(&["family"])));
        assert!(!Viewer::new(member, None, groups.clone()).can_see(&cats(&["work"])));
        assert!(!Viewer::new(outsider, None, groups).can_see(&cats(&["family"])));
    }

    #[test]
    fn test_grant_and_group_are_unioned() {
        let key = SecretKey::generate().public();
        let grant = Some(PermissionGrant {
            subject: key,
            rule: Rule::categories(["work"]),
        });
        let groups = vec![group(&[key], Rule::categories(["family"]))];
        let viewer = Viewer::new(key, grant, groups);

        assert!(viewer.can_see(&cats(&["work"])));
        assert!(viewer.can_see(&cats(&["family"])));
        assert!(!viewer.can_see(&cats(&["hobby"])));
    }

    #[tokio::test]
    async fn test_filter_strips_categories() {
        let store = MemoryStore::new();
        let permissions = Permissions::new(store, Arc::new(SequentialIds::new("group")));
        let friend = SecretKey::generate().public();
        permissions
            .set_grant(friend, Rule::categories(["friends"]))
            .await
            .unwrap();

        let item = |id: &str, c: &[&str]| FeedItem {
            id: id.into(),
            publish_time: chrono::Utc::now(),
            categories: cats(c),
            kind: "post".into(),
            content: id.into(),
        };
        let items = vec![item("public", &[]), item("friends", &["friends"]), item("work", &["work"])];

        let seen = permissions.filter(Some(&friend), items.clone()).await.unwrap();
        let ids: Vec<_> = seen.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["public", "friends"]);

        let anonymous = permissions.filter(None, items).await.unwrap();
        assert_eq!(anonymous.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_rule_removes_grant() {
        let permissions = Permissions::new(MemoryStore::new(), Arc::new(SequentialIds::new("g")));
        let key = SecretKey::generate().public();

        permissions.set_grant(key, Rule::All).await.unwrap();
        assert_eq!(permissions.grants().await.unwrap().len(), 1);

        let removed = permissions
            .set_grant(key, Rule::categories(Vec::<String>::new()))
            .await
            .unwrap();
        assert!(removed.is_none());
        assert!(permissions.grants().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_group_lifecycle() {
        let permissions = Permissions::new(MemoryStore::new(), Arc::new(SequentialIds::new("g")));
        let key = SecretKey::generate().public();

        let mut created = permissions
            .create_group("family".into(), String::new(), BTreeSet::new(), Rule::All)
            .await
            .unwrap();
        assert_eq!(created.id, "g-1");
        assert!(!permissions.visible(Some(&key), &cats(&["x"])).await.unwrap());

        created.members.insert(key);
        permissions.update_group(created.clone()).await.unwrap();
        assert!(permissions.visible(Some(&key), &cats(&["x"])).await.unwrap());

        assert!(permissions.remove_group(&created.id).await.unwrap());
        assert!(matches!(
            permissions.update_group(created).await,
            Err(PermissionError::GroupNotFound(_))
        ));
        assert!(matches!(
            permissions
                .create_group(" ".into(), String::new(), BTreeSet::new(), Rule::All)
                .await,
            Err(PermissionError::InvalidGroup(_))
        ));
    }
}
