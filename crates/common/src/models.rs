//! Records shared between the store, the federation protocol and the daemon

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::crypto::PublicKey;

/// Which categories a grant or group unlocks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    All,
    Categories(BTreeSet<String>),
}

impl Rule {
    /// Rule for a list of category names. An empty list grants nothing.
    pub fn categories<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Rule::Categories(names.into_iter().map(Into::into).collect())
    }

    pub fn grants_nothing(&self) -> bool {
        matches!(self, Rule::Categories(c) if c.is_empty())
    }

    /// True if this rule unlocks any of `categories`
    pub fn admits(&self, categories: &BTreeSet<String>) -> bool {
        match self {
            Rule::All => true,
            Rule::Categories(allowed) => !allowed.is_disjoint(categories),
        }
    }
}

/// Direct permission for one requester identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGrant {
    pub subject: PublicKey,
    pub rule: Rule,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGroup {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub members: BTreeSet<PublicKey>,
    pub rule: Rule,
}

/// Item in the local node's own feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    pub id: String,
    pub publish_time: DateTime<Utc>,
    #[serde(default)]
    pub categories: BTreeSet<String>,
    pub kind: String,
    pub content: String,
}

impl FeedItem {
    pub fn is_public(&self) -> bool {
        self.categories.is_empty()
    }

    /// Drop category metadata before the item leaves the node
    pub fn strip(self) -> FeedMessage {
        FeedMessage {
            id: self.id,
            publish_time: self.publish_time,
            kind: self.kind,
            content: self.content,
        }
    }
}

/// Feed item as served to other nodes. Carries no categories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedMessage {
    pub id: String,
    pub publish_time: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    Other,
}

impl MediaKind {
    /// Classify a declared content type.
    ///
    /// Returns `None` for unparseable types and for types with no known file
    /// extension outside image/video/audio.
    pub fn classify(content_type: &str) -> Option<MediaKind> {
        let mime: mime::Mime = content_type.trim().parse().ok()?;
        match mime.type_() {
            mime::IMAGE => Some(MediaKind::Image),
            mime::VIDEO => Some(MediaKind::Video),
            mime::AUDIO => Some(MediaKind::Audio),
            _ => mime_guess::get_mime_extensions(&mime).map(|_| MediaKind::Other),
        }
    }
}

/// Reference to a cached avatar blob
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Avatar {
    pub kind: MediaKind,
    pub content_type: String,
    pub file_name: String,
}

/// Cached public identity of a remote node
///
/// The profile is fixed at first contact and only an explicit directory
/// refresh replaces it. `address` follows the node when it moves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownNode {
    pub public_key: PublicKey,
    pub address: Address,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar: Option<Avatar>,
}

/// Position in a remote feed: the newest item pulled so far
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub item_id: String,
    pub publish_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// `public_key.to_id()`
    pub id: String,
    pub target_address: Address,
    pub public_key: PublicKey,
    pub subscribed_at: DateTime<Utc>,
    pub cursor: Option<Cursor>,
}

/// A remote node that subscribed to the local feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscriber {
    pub id: String,
    pub public_key: PublicKey,
    pub address: Address,
    pub subscribed_at: DateTime<Utc>,
}

/// Locally cached copy of a remote feed item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub local_id: String,
    pub origin_id: String,
    pub source_public_key: PublicKey,
    pub source_address: Address,
    pub retrieved_at: DateTime<Utc>,
    pub publish_time: DateTime<Utc>,
    #[serde(default)]
    pub categories: BTreeSet<String>,
    pub kind: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboxMessage {
    pub id: String,
    pub recipient_public_key: PublicKey,
    pub recipient_address: Address,
    pub sent_at: DateTime<Utc>,
    pub kind: String,
    pub content: String,
}

/// Private message pulled from a sender's outbox
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboxMessage {
    pub local_id: String,
    pub origin_id: String,
    pub sender_public_key: PublicKey,
    pub sent_at: DateTime<Utc>,
    pub kind: String,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewSubscriber,
    NewPrivateMessages,
}

/// Body of `POST /api/inbox`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboxNotification {
    /// Address of the notifying node
    pub url: String,
    /// Canonical key the notifying node claims
    pub public_signing_key: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_rule_admits() {
        let friends = Rule::categories(["friends"]);
        let wanted: BTreeSet<String> = ["friends", "family"].iter().map(|s| s.to_string()).collect();
        let other: BTreeSet<String> = ["work"].iter().map(|s| s.to_string()).collect();

        assert!(friends.admits(&wanted));
        assert!(!friends.admits(&other));
        assert!(Rule::All.admits(&other));
        assert!(Rule::categories(Vec::<String>::new()).grants_nothing());
    }

    #[test]
    fn test_media_classification() {
        assert_eq!(MediaKind::classify("image/png"), Some(MediaKind::Image));
        assert_eq!(MediaKind::classify("image/svg+xml"), Some(MediaKind::Image));
        assert_eq!(MediaKind::classify("video/mp4"), Some(MediaKind::Video));
        assert_eq!(MediaKind::classify("audio/mpeg"), Some(MediaKind::Audio));
        assert_eq!(MediaKind::classify("application/pdf"), Some(MediaKind::Other));
        assert_eq!(MediaKind::classify("application/x-made-up"), None);
        assert_eq!(MediaKind::classify("not a mime"), None);
    }

    #[test]
    fn test_feed_message_wire_shape() {
        let item = FeedItem {
            id: "a".into(),
            publish_time: Utc::now(),
            categories: ["friends".to_string()].into_iter().collect(),
            kind: "post".into(),
            content: "hi".into(),
        };
        let json = serde_json::to_value(item.strip()).unwrap();
        assert_eq!(json["type"], "post");
        assert!(json.get("categories").is_none());
    }

    #[test]
    fn test_notification_wire_shape() {
        let json = r#"{"url":"a.example:1337","public_signing_key":"k","type":"new_private_messages"}"#;
        let n: InboxNotification = serde_json::from_str(json).unwrap();
        assert_eq!(n.kind, NotificationKind::NewPrivateMessages);
    }
}
