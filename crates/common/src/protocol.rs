//! Federation wire format: endpoint paths and response bodies

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::EncryptedEnvelope;
use crate::models::{FeedMessage, OutboxMessage};

pub const PUBLIC_KEY_PATH: &str = "/api/identity/public_signing_key";
pub const DISPLAY_NAME_PATH: &str = "/api/identity/display_name";
pub const BIO_PATH: &str = "/api/identity/bio";
pub const AVATAR_PATH: &str = "/api/identity/avatar";
pub const FEED_PATH: &str = "/api/feed";
pub const INBOX_PATH: &str = "/api/inbox";
pub const OUTBOX_PATH: &str = "/api/outbox";

/// Query parameter carrying a subscription cursor
pub const LAST_SEEN_PARAM: &str = "last_seen";

/// Body of `GET /api/feed`, plain or inside an envelope
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedPage {
    pub messages: Vec<FeedMessage>,
}

/// Private message as served from an outbox
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboxEntry {
    pub id: String,
    pub recipient_public_key: String,
    pub sent_at: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
}

impl From<OutboxMessage> for OutboxEntry {
    fn from(message: OutboxMessage) -> Self {
        Self {
            id: message.id,
            recipient_public_key: message.recipient_public_key.to_base64(),
            sent_at: message.sent_at,
            kind: message.kind,
            content: message.content,
        }
    }
}

/// Body of `GET /api/outbox`, always inside an envelope
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboxPage {
    pub messages: Vec<OutboxEntry>,
}

/// What the feed-serving boundary hands back to the HTTP layer
#[derive(Debug, Clone)]
pub enum FeedResponse {
    /// Anonymous requester: public items in the clear
    Plain(FeedPage),
    /// Verified requester: items they may see, encrypted to them
    Encrypted(EncryptedEnvelope),
}

/// A profile field served at one of the identity endpoints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityAsset {
    pub content_type: String,
    pub body: Vec<u8>,
}
