//! Store-and-notify private messaging
//!
//! Messages are never pushed. The sender keeps them in its outbox and posts a
//! `new_private_messages` notification to the recipient, who then pulls the
//! sender's `/api/outbox` over an authenticated exchange verified against the
//! key the notification claimed. A notification is only ever a hint: a forged
//! one makes us pull from a node that cannot answer as the claimed key.

use std::sync::Arc;

use crate::address::Address;
use crate::client::{self, PullError};
use crate::clock::Clock;
use crate::crypto::{seal_response, EncryptedEnvelope, HandshakeError, PublicKey, VerifiedCredential};
use crate::directory::{Directory, DirectoryError};
use crate::feed::DEFAULT_ITEM_KIND;
use crate::identity::Identity;
use crate::ids::IdGenerator;
use crate::locks::RecordLocks;
use crate::models::{
    InboxMessage, InboxNotification, NotificationKind, OutboxMessage, Subscriber,
};
use crate::protocol::{OutboxEntry, OutboxPage, OUTBOX_PATH};
use crate::store::{KnownNodeStore, MessageStore, StoreError, SubscriptionStore};
use crate::transport::Transport;

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("no known node with key {0}")]
    UnknownPeer(PublicKey),
    #[error("outbox requests must be authenticated")]
    Unauthenticated,
    #[error("invalid message: {0}")]
    InvalidMessage(String),
    #[error("invalid notification: {0}")]
    InvalidNotification(String),
    #[error(transparent)]
    Pull(#[from] PullError),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
    #[error(transparent)]
    Handshake(#[from] HandshakeError),
    #[error("failed to encode outbox page: {0}")]
    Encode(#[from] serde_json::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone)]
pub struct Relay<S, T> {
    identity: Arc<Identity>,
    store: S,
    transport: T,
    directory: Directory<S, T>,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
    locks: RecordLocks,
}

impl<S, T> Relay<S, T>
where
    S: MessageStore + KnownNodeStore + SubscriptionStore,
    T: Transport,
{
    pub fn new(
        identity: Arc<Identity>,
        store: S,
        transport: T,
        directory: Directory<S, T>,
        ids: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            identity,
            store,
            transport,
            directory,
            ids,
            clock,
            locks: RecordLocks::new(),
        }
    }

    /// Queue a message for `recipient` and tell them about it.
    ///
    /// The recipient must already be a known node. The message is stored
    /// even if the notification cannot be delivered; the recipient picks it
    /// up on the next notification that does get through.
    pub async fn send(
        &self,
        recipient: &PublicKey,
        kind: Option<String>,
        content: String,
    ) -> Result<OutboxMessage, RelayError> {
        if content.trim().is_empty() {
            return Err(RelayError::InvalidMessage("content cannot be empty".into()));
        }
        let node = self
            .directory
            .cached(recipient)
            .await?
            .ok_or(RelayError::UnknownPeer(*recipient))?;

        let message = OutboxMessage {
            id: self.ids.next_id(),
            recipient_public_key: node.public_key,
            recipient_address: node.address.clone(),
            sent_at: self.clock.now(),
            kind: kind
                .filter(|k| !k.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_ITEM_KIND.to_string()),
            content,
        };
        self.store.insert_outbox_message(message.clone()).await?;
        tracing::info!(id = %message.id, recipient = %recipient, "queued private message");

        let notification = self.notification(NotificationKind::NewPrivateMessages);
        if let Err(e) = client::notify(&self.transport, &node.address, &notification).await {
            tracing::warn!(
                address = %node.address,
                "failed to notify recipient of new message: {}",
                e
            );
        }

        Ok(message)
    }

    /// Answer `GET /api/outbox` with the messages addressed to the caller
    pub async fn serve_outbox(
        &self,
        authorization: Option<&str>,
    ) -> Result<EncryptedEnvelope, RelayError> {
        let credential = authorization
            .ok_or(RelayError::Unauthenticated)
            .and_then(|value| {
                VerifiedCredential::from_authorization(value).map_err(|e| {
                    tracing::debug!("rejecting outbox request: {}", e);
                    RelayError::Unauthenticated
                })
            })?;

        let messages = self.store.outbox_messages_for(credential.signer()).await?;
        tracing::debug!(
            requester = %credential.signer(),
            count = messages.len(),
            "serving outbox"
        );
        let page = OutboxPage {
            messages: messages.into_iter().map(OutboxEntry::from).collect(),
        };
        let body = serde_json::to_vec(&page)?;
        Ok(seal_response(self.identity.secret_key(), &credential, &body)?)
    }

    /// Handle a `POST /api/inbox` notification.
    ///
    /// Returns how many records were added: inbox messages for
    /// `new_private_messages`, subscribers for `new_subscriber`.
    pub async fn on_notification(
        &self,
        notification: InboxNotification,
    ) -> Result<usize, RelayError> {
        let (claimed, address) = notification_sender(&notification)?;

        match notification.kind {
            NotificationKind::NewPrivateMessages => self.pull_outbox(&claimed, &address).await,
            NotificationKind::NewSubscriber => self.record_subscriber(&claimed, &address).await,
        }
    }

    async fn pull_outbox(&self, sender: &PublicKey, address: &Address) -> Result<usize, RelayError> {
        let _guard = self.locks.lock(&sender.to_id()).await;

        let page: OutboxPage = client::authenticated_get(
            &self.transport,
            self.identity.secret_key(),
            &address.endpoint(OUTBOX_PATH),
            sender,
        )
        .await?;

        let me = self.identity.public_key().to_base64();
        let mut added = 0;
        for entry in page.messages {
            if entry.recipient_public_key != me {
                continue;
            }
            let message = InboxMessage {
                local_id: self.ids.next_id(),
                origin_id: entry.id,
                sender_public_key: *sender,
                sent_at: entry.sent_at,
                kind: entry.kind,
                content: entry.content,
            };
            if self.store.insert_inbox_message(message).await? {
                added += 1;
            }
        }

        if added > 0 {
            tracing::info!(sender = %sender, added, "received private messages");
        }
        Ok(added)
    }

    async fn record_subscriber(
        &self,
        claimed: &PublicKey,
        address: &Address,
    ) -> Result<usize, RelayError> {
        let Some(node) = self.directory.resolve(address).await? else {
            tracing::warn!(%address, "ignoring subscriber notification from unreachable node");
            return Ok(0);
        };
        if &node.public_key != claimed {
            tracing::warn!(
                %address,
                claimed = %claimed,
                served = %node.public_key,
                "ignoring subscriber notification with mismatched key"
            );
            return Ok(0);
        }

        let subscriber = Subscriber {
            id: claimed.to_id(),
            public_key: *claimed,
            address: address.clone(),
            subscribed_at: self.clock.now(),
        };
        if !self.store.insert_subscriber(subscriber).await? {
            return Ok(0);
        }
        tracing::info!(key = %claimed, %address, "new subscriber");
        Ok(1)
    }

    fn notification(&self, kind: NotificationKind) -> InboxNotification {
        InboxNotification {
            url: self.identity.address().to_string(),
            public_signing_key: self.identity.public_key().to_base64(),
            kind,
        }
    }

    /// Received messages, newest first
    pub async fn inbox(&self) -> Result<Vec<InboxMessage>, RelayError> {
        let mut messages = self.store.inbox_messages().await?;
        messages.sort_by(|a, b| b.sent_at.cmp(&a.sent_at));
        Ok(messages)
    }

    /// Sent messages, newest first
    pub async fn outbox(&self) -> Result<Vec<OutboxMessage>, RelayError> {
        let mut messages = self.store.outbox_messages().await?;
        messages.sort_by(|a, b| b.sent_at.cmp(&a.sent_at));
        Ok(messages)
    }

    pub async fn remove_inbox(&self, local_id: &str) -> Result<bool, RelayError> {
        Ok(self.store.remove_inbox_message(local_id).await?)
    }

    pub async fn remove_outbox(&self, id: &str) -> Result<bool, RelayError> {
        Ok(self.store.remove_outbox_message(id).await?)
    }

    pub async fn subscribers(&self) -> Result<Vec<Subscriber>, RelayError> {
        Ok(self.store.subscribers().await?)
    }
}

/// The key a notification claims and the address to pull from
pub fn notification_sender(
    notification: &InboxNotification,
) -> Result<(PublicKey, Address), RelayError> {
    let claimed = PublicKey::from_base64(&notification.public_signing_key)
        .map_err(|e| RelayError::InvalidNotification(e.to_string()))?;
    let address = Address::parse(&notification.url)
        .map_err(|e| RelayError::InvalidNotification(e.to_string()))?;
    Ok((claimed, address))
}
