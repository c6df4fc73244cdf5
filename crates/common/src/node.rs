use std::sync::Arc;

use crate::address::Address;
use crate::clock::{Clock, SystemClock};
use crate::crypto::{PublicKey, SecretKey};
use crate::directory::Directory;
use crate::feed::Feed;
use crate::identity::{Identity, Profile};
use crate::ids::{IdGenerator, RandomIds};
use crate::permissions::Permissions;
use crate::relay::Relay;
use crate::store::Store;
use crate::sync::Synchronizer;
use crate::transport::Transport;

#[derive(Debug, thiserror::Error)]
pub enum NodeBuilderError {
    #[error("missing required field: {0}")]
    Missing(&'static str),
}

/// Wires one identity, one store and one transport into a node
#[derive(Debug)]
pub struct NodeBuilder<S, T> {
    secret_key: Option<SecretKey>,
    address: Option<Address>,
    profile: Profile,
    store: Option<S>,
    transport: Option<T>,
    ids: Option<Arc<dyn IdGenerator>>,
    clock: Option<Arc<dyn Clock>>,
}

impl<S, T> Default for NodeBuilder<S, T> {
    fn default() -> Self {
        Self {
            secret_key: None,
            address: None,
            profile: Profile::default(),
            store: None,
            transport: None,
            ids: None,
            clock: None,
        }
    }
}

impl<S: Store, T: Transport> NodeBuilder<S, T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn secret_key(mut self, secret_key: SecretKey) -> Self {
        self.secret_key = Some(secret_key);
        self
    }

    /// The address other nodes reach us at, advertised in notifications
    pub fn address(mut self, address: Address) -> Self {
        self.address = Some(address);
        self
    }

    pub fn profile(mut self, profile: Profile) -> Self {
        self.profile = profile;
        self
    }

    pub fn store(mut self, store: S) -> Self {
        self.store = Some(store);
        self
    }

    pub fn transport(mut self, transport: T) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn ids(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> Result<Node<S, T>, NodeBuilderError> {
        // a fresh key if not set
        let secret_key = self.secret_key.unwrap_or_else(SecretKey::generate);
        let address = self.address.ok_or(NodeBuilderError::Missing("address"))?;
        let store = self.store.ok_or(NodeBuilderError::Missing("store"))?;
        let transport = self
            .transport
            .ok_or(NodeBuilderError::Missing("transport"))?;
        let ids = self.ids.unwrap_or_else(|| Arc::new(RandomIds));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        let identity = Arc::new(Identity::new(secret_key, address, self.profile));
        let directory = Directory::new(store.clone(), transport.clone());
        let permissions = Permissions::new(store.clone(), ids.clone());
        let feed = Feed::new(
            identity.clone(),
            store.clone(),
            permissions.clone(),
            ids.clone(),
            clock.clone(),
        );
        let sync = Synchronizer::new(
            identity.clone(),
            store.clone(),
            transport.clone(),
            directory.clone(),
            ids.clone(),
            clock.clone(),
        );
        let relay = Relay::new(
            identity.clone(),
            store.clone(),
            transport.clone(),
            directory.clone(),
            ids,
            clock,
        );

        Ok(Node {
            identity,
            store,
            transport,
            directory,
            permissions,
            feed,
            sync,
            relay,
        })
    }
}

/// Everything a federated node does, generic over its store and transport.
///  Cheap to clone; every component shares the same store handle.
#[derive(Debug, Clone)]
pub struct Node<S, T> {
    identity: Arc<Identity>,
    store: S,
    transport: T,
    directory: Directory<S, T>,
    permissions: Permissions<S>,
    feed: Feed<S>,
    sync: Synchronizer<S, T>,
    relay: Relay<S, T>,
}

impl<S: Store, T: Transport> Node<S, T> {
    pub fn builder() -> NodeBuilder<S, T> {
        NodeBuilder::new()
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn public_key(&self) -> &PublicKey {
        self.identity.public_key()
    }

    pub fn address(&self) -> &Address {
        self.identity.address()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn directory(&self) -> &Directory<S, T> {
        &self.directory
    }

    pub fn permissions(&self) -> &Permissions<S> {
        &self.permissions
    }

    pub fn feed(&self) -> &Feed<S> {
        &self.feed
    }

    pub fn sync(&self) -> &Synchronizer<S, T> {
        &self.sync
    }

    pub fn relay(&self) -> &Relay<S, T> {
        &self.relay
    }
}
