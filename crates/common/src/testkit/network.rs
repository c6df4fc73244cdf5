use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::{Duration, Utc};
use parking_lot::RwLock;

use super::transport::TestTransport;
use crate::address::Address;
use crate::clock::SteppingClock;
use crate::crypto::SecretKey;
use crate::identity::Profile;
use crate::ids::SequentialIds;
use crate::node::Node;
use crate::store::MemoryStore;

pub type TestNode = Node<MemoryStore, TestTransport>;

#[derive(Debug, Clone)]
pub(super) struct Route {
    pub node: TestNode,
    pub online: bool,
}

/// Routes keyed by address authority (`alice.test`)
pub(super) type Routes = Arc<RwLock<HashMap<String, Route>>>;

/// A coordinator for in-process test nodes
///
/// Every node shares one stepping clock, so anything stamped later in a test
/// carries a strictly later time.
#[derive(Debug)]
pub struct TestNetwork {
    routes: Routes,
    clock: Arc<SteppingClock>,
}

impl Default for TestNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl TestNetwork {
    pub fn new() -> Self {
        Self {
            routes: Arc::new(RwLock::new(HashMap::new())),
            clock: Arc::new(SteppingClock::new(Utc::now(), Duration::seconds(1))),
        }
    }

    /// Add a node reachable at `<name>.test` with a generated key
    pub fn add_node(&self, name: &str) -> Result<TestNode> {
        let profile = Profile {
            display_name: name.to_string(),
            bio: format!("{} runs a test node", name),
            avatar: None,
        };
        self.add_node_with(name, SecretKey::generate(), profile)
    }

    pub fn add_node_with(
        &self,
        name: &str,
        secret_key: SecretKey,
        profile: Profile,
    ) -> Result<TestNode> {
        let address = Address::parse(&format!("{}.test", name))?;
        let authority = address.authority();
        if self.routes.read().contains_key(&authority) {
            return Err(anyhow!("node '{}' already exists", name));
        }

        let node: TestNode = Node::builder()
            .secret_key(secret_key)
            .address(address)
            .profile(profile)
            .store(MemoryStore::new())
            .transport(TestTransport::new(&self.routes))
            .ids(Arc::new(SequentialIds::new(name)))
            .clock(self.clock.clone())
            .build()?;

        self.routes.write().insert(
            authority,
            Route {
                node: node.clone(),
                online: true,
            },
        );
        tracing::debug!(name, key = %node.public_key(), "added test node");
        Ok(node)
    }

    /// Take a node off the network (or bring it back). Requests to an
    /// offline node fail as unreachable.
    pub fn set_online(&self, node: &TestNode, online: bool) -> Result<()> {
        let mut routes = self.routes.write();
        let route = routes
            .get_mut(&node.address().authority())
            .ok_or_else(|| anyhow!("node {} is not on this network", node.address()))?;
        route.online = online;
        Ok(())
    }

    /// Drop a node from the network, freeing its address for another node
    pub fn remove_node(&self, node: &TestNode) -> Result<()> {
        self.routes
            .write()
            .remove(&node.address().authority())
            .map(|_| ())
            .ok_or_else(|| anyhow!("node {} is not on this network", node.address()))
    }

    /// Move every node's clock forward
    pub fn advance(&self, by: Duration) {
        self.clock.advance(by);
    }
}
