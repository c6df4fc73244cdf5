//! Shared setup for multi-node integration tests
#![allow(dead_code)]

use std::collections::BTreeSet;

use common::models::Subscription;
use common::store::SubscriptionStore;
use common::testkit::{TestNetwork, TestNode};

/// A fresh network, with test logging wired up once per process
pub fn network() -> TestNetwork {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    TestNetwork::new()
}

pub fn cats(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// A subscription as stored on `node`
pub async fn subscription(node: &TestNode, id: &str) -> anyhow::Result<Subscription> {
    node.store()
        .subscription(id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("no subscription {}", id))
}
