/// Lightweight harness for multi-node integration tests
///
/// Nodes live in one process and reach each other through a [`TestTransport`]
/// that routes requests by address straight into the target node, with no
/// sockets involved. Any node can be taken offline to simulate an
/// unreachable peer.
///
/// # Example
///
/// ```rust,ignore
/// use common::testkit::TestNetwork;
///
/// #[tokio::test]
/// async fn test_subscribe() -> anyhow::Result<()> {
///     let net = TestNetwork::new();
///     let alice = net.add_node("alice")?;
///     let bob = net.add_node("bob")?;
///
///     alice.feed().publish(None, "hello".into(), Default::default()).await?;
///     bob.sync().subscribe(alice.address()).await?;
///     assert_eq!(bob.sync().timeline().await?.len(), 1);
///     Ok(())
/// }
/// ```
mod network;
mod transport;

pub use network::{TestNetwork, TestNode};
pub use transport::TestTransport;
