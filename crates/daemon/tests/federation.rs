//! Two daemons talking over real HTTP on loopback

use std::collections::BTreeSet;
use std::time::Duration;

use tokio::net::TcpListener;

use blade_daemon::database::Database;
use blade_daemon::http_server::federation_router;
use blade_daemon::transport::HttpTransport;
use blade_daemon::ServiceState;
use common::prelude::*;

async fn spawn_node(name: &str) -> ServiceState {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let node = Node::builder()
        .address(Address::parse(&format!("127.0.0.1:{}", port)).unwrap())
        .profile(Profile {
            display_name: name.to_string(),
            bio: String::new(),
            avatar: None,
        })
        .store(Database::in_memory().await.unwrap())
        .transport(HttpTransport::new(Duration::from_secs(5)).unwrap())
        .build()
        .unwrap();
    let state = ServiceState::new(node);

    let router = federation_router(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    state
}

#[tokio::test]
async fn test_subscribe_and_sync_over_http() {
    let alice = spawn_node("alice").await;
    let bob = spawn_node("bob").await;

    let friends: BTreeSet<String> = ["friends".to_string()].into();
    alice
        .node()
        .feed()
        .publish(None, "hello everyone".into(), BTreeSet::new())
        .await
        .unwrap();
    alice
        .node()
        .feed()
        .publish(None, "hello friends".into(), friends)
        .await
        .unwrap();

    let subscription = bob
        .node()
        .sync()
        .subscribe(alice.node().address())
        .await
        .unwrap();
    assert_eq!(&subscription.public_key, alice.node().public_key());

    let timeline = bob.node().sync().timeline().await.unwrap();
    assert_eq!(timeline.len(), 1);
    assert_eq!(timeline[0].content, "hello everyone");

    alice
        .node()
        .permissions()
        .set_grant(*bob.node().public_key(), Rule::categories(["friends"]))
        .await
        .unwrap();
    alice
        .node()
        .feed()
        .publish(
            None,
            "for bob".into(),
            ["friends".to_string()].into_iter().collect(),
        )
        .await
        .unwrap();

    let timeline = bob.node().sync().timeline().await.unwrap();
    let contents: Vec<_> = timeline.iter().map(|e| e.content.as_str()).collect();
    // items hidden before the grant are after the cursor and arrive now
    assert_eq!(contents.len(), 3);
    assert!(contents.contains(&"hello friends"));
    assert!(contents.contains(&"for bob"));
}

#[tokio::test]
async fn test_private_message_over_http() {
    let alice = spawn_node("alice").await;
    let bob = spawn_node("bob").await;

    alice
        .node()
        .directory()
        .resolve(bob.node().address())
        .await
        .unwrap()
        .unwrap();
    alice
        .node()
        .relay()
        .send(bob.node().public_key(), None, "psst".into())
        .await
        .unwrap();

    // the inbox handler pulls in the background
    let mut inbox = Vec::new();
    for _ in 0..100 {
        inbox = bob.node().relay().inbox().await.unwrap();
        if !inbox.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].content, "psst");
    assert_eq!(&inbox[0].sender_public_key, alice.node().public_key());
}
