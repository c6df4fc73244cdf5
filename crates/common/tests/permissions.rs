//! Category grants and groups as seen by subscribers

mod common;

use std::collections::BTreeSet;

use ::common::client;
use ::common::models::Rule;
use ::common::protocol::{FeedPage, FEED_PATH};

#[tokio::test]
async fn test_category_grant_reaches_subscriber_stripped() -> anyhow::Result<()> {
    let net = common::network();
    let alice = net.add_node("alice")?;
    let bob = net.add_node("bob")?;
    let carol = net.add_node("carol")?;

    alice.feed().publish(None, "public".into(), BTreeSet::new()).await?;
    alice
        .feed()
        .publish(None, "for friends".into(), common::cats(&["friends"]))
        .await?;
    alice
        .feed()
        .publish(None, "for work".into(), common::cats(&["work"]))
        .await?;

    alice
        .permissions()
        .set_grant(*bob.public_key(), Rule::categories(["friends"]))
        .await?;

    bob.sync().subscribe(alice.address()).await?;
    carol.sync().subscribe(alice.address()).await?;

    let bob_sees: Vec<_> = bob.sync().timeline().await?;
    let contents: Vec<_> = bob_sees.iter().map(|e| e.content.as_str()).collect();
    assert_eq!(contents, vec!["for friends", "public"]);
    assert!(bob_sees.iter().all(|e| e.categories.is_empty()));

    let carol_sees: Vec<_> = carol
        .sync()
        .timeline()
        .await?
        .into_iter()
        .map(|e| e.content)
        .collect();
    assert_eq!(carol_sees, vec!["public".to_string()]);
    Ok(())
}

#[tokio::test]
async fn test_group_membership_grants_visibility() -> anyhow::Result<()> {
    let net = common::network();
    let alice = net.add_node("alice")?;
    let bob = net.add_node("bob")?;

    alice
        .feed()
        .publish(None, "for family".into(), common::cats(&["family"]))
        .await?;

    bob.sync().subscribe(alice.address()).await?;
    assert!(bob.sync().timeline().await?.is_empty());

    alice
        .permissions()
        .create_group(
            "everyone close".into(),
            String::new(),
            [*bob.public_key()].into_iter().collect(),
            Rule::All,
        )
        .await?;

    // the cursor is still unset, so the next pass sees the whole feed again
    let timeline = bob.sync().timeline().await?;
    assert_eq!(timeline.len(), 1);
    assert_eq!(timeline[0].content, "for family");
    Ok(())
}

#[tokio::test]
async fn test_anonymous_pull_is_plain_and_public_only() -> anyhow::Result<()> {
    let net = common::network();
    let alice = net.add_node("alice")?;
    let bob = net.add_node("bob")?;

    alice.feed().publish(None, "public".into(), BTreeSet::new()).await?;
    alice
        .feed()
        .publish(None, "private".into(), common::cats(&["friends"]))
        .await?;

    let (content_type, body) =
        client::get(bob.transport(), &alice.address().endpoint(FEED_PATH)).await?;
    assert_eq!(content_type.as_deref(), Some("application/json"));

    let page: FeedPage = serde_json::from_slice(&body)?;
    assert_eq!(page.messages.len(), 1);
    assert_eq!(page.messages[0].content, "public");
    assert!(!String::from_utf8(body)?.contains("categories"));
    Ok(())
}

#[tokio::test]
async fn test_revoked_grant_hides_new_items() -> anyhow::Result<()> {
    let net = common::network();
    let alice = net.add_node("alice")?;
    let bob = net.add_node("bob")?;

    alice
        .permissions()
        .set_grant(*bob.public_key(), Rule::categories(["friends"]))
        .await?;
    bob.sync().subscribe(alice.address()).await?;

    alice
        .feed()
        .publish(None, "first".into(), common::cats(&["friends"]))
        .await?;
    assert_eq!(bob.sync().timeline().await?.len(), 1);

    // an empty rule removes the grant
    let removed = alice
        .permissions()
        .set_grant(*bob.public_key(), Rule::categories(Vec::<String>::new()))
        .await?;
    assert!(removed.is_none());

    alice
        .feed()
        .publish(None, "second".into(), common::cats(&["friends"]))
        .await?;
    let contents: Vec<_> = bob
        .sync()
        .timeline()
        .await?
        .into_iter()
        .map(|e| e.content)
        .collect();
    assert_eq!(contents, vec!["first".to_string()]);
    Ok(())
}
