//! Trust-on-first-use resolution of remote nodes

mod common;

use ::common::address::Address;
use ::common::crypto::SecretKey;
use ::common::identity::{Profile, ProfileImage};
use ::common::models::MediaKind;

fn profile(name: &str, avatar: Option<ProfileImage>) -> Profile {
    Profile {
        display_name: name.to_string(),
        bio: String::new(),
        avatar,
    }
}

#[tokio::test]
async fn test_resolve_caches_profile() -> anyhow::Result<()> {
    let net = common::network();
    let alice = net.add_node("alice")?;
    let bob = net.add_node("bob")?;

    let node = bob
        .directory()
        .resolve(alice.address())
        .await?
        .expect("alice answers");
    assert_eq!(&node.public_key, alice.public_key());
    assert_eq!(&node.address, alice.address());
    assert_eq!(node.display_name.as_deref(), Some("alice"));
    assert_eq!(node.bio.as_deref(), Some("alice runs a test node"));
    assert!(node.avatar.is_none());

    assert_eq!(bob.directory().cached(alice.public_key()).await?, Some(node));
    assert_eq!(bob.directory().all().await?.len(), 1);

    let nowhere = Address::parse("nobody.test")?;
    assert!(bob.directory().resolve(&nowhere).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_first_sighting_wins_until_refresh() -> anyhow::Result<()> {
    let net = common::network();
    let secret = SecretKey::generate();
    let original = net.add_node_with("alice", secret.clone(), profile("Alice", None))?;
    let bob = net.add_node("bob")?;

    bob.directory().resolve(original.address()).await?;

    // the same key shows up elsewhere with a different profile
    let moved = net.add_node_with("alice-moved", secret, profile("Mallory", None))?;
    let node = bob
        .directory()
        .resolve(moved.address())
        .await?
        .expect("key answers");
    // the address follows the key, the profile stays as first seen
    assert_eq!(&node.address, moved.address());
    assert_eq!(node.display_name.as_deref(), Some("Alice"));
    assert_eq!(bob.directory().cached(moved.public_key()).await?, Some(node));

    let refreshed = bob
        .directory()
        .refresh(moved.address())
        .await?
        .expect("key answers");
    assert_eq!(&refreshed.address, moved.address());
    assert_eq!(refreshed.display_name.as_deref(), Some("Mallory"));
    assert_eq!(
        bob.directory().cached(moved.public_key()).await?,
        Some(refreshed)
    );
    Ok(())
}

#[tokio::test]
async fn test_avatar_is_classified_and_stored() -> anyhow::Result<()> {
    let net = common::network();
    let png = ProfileImage {
        content_type: "image/png".into(),
        bytes: vec![0x89, b'P', b'N', b'G'],
    };
    let alice = net.add_node_with("alice", SecretKey::generate(), profile("alice", Some(png)))?;
    let bob = net.add_node("bob")?;

    let avatar = bob
        .directory()
        .resolve(alice.address())
        .await?
        .and_then(|node| node.avatar)
        .expect("avatar cached");
    assert_eq!(avatar.kind, MediaKind::Image);
    assert_eq!(avatar.file_name, format!("{}.png", alice.public_key().to_id()));
    assert_eq!(
        bob.directory().avatar(&avatar.file_name).await?,
        Some(vec![0x89, b'P', b'N', b'G'])
    );
    Ok(())
}

#[tokio::test]
async fn test_unknown_avatar_type_is_discarded() -> anyhow::Result<()> {
    let net = common::network();
    let odd = ProfileImage {
        content_type: "application/x-blade-unheard-of".into(),
        bytes: vec![1, 2, 3],
    };
    let alice = net.add_node_with("alice", SecretKey::generate(), profile("alice", Some(odd)))?;
    let bob = net.add_node("bob")?;

    let node = bob
        .directory()
        .resolve(alice.address())
        .await?
        .expect("alice answers");
    assert!(node.avatar.is_none());
    assert_eq!(node.display_name.as_deref(), Some("alice"));
    Ok(())
}
