use crate::address::Address;
use crate::crypto::{PublicKey, SecretKey};
use crate::protocol::IdentityAsset;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Avatar image served at the identity endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileImage {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Public profile fields other nodes cache on first contact
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    pub display_name: String,
    pub bio: String,
    pub avatar: Option<ProfileImage>,
}

/// The local node: signing keypair, public address and profile.
///
/// Loaded once at startup. The secret key never leaves the process.
#[derive(Debug, Clone)]
pub struct Identity {
    secret_key: SecretKey,
    public_key: PublicKey,
    address: Address,
    profile: Profile,
}

impl Identity {
    pub fn new(secret_key: SecretKey, address: Address, profile: Profile) -> Self {
        let public_key = secret_key.public();
        Self {
            secret_key,
            public_key,
            address,
            profile,
        }
    }

    pub fn secret_key(&self) -> &SecretKey {
        &self.secret_key
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn public_key_asset(&self) -> IdentityAsset {
        text_asset(self.public_key.to_base64())
    }

    pub fn display_name_asset(&self) -> IdentityAsset {
        text_asset(self.profile.display_name.clone())
    }

    pub fn bio_asset(&self) -> IdentityAsset {
        text_asset(self.profile.bio.clone())
    }

    pub fn avatar_asset(&self) -> Option<IdentityAsset> {
        self.profile.avatar.as_ref().map(|image| IdentityAsset {
            content_type: image.content_type.clone(),
            body: image.bytes.clone(),
        })
    }
}

fn text_asset(text: String) -> IdentityAsset {
    IdentityAsset {
        content_type: TEXT_PLAIN.to_string(),
        body: text.into_bytes(),
    }
}
