//! Per-request ephemeral key handshake
//!
//! Nodes never share a session. Every authenticated request carries a fresh
//! P-384 ephemeral public key signed by the requester's long-term Ed25519
//! key, and every encrypted response carries the responder's own fresh
//! ephemeral key, signed the same way.
//!
//! # Protocol Overview
//!
//! ```text
//! requester                                             responder
//!   eph_r <- random P-384
//!   sig_r  = Ed25519(identity_r, PEM(eph_r.pub))
//!   Authorization: LabrysBlade {key_r, PEM(eph_r.pub), sig_r}
//!        ────────────────────────────────────────────────►
//!                                        verify sig_r under claimed key_r
//!                                        eph_s <- random P-384
//!                                        k = HKDF(ECDH(eph_s, eph_r.pub))
//!        ◄────────────────────────────────────────────────
//!   {encryption_info: {key_s, PEM(eph_s.pub), sig_s}, encrypted_content: AEAD_k(body)}
//!   verify sig_s under the key the requester EXPECTED
//!   k = HKDF(ECDH(eph_r, eph_s.pub)); open
//! ```
//!
//! # Security Properties
//!
//! - **Authentication**: the responder's ephemeral key is only accepted when
//!   signed by the key the caller expected, never the key the response claims
//! - **Confidentiality**: only the holder of the requester's ephemeral secret
//!   can derive the response key
//! - **Fail closed**: signature and decryption failures yield no data at all;
//!   decryption failures are a single undistinguished error
//! - **Single use**: ephemeral secrets and derived keys are consumed by the
//!   one call that uses them and zeroized on drop
//!
//! Request parameters travel in the clear. Only responses are encrypted.

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use p384::ecdh::EphemeralSecret;
use p384::pkcs8::{DecodePublicKey, EncodePublicKey, LineEnding};
use serde::{Deserialize, Serialize};

use super::keys::{PublicKey, SecretKey};
use super::session::SessionKey;

/// Scheme name used in the `Authorization` header
pub const AUTH_SCHEME: &str = "LabrysBlade";

/// Errors raised while producing or checking handshake material
#[derive(Debug, thiserror::Error)]
pub enum HandshakeError {
    #[error("malformed credential: {0}")]
    MalformedCredential(String),
    #[error("signature over ephemeral key is invalid")]
    SignatureInvalid,
    #[error("decryption failed")]
    DecryptionFailed,
    #[error("failed to encrypt response: {0}")]
    Encryption(String),
}

/// Signed ephemeral key, as carried in request headers and response envelopes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Canonical encoding of the signer's long-term key
    pub public_signing_key: String,
    /// URL-safe base64 of the SPKI PEM of the ephemeral P-384 key
    pub dh_public_key: String,
    /// URL-safe base64 of the Ed25519 signature over the PEM bytes
    pub signed_dh_public_key: String,
}

/// Encrypted response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptedEnvelope {
    pub encryption_info: Credential,
    /// URL-safe base64 of `nonce || ciphertext`
    pub encrypted_content: String,
}

/// A requester credential whose signature has been checked
#[derive(Debug, Clone)]
pub struct VerifiedCredential {
    signer: PublicKey,
    dh_public_key: p384::PublicKey,
}

impl VerifiedCredential {
    /// Parse and verify an `Authorization` header value
    pub fn from_authorization(value: &str) -> Result<Self, HandshakeError> {
        Credential::from_authorization(value)?.verify()
    }

    /// The long-term key that signed the ephemeral key
    pub fn signer(&self) -> &PublicKey {
        &self.signer
    }
}

impl Credential {
    /// Render as an `Authorization` header value
    pub fn to_authorization(&self) -> Result<String, HandshakeError> {
        let json = serde_json::to_string(self)
            .map_err(|e| HandshakeError::MalformedCredential(e.to_string()))?;
        Ok(format!("{} {}", AUTH_SCHEME, json))
    }

    /// Parse an `Authorization` header value without verifying it
    pub fn from_authorization(value: &str) -> Result<Self, HandshakeError> {
        let json = value
            .trim()
            .strip_prefix(AUTH_SCHEME)
            .filter(|rest| rest.starts_with(char::is_whitespace))
            .ok_or_else(|| {
                HandshakeError::MalformedCredential(format!("expected {} scheme", AUTH_SCHEME))
            })?;
        serde_json::from_str(json.trim())
            .map_err(|e| HandshakeError::MalformedCredential(e.to_string()))
    }

    /// Verify under the key the credential claims (trust on first use)
    pub fn verify(&self) -> Result<VerifiedCredential, HandshakeError> {
        let signer = PublicKey::from_base64(&self.public_signing_key)
            .map_err(|e| HandshakeError::MalformedCredential(e.to_string()))?;
        let dh_public_key = self.verify_with(&signer)?;
        Ok(VerifiedCredential {
            signer,
            dh_public_key,
        })
    }

    /// Verify under a key supplied by the caller, ignoring the claimed key.
    ///
    /// The signature is checked before the ephemeral key is parsed.
    pub fn verify_with(&self, signer: &PublicKey) -> Result<p384::PublicKey, HandshakeError> {
        let pem_bytes = URL_SAFE
            .decode(&self.dh_public_key)
            .map_err(|e| HandshakeError::MalformedCredential(e.to_string()))?;
        let signature_bytes = URL_SAFE
            .decode(&self.signed_dh_public_key)
            .map_err(|e| HandshakeError::MalformedCredential(e.to_string()))?;
        let signature = ed25519_dalek::Signature::from_slice(&signature_bytes)
            .map_err(|e| HandshakeError::MalformedCredential(e.to_string()))?;

        signer
            .verify(&pem_bytes, &signature)
            .map_err(|_| HandshakeError::SignatureInvalid)?;

        let pem = std::str::from_utf8(&pem_bytes)
            .map_err(|_| HandshakeError::MalformedCredential("ephemeral key is not PEM".into()))?;
        p384::PublicKey::from_public_key_pem(pem)
            .map_err(|e| HandshakeError::MalformedCredential(e.to_string()))
    }
}

struct EphemeralKey {
    secret: EphemeralSecret,
    credential: Credential,
}

impl EphemeralKey {
    fn generate(identity: &SecretKey) -> Result<Self, HandshakeError> {
        let secret = EphemeralSecret::random(&mut rand::rngs::OsRng);
        let pem = secret
            .public_key()
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| HandshakeError::Encryption(e.to_string()))?;
        let signature = identity.sign(pem.as_bytes());

        Ok(Self {
            secret,
            credential: Credential {
                public_signing_key: identity.public().to_base64(),
                dh_public_key: URL_SAFE.encode(pem.as_bytes()),
                signed_dh_public_key: URL_SAFE.encode(signature.to_bytes()),
            },
        })
    }

    fn session_key(&self, peer: &p384::PublicKey) -> Option<SessionKey> {
        let shared = self.secret.diffie_hellman(peer);
        SessionKey::derive(shared.raw_secret_bytes().as_slice()).ok()
    }
}

/// Requester side of one exchange
///
/// Create one per outbound request, attach [`ClientHandshake::authorization`],
/// then hand the response envelope to [`ClientHandshake::open`]. Opening
/// consumes the handshake, so the ephemeral secret cannot be reused.
pub struct ClientHandshake {
    ephemeral: EphemeralKey,
}

impl std::fmt::Debug for ClientHandshake {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientHandshake")
            .field("credential", &self.ephemeral.credential)
            .finish_non_exhaustive()
    }
}

impl ClientHandshake {
    pub fn new(identity: &SecretKey) -> Result<Self, HandshakeError> {
        Ok(Self {
            ephemeral: EphemeralKey::generate(identity)?,
        })
    }

    pub fn credential(&self) -> &Credential {
        &self.ephemeral.credential
    }

    /// `Authorization` header value for the outbound request
    pub fn authorization(&self) -> Result<String, HandshakeError> {
        self.ephemeral.credential.to_authorization()
    }

    /// Verify the responder against `expected_responder` and decrypt.
    pub fn open(
        self,
        envelope: &EncryptedEnvelope,
        expected_responder: &PublicKey,
    ) -> Result<Vec<u8>, HandshakeError> {
        let responder_dh = envelope.encryption_info.verify_with(expected_responder)?;

        let key = self
            .ephemeral
            .session_key(&responder_dh)
            .ok_or(HandshakeError::DecryptionFailed)?;
        let ciphertext = URL_SAFE
            .decode(&envelope.encrypted_content)
            .map_err(|_| HandshakeError::DecryptionFailed)?;
        key.decrypt(&ciphertext)
            .map_err(|_| HandshakeError::DecryptionFailed)
    }
}

/// Responder side: encrypt `plaintext` for a verified requester
pub fn seal_response(
    identity: &SecretKey,
    requester: &VerifiedCredential,
    plaintext: &[u8],
) -> Result<EncryptedEnvelope, HandshakeError> {
    let ephemeral = EphemeralKey::generate(identity)?;
    let key = ephemeral
        .session_key(&requester.dh_public_key)
        .ok_or_else(|| HandshakeError::Encryption("key derivation failed".into()))?;
    let ciphertext = key
        .encrypt(plaintext)
        .map_err(|e| HandshakeError::Encryption(e.to_string()))?;

    Ok(EncryptedEnvelope {
        encryption_info: ephemeral.credential,
        encrypted_content: URL_SAFE.encode(ciphertext),
    })
}

#[cfg(test)]
mod test {
    use super::*;

    fn flip_bit(encoded: &str, index: usize) -> String {
        let mut bytes = URL_SAFE.decode(encoded).unwrap();
        let i = index % bytes.len();
        bytes[i] ^= 0x01;
        URL_SAFE.encode(bytes)
    }

    fn exchange(plaintext: &[u8]) -> (ClientHandshake, EncryptedEnvelope, SecretKey) {
        let requester = SecretKey::generate();
        let responder = SecretKey::generate();

        let client = ClientHandshake::new(&requester).unwrap();
        let header = client.authorization().unwrap();

        let verified = VerifiedCredential::from_authorization(&header).unwrap();
        assert_eq!(verified.signer(), &requester.public());

        let envelope = seal_response(&responder, &verified, plaintext).unwrap();
        (client, envelope, responder)
    }

    #[test]
    fn test_round_trip() {
        let (client, envelope, responder) = exchange(b"{\"messages\":[]}");
        let plaintext = client.open(&envelope, &responder.public()).unwrap();
        assert_eq!(plaintext, b"{\"messages\":[]}");
    }

    #[test]
    fn test_header_format() {
        let client = ClientHandshake::new(&SecretKey::generate()).unwrap();
        let header = client.authorization().unwrap();
        assert!(header.starts_with("LabrysBlade {"));

        let parsed = Credential::from_authorization(&header).unwrap();
        assert_eq!(&parsed, client.credential());
        let pem = URL_SAFE.decode(&parsed.dh_public_key).unwrap();
        assert!(String::from_utf8(pem)
            .unwrap()
            .starts_with("-----BEGIN PUBLIC KEY-----"));
    }

    #[test]
    fn test_ciphertext_bit_flips_fail() {
        for index in [0, 5, 13, 40, 77] {
            let (client, mut envelope, responder) = exchange(b"some feed content to protect");
            envelope.encrypted_content = flip_bit(&envelope.encrypted_content, index);
            assert!(matches!(
                client.open(&envelope, &responder.public()),
                Err(HandshakeError::DecryptionFailed)
            ));
        }
    }

    #[test]
    fn test_ephemeral_key_bit_flips_fail() {
        for index in [30, 64, 100, 150] {
            let (client, mut envelope, responder) = exchange(b"payload");
            envelope.encryption_info.dh_public_key =
                flip_bit(&envelope.encryption_info.dh_public_key, index);
            assert!(client.open(&envelope, &responder.public()).is_err());
        }
    }

    #[test]
    fn test_wrong_expected_responder_rejected() {
        let (client, envelope, _) = exchange(b"payload");
        let stranger = SecretKey::generate().public();
        assert!(matches!(
            client.open(&envelope, &stranger),
            Err(HandshakeError::SignatureInvalid)
        ));
    }

    #[test]
    fn test_substituted_ephemeral_key_rejected() {
        let (client, mut envelope, responder) = exchange(b"payload");

        // an intermediary swaps in its own ephemeral key, signed by itself,
        // while keeping the legitimate responder's claimed identity
        let mallory = SecretKey::generate();
        let forged = EphemeralKey::generate(&mallory).unwrap();
        envelope.encryption_info.dh_public_key = forged.credential.dh_public_key.clone();
        envelope.encryption_info.signed_dh_public_key =
            forged.credential.signed_dh_public_key.clone();

        assert!(matches!(
            client.open(&envelope, &responder.public()),
            Err(HandshakeError::SignatureInvalid)
        ));
    }

    #[test]
    fn test_server_rejects_mismatched_claim() {
        let client = ClientHandshake::new(&SecretKey::generate()).unwrap();
        let mut credential = client.credential().clone();
        credential.public_signing_key = SecretKey::generate().public().to_base64();

        assert!(matches!(
            credential.verify(),
            Err(HandshakeError::SignatureInvalid)
        ));
    }

    #[test]
    fn test_malformed_headers() {
        for header in [
            "",
            "Bearer abc",
            "LabrysBlade",
            "LabrysBlade not json",
            "LabrysBlade{}",
            "LabrysBlade {\"public_signing_key\": \"x\"}",
        ] {
            assert!(
                matches!(
                    VerifiedCredential::from_authorization(header),
                    Err(HandshakeError::MalformedCredential(_))
                ),
                "header {:?} should be malformed",
                header
            );
        }
    }

    #[test]
    fn test_envelope_does_not_open_under_another_handshake() {
        let requester = SecretKey::generate();
        let responder = SecretKey::generate();

        let first = ClientHandshake::new(&requester).unwrap();
        let verified = first.credential().verify().unwrap();
        let envelope = seal_response(&responder, &verified, b"payload").unwrap();

        // replaying the captured envelope against a later request
        let second = ClientHandshake::new(&requester).unwrap();
        assert!(matches!(
            second.open(&envelope, &responder.public()),
            Err(HandshakeError::DecryptionFailed)
        ));
    }
}
