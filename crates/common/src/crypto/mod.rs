//! Cryptographic primitives for blade nodes
//!
//! - **Identity**: every node owns a long-term Ed25519 keypair
//!   (`SecretKey`/`PublicKey`). The public half, in its canonical base64
//!   encoding, is the node's identity everywhere in the system.
//! - **Handshake**: authenticated responses use a fresh P-384 ECDH exchange
//!   per request. Each side signs its ephemeral key with its long-term key.
//! - **Encryption**: HKDF-SHA256 turns the ECDH output into a one-shot
//!   ChaCha20-Poly1305 key.
//!
//! # Security Model
//!
//! There are no sessions and no certificate authority. A requester's claimed
//! key is trusted on first use: the signature only proves possession of the
//! matching private key. A responder's key is never taken from the response;
//! the caller supplies the key it expects, usually from the known-node cache.
//!
//! Every request uses new ephemeral keys, so an envelope captured from one
//! exchange does not decrypt under any later one.

mod handshake;
mod keys;
mod session;

pub use ed25519_dalek::Signature;
pub use handshake::{
    seal_response, ClientHandshake, Credential, EncryptedEnvelope, HandshakeError,
    VerifiedCredential, AUTH_SCHEME,
};
pub use keys::{KeyError, PublicKey, SecretKey};
pub use session::{SessionKey, SessionKeyError, HANDSHAKE_INFO};
