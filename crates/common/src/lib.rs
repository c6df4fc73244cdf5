/**
 * Node addresses as given by users and
 *  advertised in notifications.
 */
pub mod address;
/**
 * Outbound requests to other nodes: plain and
 *  authenticated pulls, notifications.
 */
pub mod client;
pub mod clock;
/**
 * Cryptographic types and operations.
 *  - Ed25519 identity keys
 *  - Per-request ephemeral key agreement and
 *    authenticated response encryption
 */
pub mod crypto;
/**
 * Trust-on-first-use cache of remote node
 *  identities and profiles.
 */
pub mod directory;
/**
 * The local node's feed and the boundary
 *  that serves it to other nodes.
 */
pub mod feed;
pub mod identity;
pub mod ids;
mod locks;
pub mod models;
/**
 * A node: one identity, one store, one transport,
 *  and every component wired to them.
 */
pub mod node;
/**
 * Category-based visibility rules for
 *  feed items.
 */
pub mod permissions;
pub mod protocol;
/**
 * Store-and-notify private messages.
 */
pub mod relay;
/**
 * Record storage. Async repository traits
 *  and an in-memory implementation.
 */
pub mod store;
/**
 * Cursor-driven pulls of subscribed feeds
 *  into the local timeline.
 */
pub mod sync;
/**
 * In-process multi-node network for
 *  integration tests.
 */
pub mod testkit;
pub mod transport;
/**
 * Helper for setting build version information
 *  at compile time.
 */
pub mod version;

pub mod prelude {
    pub use crate::address::Address;
    pub use crate::crypto::{PublicKey, SecretKey};
    pub use crate::identity::{Identity, Profile};
    pub use crate::models::{FeedItem, FeedMessage, Rule};
    pub use crate::node::{Node, NodeBuilder};
    pub use crate::store::{MemoryStore, Store};
    pub use crate::transport::Transport;
    pub use crate::version::build_info;
}
