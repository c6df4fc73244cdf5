pub mod daemon;
pub mod feed;
pub mod health;
pub mod init;
pub mod msg;
pub mod node;
pub mod perm;
pub mod sub;
pub mod timeline;
pub mod version;

pub use daemon::Daemon;
pub use feed::Feed;
pub use health::Health;
pub use init::Init;
pub use msg::Msg;
pub use node::NodeCmd;
pub use perm::Perm;
pub use sub::Sub;
pub use timeline::Timeline;
pub use version::Version;
