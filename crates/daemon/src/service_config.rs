use std::path::PathBuf;
use std::time::Duration;

use common::address::Address;
use common::identity::Profile;
use common::prelude::SecretKey;

#[derive(Debug)]
pub struct Config {
    // node configuration
    /// our identity; if not set then a new secret will be generated
    pub node_secret: Option<SecretKey>,
    /// the address other nodes reach us at
    pub address: Address,
    /// profile served at the identity endpoints
    pub profile: Profile,

    // data store configuration
    /// a path to the sqlite database, if not set then
    ///  an in-memory database is used
    pub sqlite_path: Option<PathBuf>,

    // http server configuration - separate ports for federation and API
    /// Port for the federation HTTP server (public, other nodes).
    pub federation_port: u16,
    /// Port for the API HTTP server (private, the owner's CLI).
    pub api_port: u16,

    // outbound
    /// timeout for each request to another node
    pub request_timeout: Duration,
    /// run a sync pass on this interval, if set
    pub sync_interval: Option<Duration>,

    // logging
    pub log_level: tracing::Level,
    /// Directory for log files (optional, logs to stdout only if not set)
    pub log_dir: Option<PathBuf>,
}
