pub use clap::Parser;

use std::path::PathBuf;
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "blade")]
#[command(about = "Run and drive a federated blade node")]
pub struct Args {
    /// Owner API of the daemon to talk to (defaults to the configured api_port)
    #[arg(long, global = true)]
    pub remote: Option<Url>,

    /// Path to the blade config directory (defaults to ~/.blade)
    #[arg(long, global = true)]
    pub config_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: crate::Command,
}
