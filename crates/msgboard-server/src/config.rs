use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use msgboard_store::Config;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory holding the store's WAL and snapshot files.
    #[arg(long, env = "MSGBOARD_DATA_DIR", default_value = "./msgboard-data")]
    pub data_dir: PathBuf,

    /// Socket address to serve HTTP on. Use port 0 for an ephemeral port.
    #[arg(long, env = "MSGBOARD_LISTEN", default_value = "127.0.0.1:3000")]
    pub listen: SocketAddr,

    /// Store durability preset.
    #[arg(long, env = "MSGBOARD_PROFILE", value_enum, default_value_t = Profile::Durable)]
    pub profile: Profile,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// fsync every write
    Durable,
    /// OS-buffered writes, synced on checkpoint and shutdown
    Relaxed,
    /// Small WAL segments and frequent checkpoints
    Compact,
}

impl Profile {
    pub fn store_config(self) -> Config {
        match self {
            Profile::Durable => Config::durable(),
            Profile::Relaxed => Config::relaxed(),
            Profile::Compact => Config::compact(),
        }
    }
}
