use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Default)]
#[command(name = "dagd")]
#[command(about = "Block-DAG full node daemon", long_about = None)]
pub struct Args {
    /// Path to configuration file (optional, uses defaults if not provided)
    #[arg(short, long)]
    pub config_path: Option<PathBuf>,

    /// Data directory
    #[arg(short, long)]
    pub data_dir: Option<PathBuf>,

    /// Network (mainnet, testnet, devnet)
    #[arg(short, long)]
    pub network: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    pub log_level: String,

    /// P2P listen port
    #[arg(long)]
    pub p2p_port: Option<u16>,

    /// Bootstrap peers (comma-separated host:port)
    #[arg(long)]
    pub bootstrap_peers: Option<String>,

    /// Keep all state in memory instead of RocksDB
    #[arg(long)]
    pub in_memory: bool,
}

pub fn parse_args() -> Args {
    Args::parse()
}
