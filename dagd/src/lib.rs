//! dagd - block-DAG full node daemon
//!
//! Wires storage, the consensus engine, the peer network and the sync
//! engine into one running node.

pub mod cli;
pub mod config;
pub mod daemon;
pub mod storage_manager;
pub mod ui;

pub use cli::Args;
pub use config::Config;
pub use daemon::Daemon;
