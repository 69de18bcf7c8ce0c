//! Node display state as reported to status layers

use crate::NetworkType;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeState {
    Init,
    Loading,
    /// Trying to reach peers
    Waiting(NetworkType),
    /// Connected, synchronizing by the regular loop
    Connected(NetworkType),
    /// Connected, fetching historical ranges from low to high time
    SyncingOld(NetworkType),
    Synchronized(NetworkType),
}

impl NodeState {
    pub fn code(&self) -> u8 {
        match self {
            NodeState::Init => 0x00,
            NodeState::Loading => 0x03,
            NodeState::Waiting(NetworkType::Devnet) => 0x05,
            NodeState::Waiting(NetworkType::Testnet) => 0x06,
            NodeState::Waiting(NetworkType::Mainnet) => 0x07,
            NodeState::Connected(NetworkType::Devnet) => 0x08,
            NodeState::Connected(NetworkType::Testnet) => 0x09,
            NodeState::Connected(NetworkType::Mainnet) => 0x0a,
            NodeState::Synchronized(NetworkType::Devnet) => 0x0b,
            NodeState::Synchronized(NetworkType::Testnet) => 0x0c,
            NodeState::Synchronized(NetworkType::Mainnet) => 0x0d,
            NodeState::SyncingOld(NetworkType::Devnet) => 0x10,
            NodeState::SyncingOld(NetworkType::Testnet) => 0x11,
            NodeState::SyncingOld(NetworkType::Mainnet) => 0x12,
        }
    }

    /// Short mnemonic used in status lines
    pub fn short_name(&self) -> &'static str {
        match self {
            NodeState::Init => "INIT",
            NodeState::Loading => "LOAD",
            NodeState::Waiting(NetworkType::Devnet) => "WDST",
            NodeState::Waiting(NetworkType::Testnet) => "WTST",
            NodeState::Waiting(NetworkType::Mainnet) => "WAIT",
            NodeState::Connected(NetworkType::Devnet) => "CDST",
            NodeState::Connected(NetworkType::Testnet) => "CTST",
            NodeState::Connected(NetworkType::Mainnet) => "CONN",
            NodeState::SyncingOld(NetworkType::Devnet) => "CDSTP",
            NodeState::SyncingOld(NetworkType::Testnet) => "CTSTP",
            NodeState::SyncingOld(NetworkType::Mainnet) => "CONNP",
            NodeState::Synchronized(NetworkType::Devnet) => "SDST",
            NodeState::Synchronized(NetworkType::Testnet) => "STST",
            NodeState::Synchronized(NetworkType::Mainnet) => "SYNC",
        }
    }

    pub fn is_syncing_old(&self) -> bool {
        matches!(self, NodeState::SyncingOld(_))
    }

    pub fn is_synchronized(&self) -> bool {
        matches!(self, NodeState::Synchronized(_))
    }
}

fn network_name(network: &NetworkType) -> &'static str {
    match network {
        NetworkType::Mainnet => "main",
        NetworkType::Testnet => "test",
        NetworkType::Devnet => "dev",
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeState::Init => write!(f, "Node initializing."),
            NodeState::Loading => write!(f, "Loading blocks from the local storage."),
            NodeState::Waiting(n) => write!(f, "Trying to connect to the {} network.", network_name(n)),
            NodeState::Connected(n) => write!(f, "Connected to the {} network. Synchronizing.", network_name(n)),
            NodeState::SyncingOld(n) => write!(
                f,
                "Connected to the {} network. Synchronizing from low to high.",
                network_name(n)
            ),
            NodeState::Synchronized(NetworkType::Mainnet) => {
                write!(f, "Synchronized with the main network. Normal operation.")
            }
            NodeState::Synchronized(n) => {
                write!(f, "Synchronized with the {} network. Normal testing.", network_name(n))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syncing_old_codes_per_network() {
        assert_eq!(NodeState::SyncingOld(NetworkType::Mainnet).short_name(), "CONNP");
        assert_eq!(NodeState::SyncingOld(NetworkType::Testnet).code(), 0x11);
        assert_eq!(
            NodeState::SyncingOld(NetworkType::Devnet).to_string(),
            "Connected to the dev network. Synchronizing from low to high."
        );
        assert!(NodeState::Synchronized(NetworkType::Mainnet).is_synchronized());
    }
}
