//! User interface utilities for better console output

use consensus_core::state::NodeState;
use consensus_core::{Amount, ChainStats};
use std::fmt;
use std::time::Duration;

/// ANSI color codes for terminal output
pub mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";

    pub const BRIGHT_RED: &str = "\x1b[91m";
    pub const BRIGHT_GREEN: &str = "\x1b[92m";
    pub const BRIGHT_YELLOW: &str = "\x1b[93m";
    pub const BRIGHT_CYAN: &str = "\x1b[96m";
    pub const BRIGHT_WHITE: &str = "\x1b[97m";
}

/// Print startup banner
pub fn print_banner(version: &str, network: &str) {
    println!();
    println!("{}╔══════════════════════════════════════════════════════════════╗{}", colors::BRIGHT_CYAN, colors::RESET);
    println!(
        "{}║{}  {}DAGD BLOCK-DAG NODE v{:<39}{}{}║{}",
        colors::BRIGHT_CYAN, colors::RESET, colors::BOLD, version, colors::RESET, colors::BRIGHT_CYAN, colors::RESET
    );
    println!(
        "{}║{}  Network: {}{:<51}{}{}║{}",
        colors::BRIGHT_CYAN, colors::RESET, colors::BRIGHT_GREEN, network, colors::RESET, colors::BRIGHT_CYAN, colors::RESET
    );
    println!("{}╚══════════════════════════════════════════════════════════════╝{}", colors::BRIGHT_CYAN, colors::RESET);
    println!();
}

/// Status types for colored output
#[derive(Debug, Clone, Copy)]
pub enum StatusType {
    Success,
    Info,
    Warning,
    Error,
}

/// Print status line with icon and color
pub fn print_status(icon: &str, message: &str, status: StatusType) {
    let color = match status {
        StatusType::Success => colors::BRIGHT_GREEN,
        StatusType::Info => colors::BRIGHT_CYAN,
        StatusType::Warning => colors::BRIGHT_YELLOW,
        StatusType::Error => colors::BRIGHT_RED,
    };
    println!("{}[{}]{} {}", color, icon, colors::RESET, message);
}

pub fn print_section(title: &str) {
    println!();
    println!("{}  {}{}{}", colors::BRIGHT_CYAN, colors::BOLD, title, colors::RESET);
    println!("{}{}{}", colors::DIM, "━".repeat(64), colors::RESET);
}

pub fn print_kv(key: &str, value: &str) {
    println!("  {}{}:{} {}{}{}", colors::BRIGHT_WHITE, key, colors::RESET, colors::BRIGHT_CYAN, value, colors::RESET);
}

pub fn print_config_summary(config: &crate::config::Config) {
    print_section("Configuration");
    print_kv("Network", &config.network.network_id);
    let storage = if config.storage.in_memory {
        "in memory".to_string()
    } else {
        config.storage.data_dir.display().to_string()
    };
    print_kv("Storage", &storage);
    print_kv("P2P", &format!("{}:{}", config.p2p.listen_address, config.p2p.port));
    print_kv("Bootstrap Peers", &config.p2p.bootstrap_peers.len().to_string());
}

/// Format duration as human-readable string
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

/// Periodic status snapshot
pub struct NodeStatus {
    pub uptime: Duration,
    pub state: NodeState,
    pub stats: ChainStats,
    pub supply: Amount,
    pub peer_count: usize,
    pub syncing: bool,
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} | up {} | blocks {} main {} extra {} orphans {} | supply {} | peers {}{}",
            self.state.short_name(),
            self.state,
            format_duration(self.uptime),
            self.stats.nblocks,
            self.stats.nmain,
            self.stats.nextra,
            self.stats.norphan,
            self.supply,
            self.peer_count,
            if self.syncing { " | syncing" } else { "" },
        )
    }
}
