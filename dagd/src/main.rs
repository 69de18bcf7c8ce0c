use dagd::{cli, ui, Config, Daemon};
use std::process;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let args = cli::parse_args();
    init_logging(&args);

    // An explicit network picks that network's defaults; otherwise the config file decides
    let loaded = match (&args.network, &args.config_path) {
        (Some(network), _) => Config::for_network(network),
        (None, Some(path)) => Config::load(path),
        (None, None) => Ok(Config::default()),
    };
    let mut config = match loaded {
        Ok(config) => config,
        Err(e) => {
            ui::print_status("✗", &e, ui::StatusType::Error);
            error!("{}", e);
            process::exit(1);
        }
    };
    config.apply_cli_overrides(&args);

    ui::print_banner(env!("CARGO_PKG_VERSION"), &config.network.network_id);
    ui::print_config_summary(&config);

    let daemon = match Daemon::new(config) {
        Ok(d) => d,
        Err(e) => {
            ui::print_status("✗", &format!("Failed to initialize daemon: {}", e), ui::StatusType::Error);
            error!("Failed to initialize daemon: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = daemon.run().await {
        ui::print_status("✗", &format!("Daemon error: {}", e), ui::StatusType::Error);
        error!("Daemon error: {}", e);
        process::exit(1);
    }

    ui::print_status("✓", "dagd stopped gracefully", ui::StatusType::Success);
    info!("dagd stopped gracefully");
}

fn init_logging(args: &cli::Args) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    fmt().with_env_filter(filter).with_target(true).with_thread_ids(true).init();
}
