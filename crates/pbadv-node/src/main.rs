use std::path::PathBuf;

use clap::Parser;

use pbadv_interfaces::UdpAdvertiser;
use pbadv_node::{Node, NodeConfig};

#[derive(Parser)]
#[command(name = "pbadv-node", about = "PB-ADV provisioning bearer node")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "pbadv.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match NodeConfig::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("failed to load config from {}: {e}", cli.config.display());
            std::process::exit(1);
        }
    };

    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        pbadv_node::logging::init_json(&config.logging.level);
    } else {
        pbadv_node::logging::init(&config.logging.level);
    }

    let udp_config = match config.transport.to_udp_config() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("{e}");
            std::process::exit(1);
        }
    };
    let (advertiser, port) = match UdpAdvertiser::start(udp_config).await {
        Ok(started) => started,
        Err(e) => {
            tracing::error!("failed to start advertiser: {e}");
            std::process::exit(1);
        }
    };

    let mut node = match Node::new(&config, port) {
        Ok(node) => node,
        Err(e) => {
            tracing::error!("failed to create node: {e}");
            std::process::exit(1);
        }
    };

    let handle = node.shutdown_handle();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("received SIGINT, shutting down");
        handle.shutdown();
    });

    let result = node.run().await;
    advertiser.stop().await;

    match result {
        Ok(report) => {
            tracing::info!(
                sent = report.sent.len(),
                received = report.received.len(),
                close_reason = ?report.close_reason,
                "session complete"
            );
        }
        Err(e) => {
            tracing::error!("session failed: {e}");
            std::process::exit(1);
        }
    }
}
