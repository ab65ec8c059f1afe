//! lazy-gateway binary.
//!
//! ```text
//!     Client Request
//!         → http server (request id, trace, timeout)
//!         → dispatcher → route table
//!         → service client registry (construct on first use)
//!         → server pool (load balancing)
//!         → transport → Backend
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use lazy_gateway::admin::{setup_admin_router, AdminState};
use lazy_gateway::config::{load_config, GatewayConfig};
use lazy_gateway::lifecycle::signals::spawn_signal_handler;
use lazy_gateway::observability::{logging, metrics};
use lazy_gateway::{Gateway, HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "lazy-gateway")]
#[command(
    about = "Reverse-proxy gateway with lazily constructed service clients",
    long_about = None
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    if cli.check {
        println!(
            "configuration OK: {} routes, {} services",
            config.routes.len(),
            config.services.len()
        );
        return Ok(());
    }

    logging::init(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "lazy-gateway starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics endpoint");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let gateway = Gateway::from_config(config)?;
    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    if gateway.config().admin.enabled {
        let listener = TcpListener::bind(&gateway.config().admin.bind_address).await?;
        tracing::info!(address = %listener.local_addr()?, "Admin listener started");
        let app = setup_admin_router(AdminState::new(&gateway));
        let mut admin_shutdown = shutdown.subscribe();
        tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = admin_shutdown.recv().await;
                })
                .await;
            if let Err(e) = result {
                tracing::error!(error = %e, "Admin listener failed");
            }
        });
    }

    let listener = TcpListener::bind(&gateway.config().listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    HttpServer::new(&gateway).run(listener, &shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
