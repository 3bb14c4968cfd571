//! Color server.
//!
//! Serves HTTP/1.1 and cleartext HTTP/2 on the same port.
//!
//! ```text
//! $ COLOR=red PORT=8080 APP_NAME=colorteller-red color-server
//! $ curl --http2-prior-knowledge -i localhost:8080
//! ```

use tokio::net::TcpListener;

use service_lens::config::{self, ServerConfig};
use service_lens::lifecycle::{signals, Shutdown};
use service_lens::observability::{logging, metrics};
use service_lens::ColorServer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging();

    let config: ServerConfig = match config::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Configuration error");
            std::process::exit(1);
        }
    };

    tracing::info!(
        color = %config.color,
        port = config.port,
        app_name = %config.app_name,
        "Configuration loaded"
    );

    if let Some(addr) = config.metrics_address {
        metrics::init_metrics(addr);
    }

    let listener = TcpListener::bind(config.bind_address()).await?;

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());

    ColorServer::new(config).run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
