//! Color client.
//!
//! Proxies `/color` and `/setFlake` to the color server over h2c.
//!
//! ```text
//! $ COLOR_HOST=localhost:8080 PORT=9000 APP_NAME=colorgateway color-client
//! $ curl localhost:9000/color
//! ```

use tokio::net::TcpListener;

use service_lens::config::{self, ClientConfig};
use service_lens::lifecycle::{signals, Shutdown};
use service_lens::observability::{logging, metrics};
use service_lens::ColorClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging();

    let config: ClientConfig = match config::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Configuration error");
            std::process::exit(1);
        }
    };

    tracing::info!(
        color_host = %config.color_host,
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

    ColorClient::new(config).run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
