//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::time::Duration;

use axum::{http::StatusCode, Router};
use tokio::net::TcpListener;

use service_lens::{ClientConfig, ColorClient, ColorServer, ServerConfig, Shutdown};

/// A server or client running on an ephemeral local port.
pub struct Running {
    pub addr: SocketAddr,
    shutdown: Shutdown,
}

impl Running {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for Running {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Serve any router on an ephemeral local port.
pub async fn start_router(router: Router) -> Running {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();

    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = service_lens::http::serve(listener, router, rx).await;
    });

    Running { addr, shutdown }
}

/// Start a color server answering with `color`.
pub async fn start_color_server(color: &str) -> Running {
    let server = ColorServer::new(ServerConfig {
        color: color.to_string(),
        port: 0,
        app_name: format!("colorteller-{color}"),
        metrics_address: None,
    });
    start_router(server.router()).await
}

/// Start a color client pointing at `color_host`.
pub async fn start_color_client(color_host: &str) -> Running {
    let client = ColorClient::new(ClientConfig {
        color_host: color_host.to_string(),
        port: 0,
        app_name: "colorgateway".to_string(),
        metrics_address: None,
    });
    start_router(client.router()).await
}

/// Start a backend that answers every request with a fixed status and body.
#[allow(dead_code)]
pub async fn start_fixed_backend(status: StatusCode, body: &'static str) -> Running {
    start_router(Router::new().fallback(move || async move { (status, body) })).await
}

/// An address with nothing listening on it.
#[allow(dead_code)]
pub async fn unreachable_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Plain HTTP/1.1 test client.
pub fn http1() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}

/// HTTP/2 cleartext client (prior knowledge).
#[allow(dead_code)]
pub fn h2c() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .http2_prior_knowledge()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}

/// GET `url` and return status and body text.
pub async fn get(client: &reqwest::Client, url: &str) -> (u16, String) {
    let response = client.get(url).send().await.expect("request failed");
    let status = response.status().as_u16();
    (status, response.text().await.unwrap())
}
