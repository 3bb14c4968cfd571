//! Configuration schema definitions.
//!
//! Both processes read their settings from environment variables. Every
//! value can also be passed as a flag, which is mostly useful for tests and
//! local runs.

use std::net::{Ipv4Addr, SocketAddr};

use clap::builder::NonEmptyStringValueParser;
use clap::Parser;

/// Configuration for the color server.
#[derive(Debug, Clone, Parser)]
#[command(name = "color-server")]
#[command(about = "Serves a configured color with injectable flakiness")]
pub struct ServerConfig {
    /// Color string returned by `GET /`.
    #[arg(long, env = "COLOR", value_parser = NonEmptyStringValueParser::new())]
    pub color: String,

    /// Port to listen on (bound on all interfaces).
    #[arg(long, env = "PORT")]
    pub port: u16,

    /// Name given to every tracing segment recorded by this process.
    #[arg(long, env = "APP_NAME", value_parser = NonEmptyStringValueParser::new())]
    pub app_name: String,

    /// Optional Prometheus scrape endpoint (e.g. "0.0.0.0:9090").
    #[arg(long, env = "METRICS_ADDR")]
    pub metrics_address: Option<SocketAddr>,
}

impl ServerConfig {
    /// Address the HTTP listener binds to.
    pub fn bind_address(&self) -> SocketAddr {
        bind_all(self.port)
    }
}

/// Configuration for the color client.
#[derive(Debug, Clone, Parser)]
#[command(name = "color-client")]
#[command(about = "Proxies color requests to the color server with tracing")]
pub struct ClientConfig {
    /// Upstream color server authority (e.g. "colorteller:8080").
    #[arg(long, env = "COLOR_HOST", value_parser = NonEmptyStringValueParser::new())]
    pub color_host: String,

    /// Port to listen on (bound on all interfaces).
    #[arg(long, env = "PORT")]
    pub port: u16,

    /// Name given to every tracing segment recorded by this process.
    #[arg(long, env = "APP_NAME", value_parser = NonEmptyStringValueParser::new())]
    pub app_name: String,

    /// Optional Prometheus scrape endpoint (e.g. "0.0.0.0:9090").
    #[arg(long, env = "METRICS_ADDR")]
    pub metrics_address: Option<SocketAddr>,
}

impl ClientConfig {
    /// Address the HTTP listener binds to.
    pub fn bind_address(&self) -> SocketAddr {
        bind_all(self.port)
    }
}

fn bind_all(port: u16) -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, port))
}
