//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (HTTP/1.1 or h2c prior knowledge, auto-detected)
//!     → h2c.rs (HTTP/1.1 `Upgrade: h2c` → 101, then HTTP/2 on the same socket)
//!     → TraceLayer (request/response logging)
//!     → segment middleware (named segment, trace header)
//!     → server.rs handlers  (color server)
//!       client.rs handlers  (color client)
//!           → upstream.rs (h2c call to the color server, subsegment)
//!     → response to caller
//! ```

pub mod client;
pub mod h2c;
pub mod server;
pub mod upstream;

pub use client::ColorClient;
pub use server::ColorServer;
pub use upstream::{Upstream, UpstreamError};

use axum::{middleware, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::lifecycle::shutdown;

/// Serve `router` on `listener` until `shutdown` fires, then drain.
///
/// Accepts HTTP/1.1, HTTP/2 with prior knowledge, and HTTP/1.1 connections
/// upgrading to h2c.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    shutdown: broadcast::Receiver<()>,
) -> Result<(), std::io::Error> {
    let app = router
        .clone()
        .layer(middleware::from_fn_with_state(router, h2c::h2c_upgrade));

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown::wait_for(shutdown))
        .await
}
