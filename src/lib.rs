//! Color server and color client for the service-lens tracing walkthrough.
//!
//! # Architecture Overview
//!
//! ```text
//!   caller ──▶ color-client ──(h2c, X-Amzn-Trace-Id)──▶ color-server
//!              /ping                                      /ping
//!              /color     ──────── GET / ───────────────▶ /   (color or flake)
//!              /setFlake  ──────── GET /setFlake?... ───▶ /setFlake
//! ```
//!
//! Both processes wrap every handler in a named tracing segment; the client
//! opens a subsegment for each upstream call.

pub mod config;
pub mod fault;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::{ClientConfig, ServerConfig};
pub use http::{ColorClient, ColorServer};
pub use lifecycle::Shutdown;
