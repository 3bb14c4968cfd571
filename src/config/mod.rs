//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! environment variables (COLOR / COLOR_HOST, PORT, APP_NAME, METRICS_ADDR)
//!     + optional command-line flags
//!     → loader.rs (clap parse, empty values rejected)
//!     → ServerConfig / ClientConfig (immutable)
//!     → passed by value into the HTTP layer at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - Any missing or malformed setting is fatal before a socket is bound

pub mod loader;
pub mod schema;

pub use loader::{load, load_from, ConfigError};
pub use schema::{ClientConfig, ServerConfig};
