//! Fault injection for the color server.
//!
//! # Data Flow
//! ```text
//! GET /setFlake?rate=R&code=C
//!     → params.rs (validate, first failure → 400)
//!     → state.rs (atomic swap of FlakeSettings)
//!
//! GET /
//!     → state.rs roll: uniform draw < rate → failure status
//! ```

pub mod params;
pub mod state;

pub use params::{parse_flake_query, FlakeError};
pub use state::{FlakeSettings, FlakeState};
