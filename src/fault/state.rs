//! Shared flake state for the color server.

use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::http::StatusCode;
use rand::Rng;

/// One consistent flake setting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlakeSettings {
    /// Probability in `[0, 1]` that a request fails.
    pub rate: f32,
    /// Status returned for a failed request.
    pub code: StatusCode,
}

impl Default for FlakeSettings {
    fn default() -> Self {
        Self {
            rate: 0.0,
            code: StatusCode::OK,
        }
    }
}

impl std::fmt::Display for FlakeSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rate: {}, code: {}", self.rate, self.code.as_u16())
    }
}

/// Flake state shared by every request handler.
///
/// The pair is swapped as a whole, so readers never see a rate from one
/// update combined with a code from another.
#[derive(Debug, Clone, Default)]
pub struct FlakeState {
    current: Arc<ArcSwap<FlakeSettings>>,
}

impl FlakeState {
    pub fn new(initial: FlakeSettings) -> Self {
        Self {
            current: Arc::new(ArcSwap::from_pointee(initial)),
        }
    }

    /// Snapshot of the current settings.
    pub fn settings(&self) -> FlakeSettings {
        **self.current.load()
    }

    /// Replace the current settings. Last write wins.
    pub fn update(&self, settings: FlakeSettings) {
        self.current.store(Arc::new(settings));
    }

    /// Roll for this request. Returns the failure status if it should flake.
    pub fn roll(&self) -> Option<StatusCode> {
        self.roll_with(&mut rand::thread_rng())
    }

    /// Same as [`roll`](Self::roll) with a caller-supplied RNG.
    pub fn roll_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<StatusCode> {
        let settings = self.settings();
        let draw: f32 = rng.gen();
        (draw < settings.rate).then_some(settings.code)
    }
}
