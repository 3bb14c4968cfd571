//! Color server.
//!
//! # Responsibilities
//! - `/ping` (any method): liveness, empty 200
//! - `GET /` (and any unrouted path): the configured color, or an injected failure
//! - `GET /setFlake?rate=R&code=C`: update the flake settings
//! - Wrap every handler in a named tracing segment

use std::sync::Arc;

use axum::{
    extract::{RawQuery, Request, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{any, get},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::fault::{parse_flake_query, FlakeError, FlakeSettings, FlakeState};
use crate::observability::{metrics, segment_middleware, FixedSegmentNamer, SegmentState};

/// Body returned for an injected failure.
pub const FLAKY_BODY: &str = "flaky server";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct ServerState {
    pub color: Arc<str>,
    pub app_name: Arc<str>,
    pub flake: FlakeState,
}

/// HTTP server that tells callers its color.
pub struct ColorServer {
    router: Router,
    config: ServerConfig,
    flake: FlakeState,
}

impl ColorServer {
    pub fn new(config: ServerConfig) -> Self {
        let flake = FlakeState::default();
        let state = ServerState {
            color: config.color.as_str().into(),
            app_name: config.app_name.as_str().into(),
            flake: flake.clone(),
        };

        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            flake,
        }
    }

    fn build_router(config: &ServerConfig, state: ServerState) -> Router {
        let segments = SegmentState::new(FixedSegmentNamer::new(config.app_name.clone()));

        Router::new()
            .route("/ping", any(ping))
            .route("/setFlake", get(set_flake))
            .fallback(get_color)
            .with_state(state)
            .layer(middleware::from_fn_with_state(segments, segment_middleware))
            .layer(TraceLayer::new_for_http())
    }

    /// The fully layered router, for serving or in-process calls.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Handle on the live flake settings.
    pub fn flake_state(&self) -> FlakeState {
        self.flake.clone()
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        tracing::info!(
            address = %listener.local_addr()?,
            app_name = %self.config.app_name,
            "Color server starting"
        );
        super::serve(listener, self.router, shutdown).await?;
        tracing::info!("Color server stopped");
        Ok(())
    }
}

async fn ping() -> StatusCode {
    StatusCode::OK
}

async fn get_color(State(state): State<ServerState>, request: Request) -> Response {
    tracing::info!(
        method = %request.method(),
        uri = %request.uri(),
        "Received request"
    );

    if let Some(code) = state.flake.roll() {
        tracing::info!(code = code.as_u16(), "Injecting flaky response");
        metrics::record_flake(&state.app_name, code.as_u16());
        return (code, FLAKY_BODY).into_response();
    }

    (StatusCode::OK, state.color.to_string()).into_response()
}

async fn set_flake(
    State(state): State<ServerState>,
    RawQuery(query): RawQuery,
) -> Result<String, FlakeError> {
    tracing::info!(query = ?query, "Received setFlake request");

    let settings: FlakeSettings = parse_flake_query(query.as_deref()).inspect_err(|e| {
        tracing::warn!(error = %e, "Rejected setFlake request");
    })?;

    state.flake.update(settings);
    tracing::info!(rate = settings.rate, code = settings.code.as_u16(), "Flake settings updated");

    Ok(settings.to_string())
}
