//! Color client (gateway).
//!
//! # Responsibilities
//! - `/ping` (any method): liveness, empty 200
//! - `GET /color`: fetch the color from the upstream server
//! - `GET /setFlake?...`: forward path and query upstream, relay status and body
//! - Wrap every handler in a named tracing segment
//!
//! # Design Decisions
//! - `/color` always answers 200 with whatever body the upstream returned
//! - `/setFlake` relays the upstream status verbatim
//! - Local failures: connect → 500, body read → 400

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{any, get},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::config::ClientConfig;
use crate::http::upstream::{Upstream, UpstreamError};
use crate::observability::{
    metrics, segment_middleware, FixedSegmentNamer, SegmentContext, SegmentState,
};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct ClientState {
    pub upstream: Upstream,
    pub app_name: Arc<str>,
}

/// HTTP front end that proxies to the color server.
pub struct ColorClient {
    router: Router,
    config: ClientConfig,
}

impl ColorClient {
    pub fn new(config: ClientConfig) -> Self {
        let state = ClientState {
            upstream: Upstream::new(config.color_host.clone()),
            app_name: config.app_name.as_str().into(),
        };

        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    fn build_router(config: &ClientConfig, state: ClientState) -> Router {
        let segments = SegmentState::new(FixedSegmentNamer::new(config.app_name.clone()));

        Router::new()
            .route("/ping", any(ping))
            .route("/color", get(get_color))
            .route("/setFlake", get(set_flake))
            .with_state(state)
            .layer(middleware::from_fn_with_state(segments, segment_middleware))
            .layer(TraceLayer::new_for_http())
    }

    /// The fully layered router, for serving or in-process calls.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        tracing::info!(
            address = %listener.local_addr()?,
            color_host = %self.config.color_host,
            app_name = %self.config.app_name,
            "Color client starting"
        );
        super::serve(listener, self.router, shutdown).await?;
        tracing::info!("Color client stopped");
        Ok(())
    }
}

async fn ping() -> StatusCode {
    StatusCode::OK
}

async fn get_color(State(state): State<ClientState>, request: Request) -> Response {
    let segment = request.extensions().get::<SegmentContext>();

    match state.upstream.get("/", segment).await {
        Ok(upstream) => {
            tracing::info!(
                status = upstream.status.as_u16(),
                body = %String::from_utf8_lossy(&upstream.body),
                "Got color response"
            );
            (StatusCode::OK, upstream.body).into_response()
        }
        Err(e) => upstream_failure(&state, "Could not get color", e),
    }
}

async fn set_flake(State(state): State<ClientState>, request: Request) -> Response {
    let segment = request.extensions().get::<SegmentContext>();
    let path_and_query = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/setFlake");

    match state.upstream.get(path_and_query, segment).await {
        Ok(upstream) => {
            tracing::info!(
                status = upstream.status.as_u16(),
                body = %String::from_utf8_lossy(&upstream.body),
                "Got setFlake response"
            );
            (upstream.status, upstream.body).into_response()
        }
        Err(e) => upstream_failure(&state, "Could not set flakiness", e),
    }
}

fn upstream_failure(state: &ClientState, context: &'static str, err: UpstreamError) -> Response {
    tracing::error!(
        upstream = %state.upstream.host(),
        kind = err.kind(),
        error = %err,
        "{context}"
    );
    metrics::record_upstream_error(&state.app_name, err.kind());
    err.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request as HttpRequest;
    use tower::ServiceExt;

    async fn unreachable_host() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        addr.to_string()
    }

    fn client(color_host: String) -> ColorClient {
        ColorClient::new(ClientConfig {
            color_host,
            port: 0,
            app_name: "colorgateway".into(),
            metrics_address: None,
        })
    }

    async fn call(router: Router, uri: &str) -> (StatusCode, String) {
        let response = router
            .oneshot(HttpRequest::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_ping_does_not_touch_upstream() {
        let client = client(unreachable_host().await);
        assert_eq!(call(client.router(), "/ping").await, (StatusCode::OK, String::new()));
    }

    #[tokio::test]
    async fn test_ping_accepts_any_method() {
        let client = client(unreachable_host().await);
        for method in ["POST", "PUT", "DELETE"] {
            let response = client
                .router()
                .oneshot(HttpRequest::builder().method(method).uri("/ping").body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{method}");
        }
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_500() {
        let client = client(unreachable_host().await);

        let (status, body) = call(client.router(), "/color").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.is_empty());

        let (status, _) = call(client.router(), "/setFlake?rate=1&code=503").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let client = client(unreachable_host().await);
        let (status, _) = call(client.router(), "/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
