//! HTTP/1.1 → HTTP/2 cleartext upgrade (`Upgrade: h2c`).
//!
//! # Responsibilities
//! - Spot HTTP/1.1 requests asking to upgrade to h2c
//! - Answer `101 Switching Protocols`
//! - Serve HTTP/2 on the upgraded connection with the same router
//!
//! # Design Decisions
//! - Prior-knowledge h2c never reaches this layer; `axum::serve` detects
//!   the HTTP/2 preface itself
//! - The upgrading request is not replayed as stream 1; callers send their
//!   requests again over the new HTTP/2 connection

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap, HeaderName, StatusCode, Version},
    middleware::Next,
    response::{IntoResponse, Response},
    Router,
};
use hyper_util::{
    rt::TokioExecutor,
    service::TowerToHyperService,
};

pub const HTTP2_SETTINGS: HeaderName = HeaderName::from_static("http2-settings");

/// True for an HTTP/1.1 request carrying a complete h2c upgrade offer.
pub fn is_h2c_upgrade(version: Version, headers: &HeaderMap) -> bool {
    version == Version::HTTP_11
        && header_has_token(headers, &header::UPGRADE, "h2c")
        && header_has_token(headers, &header::CONNECTION, "upgrade")
        && header_has_token(headers, &header::CONNECTION, "http2-settings")
        && headers.contains_key(HTTP2_SETTINGS)
}

fn header_has_token(headers: &HeaderMap, name: &HeaderName, token: &str) -> bool {
    headers
        .get_all(name)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|t| t.trim().eq_ignore_ascii_case(token))
}

/// Upgrades h2c offers; everything else passes through untouched.
///
/// `app` is the router served on the upgraded connection.
pub async fn h2c_upgrade(State(app): State<Router>, mut req: Request, next: Next) -> Response {
    if !is_h2c_upgrade(req.version(), req.headers()) {
        return next.run(req).await;
    }

    let on_upgrade = hyper::upgrade::on(&mut req);
    tokio::spawn(async move {
        let upgraded = match on_upgrade.await {
            Ok(upgraded) => upgraded,
            Err(e) => {
                tracing::warn!(error = %e, "h2c upgrade failed");
                return;
            }
        };

        tracing::debug!("Serving HTTP/2 on upgraded connection");
        let result = hyper::server::conn::http2::Builder::new(TokioExecutor::new())
            .serve_connection(upgraded, TowerToHyperService::new(app))
            .await;
        if let Err(e) = result {
            tracing::debug!(error = %e, "Upgraded HTTP/2 connection closed with error");
        }
    });

    (
        StatusCode::SWITCHING_PROTOCOLS,
        [(header::CONNECTION, "Upgrade"), (header::UPGRADE, "h2c")],
        Body::empty(),
    )
        .into_response()
}
