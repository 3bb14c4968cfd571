//! Outbound calls from the color client to the color server.
//!
//! # Responsibilities
//! - Speak cleartext HTTP/2 (prior knowledge) to the configured host
//! - Open a subsegment per call and propagate the trace header
//! - Map connection and body failures to distinct errors
//!
//! # Design Decisions
//! - One pooled client per process; no retries, no timeouts
//! - Error text carries the full source chain so callers see the root cause

use axum::{
    body::{Body, Bytes},
    http::{uri::InvalidUri, HeaderValue, Request, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tracing::Instrument;

use crate::observability::{SegmentContext, TRACE_HEADER};

/// Failure talking to the upstream color server.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("invalid upstream uri {uri:?}: {source}")]
    InvalidUri {
        uri: String,
        #[source]
        source: InvalidUri,
    },

    #[error("failed to build upstream request: {0}")]
    Request(#[from] axum::http::Error),

    /// Connecting or exchanging headers failed.
    #[error("{}", error_chain(.0))]
    Connect(#[source] hyper_util::client::legacy::Error),

    /// The response head arrived but the body could not be read.
    #[error("{}", error_chain(.0))]
    Body(#[source] axum::Error),
}

impl UpstreamError {
    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            UpstreamError::InvalidUri { .. } => "invalid_uri",
            UpstreamError::Request(_) => "request",
            UpstreamError::Connect(_) => "connect",
            UpstreamError::Body(_) => "body",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            UpstreamError::Body(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for UpstreamError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

/// Renders `err` followed by each of its sources, `": "`-separated.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

/// A fully read upstream response.
#[derive(Debug)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

/// HTTP/2 cleartext client bound to one upstream authority.
#[derive(Clone)]
pub struct Upstream {
    host: String,
    client: Client<HttpConnector, Body>,
}

impl Upstream {
    pub fn new(host: impl Into<String>) -> Self {
        let client = Client::builder(TokioExecutor::new())
            .http2_only(true)
            .build(HttpConnector::new());

        Self {
            host: host.into(),
            client,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// `GET http://<host><path_and_query>` and read the whole body.
    pub async fn get(
        &self,
        path_and_query: &str,
        segment: Option<&SegmentContext>,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let uri_string = format!("http://{}{}", self.host, path_and_query);
        let uri: Uri = uri_string
            .parse()
            .map_err(|source| UpstreamError::InvalidUri {
                uri: uri_string.clone(),
                source,
            })?;

        let (span, trace_header) = match segment {
            Some(ctx) => {
                let (span, header) = ctx.subsegment(&self.host);
                (span, Some(header))
            }
            None => (tracing::info_span!("subsegment", name = %self.host, status = tracing::field::Empty), None),
        };

        let mut builder = Request::get(uri);
        if let Some(value) = trace_header.and_then(|h| HeaderValue::from_str(&h.to_string()).ok()) {
            builder = builder.header(TRACE_HEADER, value);
        }
        let request = builder.body(Body::empty())?;

        async {
            tracing::debug!(uri = %uri_string, "Calling upstream");

            let response = self
                .client
                .request(request)
                .await
                .map_err(UpstreamError::Connect)?;
            let status = response.status();
            tracing::Span::current().record("status", status.as_u16());

            let body = axum::body::to_bytes(Body::new(response.into_body()), usize::MAX)
                .await
                .map_err(UpstreamError::Body)?;

            Ok::<_, UpstreamError>(UpstreamResponse { status, body })
        }
        .instrument(span)
        .await
    }
}
