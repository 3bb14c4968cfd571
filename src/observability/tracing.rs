//! Distributed tracing segments.
//!
//! # Responsibilities
//! - Name each inbound request's segment via a [`SegmentNamer`]
//! - Extract trace context from incoming requests (or start a new trace)
//! - Open a `segment` span around the handler and close it on completion
//! - Echo the trace root back to the caller
//! - Hand the context to outbound calls so they can open subsegments
//!
//! # Design Decisions
//! - Segments are plain `tracing` spans; exporting them is the subscriber's job
//! - The middleware never changes status or body

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::{header, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use tracing::{field, Instrument, Span};

use crate::observability::metrics;
use crate::observability::trace_header::{SegmentId, TraceHeader, TRACE_HEADER};

/// Assigns a human-readable name to each recorded request segment.
pub trait SegmentNamer: Send + Sync + 'static {
    /// Name for a request carrying the given `Host` header.
    fn name(&self, host: Option<&str>) -> String;
}

/// Every segment gets the same name.
#[derive(Debug, Clone)]
pub struct FixedSegmentNamer {
    name: String,
}

impl FixedSegmentNamer {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl SegmentNamer for FixedSegmentNamer {
    fn name(&self, _host: Option<&str>) -> String {
        self.name.clone()
    }
}

/// Uses the request host when it matches `pattern`, otherwise `fallback`.
///
/// `pattern` supports `*` (any run of characters) and `?` (one character).
#[derive(Debug, Clone)]
pub struct DynamicSegmentNamer {
    fallback: String,
    pattern: String,
}

impl DynamicSegmentNamer {
    pub fn new(fallback: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            fallback: fallback.into(),
            pattern: pattern.into(),
        }
    }
}

impl SegmentNamer for DynamicSegmentNamer {
    fn name(&self, host: Option<&str>) -> String {
        match host {
            Some(host) if wildcard_match(&self.pattern, host) => host.to_string(),
            _ => self.fallback.clone(),
        }
    }
}

fn wildcard_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.to_lowercase().chars().collect();
    let text: Vec<char> = text.to_lowercase().chars().collect();

    let (mut p, mut t) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p, t));
                p += 1;
            }
            Some(&c) if c == '?' || c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match backtrack {
                Some((star, matched)) => {
                    p = star + 1;
                    t = matched + 1;
                    backtrack = Some((star, matched + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}

/// Trace context for the segment currently serving a request.
///
/// Inserted into request extensions by [`segment_middleware`].
#[derive(Debug, Clone)]
pub struct SegmentContext {
    pub name: String,
    pub id: SegmentId,
    pub header: TraceHeader,
}

impl SegmentContext {
    /// Start a subsegment for an outbound call.
    ///
    /// Returns the span to instrument the call with and the header to send.
    pub fn subsegment(&self, name: &str) -> (Span, TraceHeader) {
        let id = SegmentId::generate();
        let span = tracing::info_span!(
            "subsegment",
            name = %name,
            trace_id = %self.header.root,
            segment_id = %id,
            parent_id = %self.id,
            status = field::Empty,
        );
        (span, self.header.child_of(&id))
    }
}

/// Shared state for [`segment_middleware`].
#[derive(Clone)]
pub struct SegmentState {
    namer: Arc<dyn SegmentNamer>,
}

impl SegmentState {
    pub fn new(namer: impl SegmentNamer) -> Self {
        Self {
            namer: Arc::new(namer),
        }
    }
}

/// Route label shared by every request no route matched (fallback handlers, 404s).
pub const FALLBACK_ROUTE: &str = "fallback";

/// Metrics label for the route serving `req`. Never the raw path, so
/// arbitrary paths can't create new series.
fn route_label(req: &Request<Body>) -> String {
    req.extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| FALLBACK_ROUTE.to_string())
}

/// Wraps a handler in a named segment.
pub async fn segment_middleware(
    State(state): State<SegmentState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();

    let host = req
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| req.uri().authority().map(|a| a.to_string()));
    let name = state.namer.name(host.as_deref());

    // 1. Continue the caller's trace or start a new one
    let header = req
        .headers()
        .get(TRACE_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|raw| match raw.parse::<TraceHeader>() {
            Ok(header) => Some(header),
            Err(e) => {
                tracing::debug!(header = %raw, error = %e, "Ignoring malformed trace header");
                None
            }
        })
        .unwrap_or_else(TraceHeader::new_root);

    let context = SegmentContext {
        name: name.clone(),
        id: SegmentId::generate(),
        header,
    };

    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let route = route_label(&req);

    let span = tracing::info_span!(
        "segment",
        name = %name,
        trace_id = %context.header.root,
        segment_id = %context.id,
        parent_id = field::Empty,
        sampled = context.header.is_sampled(),
        method = %method,
        path = %path,
        status = field::Empty,
    );
    if let Some(parent) = &context.header.parent {
        span.record("parent_id", field::display(parent));
    }

    let response_header = context.header.for_response().to_string();
    req.extensions_mut().insert(context);

    // 2. Run the handler inside the segment
    let mut response = next.run(req).instrument(span.clone()).await;

    // 3. Close the segment
    let status = response.status();
    span.record("status", status.as_u16());
    span.in_scope(|| {
        tracing::info!(
            status = status.as_u16(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Segment closed"
        );
    });
    metrics::record_request(&name, &route, status.as_u16(), start);

    if let Ok(value) = HeaderValue::from_str(&response_header) {
        response.headers_mut().insert(TRACE_HEADER, value);
    }

    response
}
