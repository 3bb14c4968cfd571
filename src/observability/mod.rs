//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Every request:
//!     → tracing.rs (segment span named by the SegmentNamer, trace header in/out)
//!     → metrics.rs (request counter + latency histogram)
//!     → logging.rs subscriber (fmt output, RUST_LOG filter)
//!
//! Client upstream calls:
//!     → tracing.rs subsegment span + propagated X-Amzn-Trace-Id
//! ```

pub mod logging;
pub mod metrics;
pub mod trace_header;
pub mod tracing;

pub use self::tracing::{
    segment_middleware, DynamicSegmentNamer, FixedSegmentNamer, SegmentContext, SegmentNamer,
    SegmentState,
};
pub use trace_header::{SegmentId, TraceHeader, TraceId, TRACE_HEADER};
