//! `X-Amzn-Trace-Id` trace context header.
//!
//! Format: `Root=1-5759e988-bd862e3fe1be46a994272793;Parent=53995c3f42cd8ad8;Sampled=1`
//!
//! # Design Decisions
//! - Fields may appear in any order; unknown keys are ignored
//! - A header without a well-formed `Root` is treated as absent

use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;

/// Header carrying trace context between services.
pub const TRACE_HEADER: &str = "x-amzn-trace-id";

/// Trace root identifier: `1-<8 hex epoch seconds>-<24 hex random>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TraceId(String);

impl TraceId {
    /// Start a new trace at the current time.
    pub fn generate() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let random: [u8; 12] = rand::thread_rng().gen();
        Self(format!("1-{:08x}-{}", secs as u32, hex(&random)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TraceId {
    type Err = TraceHeaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('-');
        let well_formed = matches!(
            (parts.next(), parts.next(), parts.next(), parts.next()),
            (Some("1"), Some(epoch), Some(unique), None)
                if is_hex(epoch, 8) && is_hex(unique, 24)
        );
        if well_formed {
            Ok(Self(s.to_ascii_lowercase()))
        } else {
            Err(TraceHeaderError::InvalidRoot(s.to_string()))
        }
    }
}

/// Identifier of a single segment or subsegment: 16 hex digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SegmentId(String);

impl SegmentId {
    pub fn generate() -> Self {
        let random: [u8; 8] = rand::thread_rng().gen();
        Self(hex(&random))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SegmentId {
    type Err = TraceHeaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if is_hex(s, 16) {
            Ok(Self(s.to_ascii_lowercase()))
        } else {
            Err(TraceHeaderError::InvalidParent(s.to_string()))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TraceHeaderError {
    #[error("trace header has no Root")]
    MissingRoot,

    #[error("invalid trace root {0:?}")]
    InvalidRoot(String),

    #[error("invalid parent id {0:?}")]
    InvalidParent(String),
}

/// Parsed trace context header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceHeader {
    pub root: TraceId,
    pub parent: Option<SegmentId>,
    pub sampled: Option<bool>,
}

impl TraceHeader {
    /// A fresh, sampled trace with no parent.
    pub fn new_root() -> Self {
        Self {
            root: TraceId::generate(),
            parent: None,
            sampled: Some(true),
        }
    }

    /// Header to send downstream with `parent` as the calling segment.
    pub fn child_of(&self, parent: &SegmentId) -> Self {
        Self {
            root: self.root.clone(),
            parent: Some(parent.clone()),
            sampled: self.sampled,
        }
    }

    /// Header echoed back to the caller (root and sampling decision only).
    pub fn for_response(&self) -> Self {
        Self {
            root: self.root.clone(),
            parent: None,
            sampled: self.sampled,
        }
    }

    pub fn is_sampled(&self) -> bool {
        self.sampled.unwrap_or(true)
    }
}

impl fmt::Display for TraceHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Root={}", self.root)?;
        if let Some(parent) = &self.parent {
            write!(f, ";Parent={}", parent)?;
        }
        if let Some(sampled) = self.sampled {
            write!(f, ";Sampled={}", u8::from(sampled))?;
        }
        Ok(())
    }
}

impl FromStr for TraceHeader {
    type Err = TraceHeaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut root = None;
        let mut parent = None;
        let mut sampled = None;

        for field in s.split(';') {
            let Some((key, value)) = field.split_once('=') else {
                continue;
            };
            let value = value.trim();
            match key.trim() {
                "Root" => root = Some(value.parse::<TraceId>()?),
                "Parent" => parent = Some(value.parse::<SegmentId>()?),
                "Sampled" => {
                    sampled = match value {
                        "1" => Some(true),
                        "0" => Some(false),
                        _ => None,
                    }
                }
                _ => {}
            }
        }

        Ok(Self {
            root: root.ok_or(TraceHeaderError::MissingRoot)?,
            parent,
            sampled,
        })
    }
}

fn is_hex(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| b.is_ascii_hexdigit())
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
