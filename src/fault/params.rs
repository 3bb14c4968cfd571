//! `/setFlake` query parsing and validation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::fault::state::FlakeSettings;

/// Rejections for a `/setFlake` request. All map to 400 Bad Request.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FlakeError {
    #[error("rate must be specified")]
    MissingRate,

    #[error("invalid rate {value:?}: {reason}")]
    InvalidRate { value: String, reason: String },

    #[error("rate must be between 0.0 and 1.0")]
    RateOutOfRange,

    #[error("code must be specified")]
    MissingCode,

    #[error("invalid code {value:?}: {reason}")]
    InvalidCode { value: String, reason: String },
}

impl IntoResponse for FlakeError {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, self.to_string()).into_response()
    }
}

/// Parse flake settings from a raw query string.
///
/// Checks run in a fixed order and the first failure wins. For repeated
/// keys only the first occurrence counts.
pub fn parse_flake_query(query: Option<&str>) -> Result<FlakeSettings, FlakeError> {
    let query = query.unwrap_or_default();

    let rate = first_value(query, "rate").ok_or(FlakeError::MissingRate)?;
    let rate: f32 = rate.parse().map_err(|e: std::num::ParseFloatError| {
        FlakeError::InvalidRate {
            value: rate.clone(),
            reason: e.to_string(),
        }
    })?;
    if !(0.0..=1.0).contains(&rate) {
        return Err(FlakeError::RateOutOfRange);
    }

    let code = first_value(query, "code").ok_or(FlakeError::MissingCode)?;
    let code = parse_status(&code)?;

    Ok(FlakeSettings { rate, code })
}

fn parse_status(raw: &str) -> Result<StatusCode, FlakeError> {
    let invalid = |reason: String| FlakeError::InvalidCode {
        value: raw.to_string(),
        reason,
    };

    let code: i64 = raw.parse().map_err(|e: std::num::ParseIntError| invalid(e.to_string()))?;
    let code = u16::try_from(code).map_err(|_| invalid("not an HTTP status code".to_string()))?;
    StatusCode::from_u16(code).map_err(|e| invalid(e.to_string()))
}

fn first_value(query: &str, key: &str) -> Option<String> {
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}
