//! Parses and validates the `s` request parameter into [`SegmentSpec`]s.
//!
//! The wire format itself is a thin external concern, but its error codes
//! are part of the core's contract, so parsing lives here rather than in an
//! HTTP handler.

use regex::Regex;
use std::sync::OnceLock;

use crate::errors::AppError;

/// Deployment-tunable cap on total segment duration. Fixed at 200 here,
/// matching the newest variant of the original implementation.
pub const MAX_FORECAST_DURATION_HOURS: f64 = 200.0;

const SEGMENT_FIELD_COUNT: usize = 6;

/// One parsed element of the `s` request parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentSpec {
    pub index: i64,
    pub program: String,
    pub led_count: u32,
    pub reversed: bool,
    pub lat: f64,
    pub lon: f64,
    /// 0 when `program == "dark"`.
    pub slot_minutes: u32,
}

impl SegmentSpec {
    pub fn is_dark(&self) -> bool {
        self.program == "dark"
    }
}

fn minutes_suffix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+)min$").unwrap())
}

/// Parse the space-separated list of comma-separated 6-tuples.
///
/// Returns `AppError::BadRequest` (never touches caches or upstreams) for any
/// malformed tuple, out-of-range field, or oversize duration.
pub fn parse_segments(raw: &str) -> Result<Vec<SegmentSpec>, AppError> {
    if raw.trim().is_empty() {
        return Err(AppError::bad_request(
            "MISSING_S_QUERY_PARAM",
            "s parameter is empty",
        ));
    }

    raw.split_whitespace().map(parse_one_segment).collect()
}

fn parse_one_segment(tuple: &str) -> Result<SegmentSpec, AppError> {
    let parts: Vec<&str> = tuple.split(',').collect();
    if parts.len() != SEGMENT_FIELD_COUNT {
        return Err(AppError::bad_request(
            "INVALID_SEGMENT_FORMAT",
            format!(
                "expected {} comma-separated fields, got {} in '{}'",
                SEGMENT_FIELD_COUNT,
                parts.len(),
                tuple
            ),
        ));
    }

    let bad_field = |field: &str, err: impl std::fmt::Display| {
        AppError::bad_request(
            "INVALID_SEGMENT_DATA",
            format!("invalid {} in '{}': {}", field, tuple, err),
        )
    };

    let index: i64 = parts[0].parse().map_err(|e| bad_field("index", e))?;
    let program = parts[1].to_string();
    let led_count: u32 = parts[2].parse().map_err(|e| bad_field("led_count", e))?;
    if led_count < 1 {
        return Err(AppError::bad_request(
            "INVALID_SEGMENT_DATA",
            format!("led_count must be >= 1 in '{}'", tuple),
        ));
    }
    let reversed_raw: u8 = parts[3].parse().map_err(|e| bad_field("reversed", e))?;
    let reversed = reversed_raw != 0;
    let lat: f64 = parts[4].parse().map_err(|e| bad_field("lat", e))?;
    let lon: f64 = parts[5].parse().map_err(|e| bad_field("lon", e))?;

    let slot_minutes = if program == "dark" {
        0
    } else {
        minutes_suffix_re()
            .captures(&program)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .ok_or_else(|| {
                AppError::bad_request(
                    "INVALID_SEGMENT_FORMAT",
                    format!(
                        "program '{}' does not end in '<N>min' and is not 'dark'",
                        program
                    ),
                )
            })?
    };

    let duration_hours = slot_minutes as f64 * led_count as f64 / 60.0;
    if duration_hours > MAX_FORECAST_DURATION_HOURS {
        return Err(AppError::bad_request(
            "DURATION_TOO_LONG",
            format!(
                "segment '{}' spans {:.1}h, exceeds cap of {}h",
                tuple, duration_hours, MAX_FORECAST_DURATION_HOURS
            ),
        ));
    }

    // Round to 3 decimals at ingress.
    let lat = (lat * 1000.0).round() / 1000.0;
    let lon = (lon * 1000.0).round() / 1000.0;

    Ok(SegmentSpec {
        index,
        program,
        led_count,
        reversed,
        lat,
        lon,
        slot_minutes,
    })
}
