//! Maps a slot's nowcast/forecast fields to a [`Bucket`], or `None` for the
//! `UNKNOWN` fallback.

use crate::colormap::Bucket;
use regex::Regex;
use std::sync::OnceLock;

/// `rain|sleet|snow`, case-insensitive — used both to detect the "clear
/// symbol, zero nowcast precipitation" CLOUDY special case and as the base
/// test inside [`symbol_to_bucket`].
fn rain_family_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)rain|sleet|snow").unwrap())
}

/// Strip a trailing `_day`/`_night` suffix from a yr.no symbol code.
pub fn strip_day_night(symbol: &str) -> &str {
    symbol
        .strip_suffix("_day")
        .or_else(|| symbol.strip_suffix("_night"))
        .unwrap_or(symbol)
}

/// Fixed symbol-family → bucket table. `symbol` must already have its
/// `_day`/`_night` suffix stripped.
fn symbol_to_bucket(symbol: &str) -> Option<Bucket> {
    let s = symbol.to_ascii_lowercase();
    match s.as_str() {
        "clearsky" | "fair" => return Some(Bucket::Clearsky),
        "partlycloudy" => return Some(Bucket::Partlycloudy),
        "cloudy" | "fog" => return Some(Bucket::Cloudy),
        _ => {}
    }
    if s.starts_with("heavy") {
        if rain_family_re().is_match(&s) {
            return Some(Bucket::Heavyrain);
        }
        return None;
    }
    if s.starts_with("light") {
        if rain_family_re().is_match(&s) {
            return Some(Bucket::Lightrain);
        }
        return None;
    }
    if rain_family_re().is_match(&s) {
        return Some(Bucket::Rain);
    }
    None
}

/// Classify a single slot row. `prec_now` takes priority when present;
/// otherwise the forecast `symbol`/`prob_of_prec` branch applies.
///
/// Returns `None` for the `UNKNOWN` fallback — callers render that as the
/// colormap's `CLOUDY` entry and log a warning.
pub fn classify_row(
    prec_now: Option<f64>,
    symbol: Option<&str>,
    prob_of_prec: Option<f64>,
) -> Option<Bucket> {
    match prec_now {
        Some(p) => classify_nowcast(p, symbol),
        None => classify_forecast(symbol, prob_of_prec),
    }
}

fn classify_nowcast(prec_now: f64, symbol: Option<&str>) -> Option<Bucket> {
    if prec_now > 3.0 {
        return Some(Bucket::Veryheavyrain);
    }
    if prec_now > 1.5 {
        return Some(Bucket::Heavyrain);
    }
    if prec_now > 0.5 {
        return Some(Bucket::Rain);
    }
    if prec_now > 0.0 {
        return Some(Bucket::Lightrain);
    }
    // prec_now == 0.0 (or, defensively, negative — treated the same as zero)
    let sym = symbol.map(strip_day_night);
    if let Some(sym) = sym {
        if rain_family_re().is_match(sym) {
            return Some(Bucket::Cloudy);
        }
        return symbol_to_bucket(sym);
    }
    None
}

fn classify_forecast(symbol: Option<&str>, prob_of_prec: Option<f64>) -> Option<Bucket> {
    let sym = symbol.map(strip_day_night)?;
    let bucket = symbol_to_bucket(sym)?;
    if bucket == Bucket::Lightrain {
        if let Some(prob) = prob_of_prec {
            if prob <= 50.0 {
                return Some(Bucket::LightrainLt50);
            }
        }
    }
    Some(bucket)
}
